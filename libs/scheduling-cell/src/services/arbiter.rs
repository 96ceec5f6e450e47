use std::sync::Arc;

use chrono::{DateTime, Utc};
use provider_cell::models::Provider;
use provider_cell::services::ProviderDirectory;
use notification_cell::services::Notifier;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::SchedulingError;
use crate::models::{Booking, ReserveRequest};
use crate::store::{BookingStore, NewBooking};

// ==============================================================================
// BOOKING ARBITER
// ==============================================================================

/// Decides whether a requested slot can be booked and, when it can, commits
/// the booking through the store's atomic insert. All conflict decisions
/// happen inside `BookingStore::insert_active_unique`; the arbiter never
/// checks-then-inserts on its own.
pub struct BookingArbiter {
    store: Arc<dyn BookingStore>,
    providers: Arc<dyn ProviderDirectory>,
    notifier: Arc<dyn Notifier>,
}

impl BookingArbiter {
    pub fn new(
        store: Arc<dyn BookingStore>,
        providers: Arc<dyn ProviderDirectory>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            providers,
            notifier,
        }
    }

    /// Reserve a slot for `requester_id`. Validation runs against the
    /// provider's weekly schedule before the store is touched, so a denied
    /// request leaves no trace. Exactly one of two concurrent reservations
    /// for the same (provider, start) pair succeeds.
    pub async fn reserve(
        &self,
        request: ReserveRequest,
        requester_id: Uuid,
    ) -> Result<Booking, SchedulingError> {
        let provider = self
            .providers
            .get_active(request.provider_id)
            .await
            .map_err(|_| SchedulingError::ProviderNotFound)?;

        let now = Utc::now();
        validate_slot(&provider, request.start_time, now)?;

        debug!(
            "Attempting reservation: provider {} at {}",
            provider.id, request.start_time
        );

        let booking = self
            .store
            .insert_active_unique(NewBooking {
                provider_id: provider.id,
                requester_id,
                start_time: request.start_time,
                duration_minutes: provider.schedule.slot_minutes as i32,
                reason: request.reason,
                notes: request.notes,
            })
            .await?;

        info!(
            "Booking {} reserved: provider {} at {}",
            booking.id, booking.provider_id, booking.start_time
        );

        // Notification failures must never unwind a committed booking.
        let notifier = self.notifier.clone();
        let provider_user = provider.user_id;
        let provider_name = provider.display_name.clone();
        let notice = booking.clone();
        tokio::spawn(async move {
            send_booking_notices(&*notifier, &notice, provider_user, &provider_name).await;
        });

        Ok(booking)
    }
}

/// Rejects starts the provider's weekly schedule can never offer: past
/// times, non-working days, times outside the daily window and times off
/// the slot grid.
pub fn validate_slot(
    provider: &Provider,
    start_time: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), SchedulingError> {
    if start_time <= now {
        return Err(SchedulingError::InvalidSlot(
            "start time must be in the future".to_string(),
        ));
    }

    let schedule = &provider.schedule;
    let date = start_time.date_naive();
    let time = start_time.time();

    if !schedule.is_working_day(date) {
        return Err(SchedulingError::InvalidSlot(format!(
            "{} is not a working day for this provider",
            date
        )));
    }

    if !schedule.in_window(time) {
        return Err(SchedulingError::InvalidSlot(format!(
            "start time is outside working hours ({}:00-{}:00)",
            schedule.start_hour, schedule.end_hour
        )));
    }

    if !schedule.is_aligned(time) {
        return Err(SchedulingError::InvalidSlot(format!(
            "start time must fall on a {}-minute boundary",
            schedule.slot_minutes
        )));
    }

    Ok(())
}

/// Writes the confirmation pair for a committed booking: one notice to the
/// requester, one to the provider's portal user. Public so tests can await
/// delivery directly instead of racing the spawned task.
pub async fn send_booking_notices(
    notifier: &dyn Notifier,
    booking: &Booking,
    provider_user: Uuid,
    provider_name: &str,
) {
    let when = booking.start_time.format("%Y-%m-%d %H:%M UTC");

    if let Err(e) = notifier
        .notify(
            booking.requester_id,
            "Appointment booked",
            &format!("Your appointment with {} is set for {}", provider_name, when),
            "appointment",
        )
        .await
    {
        warn!("Failed to notify requester for booking {}: {}", booking.id, e);
    }

    if let Err(e) = notifier
        .notify(
            provider_user,
            "New appointment",
            &format!("A new appointment was booked for {}", when),
            "appointment",
        )
        .await
    {
        warn!("Failed to notify provider for booking {}: {}", booking.id, e);
    }
}
