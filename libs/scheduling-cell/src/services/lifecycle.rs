use std::sync::Arc;

use chrono::{DateTime, Utc};
use notification_cell::services::Notifier;
use provider_cell::services::ProviderDirectory;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::SchedulingError;
use crate::models::{Booking, BookingStatus, CancelledBy};
use crate::store::{BookingStore, StoreError};

// ==============================================================================
// BOOKING LIFECYCLE
// ==============================================================================

/// Pure transition rules for booking statuses. Terminal statuses have no
/// outgoing edges; a cancelled slot is rebooked, never reopened.
pub struct BookingLifecycle;

impl BookingLifecycle {
    pub fn valid_transitions(from: BookingStatus) -> &'static [BookingStatus] {
        match from {
            BookingStatus::Scheduled => &[
                BookingStatus::Confirmed,
                BookingStatus::Cancelled,
                BookingStatus::NoShow,
            ],
            BookingStatus::Confirmed => &[
                BookingStatus::Completed,
                BookingStatus::Cancelled,
                BookingStatus::NoShow,
            ],
            BookingStatus::Completed | BookingStatus::Cancelled | BookingStatus::NoShow => &[],
        }
    }

    pub fn validate_transition(
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<(), SchedulingError> {
        if Self::valid_transitions(from).contains(&to) {
            Ok(())
        } else {
            Err(SchedulingError::InvalidTransition { from, to })
        }
    }
}

/// Applies lifecycle transitions to stored bookings and tells the other
/// party. The status write itself is the commit point; notification
/// delivery is spawned and never blocks or reverts it.
pub struct TransitionService {
    store: Arc<dyn BookingStore>,
    providers: Arc<dyn ProviderDirectory>,
    notifier: Arc<dyn Notifier>,
}

impl TransitionService {
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

    pub async fn confirm(&self, booking_id: Uuid) -> Result<Booking, SchedulingError> {
        self.transition(booking_id, BookingStatus::Confirmed, None, "Appointment confirmed")
            .await
    }

    pub async fn complete(&self, booking_id: Uuid) -> Result<Booking, SchedulingError> {
        self.transition(booking_id, BookingStatus::Completed, None, "Appointment completed")
            .await
    }

    /// Cancelling releases the slot immediately; the next reservation for
    /// the same (provider, start) pair succeeds.
    pub async fn cancel(
        &self,
        booking_id: Uuid,
        reason: &str,
        cancelled_by: CancelledBy,
    ) -> Result<Booking, SchedulingError> {
        let note = format!("Cancelled by {}: {}", cancelled_by, reason);
        self.transition(
            booking_id,
            BookingStatus::Cancelled,
            Some(note),
            "Appointment cancelled",
        )
        .await
    }

    /// Marks a booking no-show. Only allowed once the scheduled start has
    /// passed; a patient cannot be a no-show for an appointment that has
    /// not happened yet.
    pub async fn mark_no_show(
        &self,
        booking_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Booking, SchedulingError> {
        let booking = self.store.get(booking_id).await?;
        if now <= booking.start_time {
            return Err(SchedulingError::NoShowTooEarly);
        }
        BookingLifecycle::validate_transition(booking.status, BookingStatus::NoShow)?;

        let updated = self
            .apply(booking_id, booking.status, BookingStatus::NoShow, None)
            .await?;
        info!("Booking {} marked no-show", booking_id);

        self.spawn_notices(&updated, "Appointment marked as no-show");
        Ok(updated)
    }

    async fn transition(
        &self,
        booking_id: Uuid,
        to: BookingStatus,
        note: Option<String>,
        headline: &'static str,
    ) -> Result<Booking, SchedulingError> {
        let booking = self.store.get(booking_id).await?;
        BookingLifecycle::validate_transition(booking.status, to)?;

        let updated = self.apply(booking_id, booking.status, to, note).await?;
        info!("Booking {} moved {} -> {}", booking_id, booking.status, to);

        self.spawn_notices(&updated, headline);
        Ok(updated)
    }

    /// The status write is a compare-and-swap against the status the
    /// transition was validated on. A stale swap means another writer won
    /// the race; report the transition against the status they left behind.
    async fn apply(
        &self,
        booking_id: Uuid,
        expected: BookingStatus,
        to: BookingStatus,
        note: Option<String>,
    ) -> Result<Booking, SchedulingError> {
        match self.store.update_status(booking_id, expected, to, note).await {
            Ok(updated) => Ok(updated),
            Err(StoreError::StaleStatus) => {
                let current = self.store.get(booking_id).await?;
                warn!(
                    "Booking {} moved to {} while a transition to {} was in flight",
                    booking_id, current.status, to
                );
                Err(SchedulingError::InvalidTransition {
                    from: current.status,
                    to,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn spawn_notices(&self, booking: &Booking, headline: &'static str) {
        let notifier = self.notifier.clone();
        let providers = self.providers.clone();
        let booking = booking.clone();
        tokio::spawn(async move {
            send_transition_notices(&*notifier, &*providers, &booking, headline).await;
        });
    }
}

/// Tells both participants about a status change. Provider lookup can fail
/// after a provider is deactivated; the requester still gets their notice.
pub async fn send_transition_notices(
    notifier: &dyn Notifier,
    providers: &dyn ProviderDirectory,
    booking: &Booking,
    headline: &str,
) {
    let when = booking.start_time.format("%Y-%m-%d %H:%M UTC");
    let body = format!("{} for {}", headline, when);

    if let Err(e) = notifier
        .notify(booking.requester_id, headline, &body, "appointment")
        .await
    {
        warn!("Failed to notify requester for booking {}: {}", booking.id, e);
    }

    match providers.get(booking.provider_id).await {
        Ok(provider) => {
            if let Err(e) = notifier
                .notify(provider.user_id, headline, &body, "appointment")
                .await
            {
                warn!("Failed to notify provider for booking {}: {}", booking.id, e);
            }
        }
        Err(e) => warn!(
            "Skipping provider notice for booking {}: {}",
            booking.id, e
        ),
    }
}
