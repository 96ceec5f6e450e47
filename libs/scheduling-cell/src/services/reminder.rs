use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use notification_cell::services::Notifier;
use provider_cell::services::ProviderDirectory;
use tracing::{debug, info, warn};

use crate::error::SchedulingError;
use crate::models::{BookingQuery, BookingStatus};
use crate::store::{BookingStore, StoreError};

// ==============================================================================
// REMINDERS AND NO-SHOW SWEEP
// ==============================================================================

/// Background maintenance over the booking table: day-before reminders and
/// the overdue no-show sweep. Driven by the API's interval task; both entry
/// points take `now` so tests can pin the clock.
pub struct ReminderService {
    store: Arc<dyn BookingStore>,
    providers: Arc<dyn ProviderDirectory>,
    notifier: Arc<dyn Notifier>,
}

impl ReminderService {
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

    /// Sends a reminder pair for every active booking that starts tomorrow
    /// (UTC calendar day). Returns how many bookings were reminded.
    pub async fn send_upcoming_reminders(
        &self,
        now: DateTime<Utc>,
    ) -> Result<usize, SchedulingError> {
        let tomorrow = (now + Duration::days(1)).date_naive();
        let from = tomorrow
            .and_hms_opt(0, 0, 0)
            .unwrap_or_default()
            .and_utc();
        // The search window is inclusive on both ends.
        let to = from + Duration::days(1) - Duration::seconds(1);

        let upcoming = self
            .store
            .search(BookingQuery {
                from: Some(from),
                to: Some(to),
                active_only: true,
                ..Default::default()
            })
            .await?;
        debug!("Reminder sweep found {} upcoming bookings", upcoming.len());

        for booking in &upcoming {
            let when = booking.start_time.format("%Y-%m-%d %H:%M UTC");
            let body = format!("Reminder: appointment tomorrow at {}", when);

            if let Err(e) = self
                .notifier
                .notify(booking.requester_id, "Appointment reminder", &body, "reminder")
                .await
            {
                warn!("Failed to remind requester for booking {}: {}", booking.id, e);
            }

            match self.providers.get(booking.provider_id).await {
                Ok(provider) => {
                    if let Err(e) = self
                        .notifier
                        .notify(provider.user_id, "Appointment reminder", &body, "reminder")
                        .await
                    {
                        warn!("Failed to remind provider for booking {}: {}", booking.id, e);
                    }
                }
                Err(e) => warn!(
                    "Skipping provider reminder for booking {}: {}",
                    booking.id, e
                ),
            }
        }

        Ok(upcoming.len())
    }

    /// Moves active bookings whose start passed more than `grace_minutes`
    /// ago to no-show. Each booking is swept independently; one bad row
    /// never stalls the rest.
    pub async fn mark_overdue_no_shows(
        &self,
        now: DateTime<Utc>,
        grace_minutes: i64,
    ) -> Result<usize, SchedulingError> {
        let cutoff = now - Duration::minutes(grace_minutes);

        // Active-only is pushed into the store query; terminal bookings
        // never leave the backend.
        let bookings = self
            .store
            .search(BookingQuery {
                to: Some(cutoff),
                active_only: true,
                ..Default::default()
            })
            .await?;

        let mut swept = 0;
        for booking in bookings {
            match self
                .store
                .update_status(booking.id, booking.status, BookingStatus::NoShow, None)
                .await
            {
                Ok(_) => {
                    info!("Booking {} swept to no-show", booking.id);
                    swept += 1;
                }
                Err(StoreError::StaleStatus) => {
                    debug!("Booking {} changed under the sweep, skipping", booking.id)
                }
                Err(e) => warn!("Failed to sweep booking {}: {}", booking.id, e),
            }
        }

        Ok(swept)
    }
}
