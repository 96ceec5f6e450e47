use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use notification_cell::services::{MemoryNotificationStore, NotificationStore, Notifier, StoreNotifier};
use provider_cell::models::{Provider, WeeklySchedule};
use provider_cell::services::{MemoryProviderDirectory, ProviderDirectory};
use scheduling_cell::error::SchedulingError;
use scheduling_cell::models::{Booking, BookingQuery, BookingStatus, CancelledBy};
use scheduling_cell::services::lifecycle::{
    send_transition_notices, BookingLifecycle, TransitionService,
};
use scheduling_cell::store::{BookingStore, MemoryBookingStore, NewBooking, StoreError};

struct Fixture {
    transitions: TransitionService,
    store: Arc<dyn BookingStore>,
    directory: Arc<dyn ProviderDirectory>,
    notifications: Arc<MemoryNotificationStore>,
    provider: Provider,
}

async fn fixture() -> Fixture {
    let store: Arc<dyn BookingStore> = MemoryBookingStore::new().into_shared();
    let directory: Arc<dyn ProviderDirectory> = Arc::new(MemoryProviderDirectory::new());
    let notifications = Arc::new(MemoryNotificationStore::new());
    let notifier: Arc<dyn Notifier> = Arc::new(StoreNotifier::new(notifications.clone()));

    let now = Utc::now();
    let provider = Provider {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        display_name: "Dr. Lindqvist".to_string(),
        specialty: None,
        is_active: true,
        schedule: WeeklySchedule::default(),
        created_at: now,
        updated_at: now,
    };
    directory.create(provider.clone()).await.unwrap();

    Fixture {
        transitions: TransitionService::new(store.clone(), directory.clone(), notifier),
        store,
        directory,
        notifications,
        provider,
    }
}

impl Fixture {
    async fn seed_booking(&self, start: DateTime<Utc>) -> Booking {
        self.store
            .insert_active_unique(NewBooking {
                provider_id: self.provider.id,
                requester_id: Uuid::new_v4(),
                start_time: start,
                duration_minutes: 30,
                reason: None,
                notes: None,
            })
            .await
            .unwrap()
    }
}

fn future_start() -> DateTime<Utc> {
    Utc::now() + Duration::days(2)
}

#[test]
fn transition_matrix_matches_lifecycle_rules() {
    use BookingStatus::*;

    assert!(BookingLifecycle::validate_transition(Scheduled, Confirmed).is_ok());
    assert!(BookingLifecycle::validate_transition(Scheduled, Cancelled).is_ok());
    assert!(BookingLifecycle::validate_transition(Scheduled, NoShow).is_ok());
    assert!(BookingLifecycle::validate_transition(Confirmed, Completed).is_ok());
    assert!(BookingLifecycle::validate_transition(Confirmed, Cancelled).is_ok());
    assert!(BookingLifecycle::validate_transition(Confirmed, NoShow).is_ok());

    // Completion requires confirmation first.
    assert!(BookingLifecycle::validate_transition(Scheduled, Completed).is_err());

    // Terminal statuses have no outgoing edges.
    for terminal in [Completed, Cancelled, NoShow] {
        for target in [Scheduled, Confirmed, Completed, Cancelled, NoShow] {
            assert!(BookingLifecycle::validate_transition(terminal, target).is_err());
        }
    }
}

#[tokio::test]
async fn confirm_then_complete() {
    let fx = fixture().await;
    let booking = fx.seed_booking(future_start()).await;

    let confirmed = fx.transitions.confirm(booking.id).await.unwrap();
    assert_eq!(confirmed.status, BookingStatus::Confirmed);

    let completed = fx.transitions.complete(booking.id).await.unwrap();
    assert_eq!(completed.status, BookingStatus::Completed);
}

#[tokio::test]
async fn completing_an_unconfirmed_booking_is_rejected() {
    let fx = fixture().await;
    let booking = fx.seed_booking(future_start()).await;

    let result = fx.transitions.complete(booking.id).await;
    assert_matches!(
        result,
        Err(SchedulingError::InvalidTransition {
            from: BookingStatus::Scheduled,
            to: BookingStatus::Completed,
        })
    );
}

#[tokio::test]
async fn cancel_records_who_and_why() {
    let fx = fixture().await;
    let booking = fx.seed_booking(future_start()).await;

    let cancelled = fx
        .transitions
        .cancel(booking.id, "Feeling better", CancelledBy::Patient)
        .await
        .unwrap();

    assert_eq!(cancelled.status, BookingStatus::Cancelled);
    let notes = cancelled.notes.unwrap();
    assert!(notes.contains("Cancelled by patient: Feeling better"));
}

#[tokio::test]
async fn cancelled_booking_cannot_be_confirmed_again() {
    let fx = fixture().await;
    let booking = fx.seed_booking(future_start()).await;

    fx.transitions
        .cancel(booking.id, "Conflict", CancelledBy::Provider)
        .await
        .unwrap();

    let result = fx.transitions.confirm(booking.id).await;
    assert_matches!(result, Err(SchedulingError::InvalidTransition { .. }));
}

#[tokio::test]
async fn no_show_before_the_start_is_rejected() {
    let fx = fixture().await;
    let start = future_start();
    let booking = fx.seed_booking(start).await;

    let result = fx.transitions.mark_no_show(booking.id, start - Duration::hours(1)).await;
    assert_matches!(result, Err(SchedulingError::NoShowTooEarly));

    // Still holds exactly at the start time.
    let result = fx.transitions.mark_no_show(booking.id, start).await;
    assert_matches!(result, Err(SchedulingError::NoShowTooEarly));
}

#[tokio::test]
async fn no_show_after_the_start_sticks() {
    let fx = fixture().await;
    let start = future_start();
    let booking = fx.seed_booking(start).await;

    let updated = fx
        .transitions
        .mark_no_show(booking.id, start + Duration::minutes(45))
        .await
        .unwrap();

    assert_eq!(updated.status, BookingStatus::NoShow);
    assert!(updated.status.is_terminal());
}

#[tokio::test]
async fn unknown_booking_is_not_found() {
    let fx = fixture().await;

    let result = fx.transitions.confirm(Uuid::new_v4()).await;
    assert_matches!(result, Err(SchedulingError::BookingNotFound));
}

#[tokio::test]
async fn transition_notices_reach_both_parties() {
    let fx = fixture().await;
    let booking = fx.seed_booking(future_start()).await;
    let confirmed = fx.transitions.confirm(booking.id).await.unwrap();

    let notifier = StoreNotifier::new(fx.notifications.clone());
    send_transition_notices(&notifier, &*fx.directory, &confirmed, "Appointment confirmed").await;

    let requester_inbox = fx
        .notifications
        .list_for_user(confirmed.requester_id)
        .await
        .unwrap();
    assert!(requester_inbox.iter().any(|n| n.title == "Appointment confirmed"));

    let provider_inbox = fx
        .notifications
        .list_for_user(fx.provider.user_id)
        .await
        .unwrap();
    assert!(provider_inbox.iter().any(|n| n.title == "Appointment confirmed"));
}

#[tokio::test]
async fn stale_status_write_cannot_resurrect_a_cancelled_booking() {
    let fx = fixture().await;
    let start = future_start();
    let first = fx.seed_booking(start).await;

    fx.transitions
        .cancel(first.id, "Cannot make it", CancelledBy::Patient)
        .await
        .unwrap();
    let second = fx.seed_booking(start).await;

    // A writer still holding the pre-cancellation view of the first
    // booking must lose: its status already moved to cancelled.
    let result = fx
        .store
        .update_status(
            first.id,
            BookingStatus::Scheduled,
            BookingStatus::Confirmed,
            None,
        )
        .await;
    assert_matches!(result, Err(StoreError::StaleStatus));

    // The slot still has exactly one active holder.
    let active = fx
        .store
        .search(BookingQuery {
            provider_id: Some(fx.provider.id),
            active_only: true,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, second.id);
}
