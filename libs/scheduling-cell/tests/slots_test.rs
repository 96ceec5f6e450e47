use std::sync::Arc;

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc, Weekday};
use uuid::Uuid;

use provider_cell::models::{Provider, WeeklySchedule};
use scheduling_cell::services::SlotGenerator;
use scheduling_cell::store::{BookingStore, MemoryBookingStore, NewBooking};

fn test_provider(schedule: WeeklySchedule) -> Provider {
    let now = Utc::now();
    Provider {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        display_name: "Dr. Vega".to_string(),
        specialty: Some("General Practice".to_string()),
        is_active: true,
        schedule,
        created_at: now,
        updated_at: now,
    }
}

// Sunday, so generation starts on the following Monday.
fn sunday_morning() -> DateTime<Utc> {
    let now = Utc.with_ymd_and_hms(2025, 3, 9, 10, 0, 0).unwrap();
    assert_eq!(now.weekday(), Weekday::Sun);
    now
}

#[tokio::test]
async fn full_working_day_yields_sixteen_half_hour_slots() {
    let store = MemoryBookingStore::new().into_shared();
    let generator = SlotGenerator::new(store);
    let provider = test_provider(WeeklySchedule::default());

    let slots: Vec<_> = generator
        .generate_slots(&provider, 1, sunday_morning())
        .await
        .unwrap()
        .collect();

    assert_eq!(slots.len(), 16);
    assert_eq!(slots[0], Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap());
    assert_eq!(
        *slots.last().unwrap(),
        Utc.with_ymd_and_hms(2025, 3, 10, 16, 30, 0).unwrap()
    );
    assert!(slots.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test]
async fn non_working_days_are_skipped() {
    let store = MemoryBookingStore::new().into_shared();
    let generator = SlotGenerator::new(store);
    let provider = test_provider(WeeklySchedule::default());

    // Friday 2025-03-14; the next day is Saturday, then Sunday.
    let friday = Utc.with_ymd_and_hms(2025, 3, 14, 8, 0, 0).unwrap();
    assert_eq!(friday.weekday(), Weekday::Fri);

    let slots: Vec<_> = generator
        .generate_slots(&provider, 3, friday)
        .await
        .unwrap()
        .collect();

    // Only Monday falls inside the three-day horizon.
    assert_eq!(slots.len(), 16);
    assert!(slots.iter().all(|s| s.weekday() == Weekday::Mon));
}

#[tokio::test]
async fn taken_starts_are_excluded() {
    let store: Arc<dyn BookingStore> = MemoryBookingStore::new().into_shared();
    let generator = SlotGenerator::new(store.clone());
    let provider = test_provider(WeeklySchedule::default());

    let taken = Utc.with_ymd_and_hms(2025, 3, 10, 10, 0, 0).unwrap();
    store
        .insert_active_unique(NewBooking {
            provider_id: provider.id,
            requester_id: Uuid::new_v4(),
            start_time: taken,
            duration_minutes: 30,
            reason: None,
            notes: None,
        })
        .await
        .unwrap();

    let slots: Vec<_> = generator
        .generate_slots(&provider, 1, sunday_morning())
        .await
        .unwrap()
        .collect();

    assert_eq!(slots.len(), 15);
    assert!(!slots.contains(&taken));
}

#[tokio::test]
async fn cancelled_booking_frees_its_slot() {
    let store: Arc<dyn BookingStore> = MemoryBookingStore::new().into_shared();
    let generator = SlotGenerator::new(store.clone());
    let provider = test_provider(WeeklySchedule::default());

    let start = Utc.with_ymd_and_hms(2025, 3, 10, 10, 0, 0).unwrap();
    let booking = store
        .insert_active_unique(NewBooking {
            provider_id: provider.id,
            requester_id: Uuid::new_v4(),
            start_time: start,
            duration_minutes: 30,
            reason: None,
            notes: None,
        })
        .await
        .unwrap();

    store
        .update_status(
            booking.id,
            scheduling_cell::models::BookingStatus::Scheduled,
            scheduling_cell::models::BookingStatus::Cancelled,
            None,
        )
        .await
        .unwrap();

    let slots: Vec<_> = generator
        .generate_slots(&provider, 1, sunday_morning())
        .await
        .unwrap()
        .collect();

    assert_eq!(slots.len(), 16);
    assert!(slots.contains(&start));
}

#[tokio::test]
async fn iterator_is_lazy_and_caps_with_take() {
    let store = MemoryBookingStore::new().into_shared();
    let generator = SlotGenerator::new(store);
    let provider = test_provider(WeeklySchedule::default());

    let slots: Vec<_> = generator
        .generate_slots(&provider, 30, sunday_morning())
        .await
        .unwrap()
        .take(20)
        .collect();

    assert_eq!(slots.len(), 20);
    // 16 Monday slots, then the first four of Tuesday.
    assert_eq!(slots[15].weekday(), Weekday::Mon);
    assert_eq!(slots[16].weekday(), Weekday::Tue);
    assert_eq!(slots[16].hour(), 9);
}

#[tokio::test]
async fn custom_granularity_follows_the_schedule() {
    let store = MemoryBookingStore::new().into_shared();
    let generator = SlotGenerator::new(store);
    let provider = test_provider(WeeklySchedule {
        working_days: vec![1],
        start_hour: 8,
        end_hour: 12,
        slot_minutes: 20,
    });

    let slots: Vec<_> = generator
        .generate_slots(&provider, 7, sunday_morning())
        .await
        .unwrap()
        .collect();

    // Four hours at 20-minute granularity, one working day in the week.
    assert_eq!(slots.len(), 12);
    assert!(slots.iter().all(|s| s.minute() % 20 == 0));
}

#[tokio::test]
async fn zero_horizon_yields_no_slots() {
    let store = MemoryBookingStore::new().into_shared();
    let generator = SlotGenerator::new(store);
    let provider = test_provider(WeeklySchedule::default());

    let slots: Vec<_> = generator
        .generate_slots(&provider, 0, sunday_morning())
        .await
        .unwrap()
        .collect();

    assert!(slots.is_empty());
}
