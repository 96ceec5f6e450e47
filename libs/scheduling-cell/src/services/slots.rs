use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Days, Duration, NaiveDate, NaiveTime, Utc};
use tracing::debug;

use provider_cell::models::{Provider, WeeklySchedule};

use crate::error::SchedulingError;
use crate::store::BookingStore;

/// Derives the bookable slots for a provider over a horizon.
///
/// This is a read-only, point-in-time projection: a returned slot can be
/// taken by another requester at any moment, which is why the arbiter
/// re-checks atomically on reservation.
pub struct SlotGenerator {
    store: Arc<dyn BookingStore>,
}

impl SlotGenerator {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self { store }
    }

    /// Lazy chronological sequence of open slot starts, beginning the day
    /// after `now` and covering `horizon_days` days. Callers cap the
    /// result with `take(n)`; the cap is presentational and says nothing
    /// about slot exhaustion.
    pub async fn generate_slots(
        &self,
        provider: &Provider,
        horizon_days: u32,
        now: DateTime<Utc>,
    ) -> Result<SlotIter, SchedulingError> {
        let first_day = now
            .date_naive()
            .checked_add_days(Days::new(1))
            .ok_or_else(|| SchedulingError::InvalidSlot("Horizon out of range".to_string()))?;
        let horizon_end = first_day
            .checked_add_days(Days::new(horizon_days as u64))
            .ok_or_else(|| SchedulingError::InvalidSlot("Horizon out of range".to_string()))?;

        let from = first_day
            .and_time(NaiveTime::MIN)
            .and_utc();
        let to = horizon_end.and_time(NaiveTime::MIN).and_utc();

        // Single store read up front; iteration itself never blocks.
        let taken: HashSet<DateTime<Utc>> = self
            .store
            .active_starts(provider.id, from, to)
            .await?
            .into_iter()
            .collect();

        debug!(
            "Generating slots for provider {} over {} days ({} starts already taken)",
            provider.id,
            horizon_days,
            taken.len()
        );

        Ok(SlotIter::new(
            provider.schedule.clone(),
            first_day,
            horizon_days,
            taken,
        ))
    }
}

/// Iterator over open slot starts in chronological order.
pub struct SlotIter {
    schedule: WeeklySchedule,
    day: NaiveDate,
    days_left: u32,
    offset_minutes: u32,
    taken: HashSet<DateTime<Utc>>,
}

impl SlotIter {
    fn new(
        schedule: WeeklySchedule,
        first_day: NaiveDate,
        horizon_days: u32,
        taken: HashSet<DateTime<Utc>>,
    ) -> Self {
        Self {
            schedule,
            day: first_day,
            days_left: horizon_days,
            offset_minutes: 0,
            taken,
        }
    }

    fn day_minutes(&self) -> u32 {
        (self.schedule.end_hour - self.schedule.start_hour) * 60
    }

    fn advance_day(&mut self) {
        self.day = self
            .day
            .succ_opt()
            .unwrap_or(self.day);
        self.days_left = self.days_left.saturating_sub(1);
        self.offset_minutes = 0;
    }
}

impl Iterator for SlotIter {
    type Item = DateTime<Utc>;

    fn next(&mut self) -> Option<DateTime<Utc>> {
        loop {
            if self.days_left == 0 {
                return None;
            }

            if !self.schedule.is_working_day(self.day) {
                self.advance_day();
                continue;
            }
            if self.offset_minutes >= self.day_minutes() {
                self.advance_day();
                continue;
            }

            let time = NaiveTime::from_hms_opt(self.schedule.start_hour, 0, 0)
                .expect("validated schedule hours")
                + Duration::minutes(self.offset_minutes as i64);
            let slot = self.day.and_time(time).and_utc();
            self.offset_minutes += self.schedule.slot_minutes;

            if self.taken.contains(&slot) {
                continue;
            }
            return Some(slot);
        }
    }
}
