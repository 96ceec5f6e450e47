use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Weekly working-hours policy for a provider. Days use the portal's
/// Sunday-based convention: 0 = Sunday .. 6 = Saturday. Slots run inside
/// `[start_hour, end_hour)` at a fixed `slot_minutes` granularity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklySchedule {
    pub working_days: Vec<u8>,
    pub start_hour: u32,
    pub end_hour: u32,
    pub slot_minutes: u32,
}

impl Default for WeeklySchedule {
    fn default() -> Self {
        // Mon-Fri, 9:00-17:00, 30-minute slots
        Self {
            working_days: vec![1, 2, 3, 4, 5],
            start_hour: 9,
            end_hour: 17,
            slot_minutes: 30,
        }
    }
}

impl WeeklySchedule {
    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.working_days.is_empty() {
            return Err(ProviderError::InvalidSchedule(
                "At least one working day is required".to_string(),
            ));
        }
        if self.working_days.iter().any(|d| *d > 6) {
            return Err(ProviderError::InvalidSchedule(
                "Working days must be between 0 (Sunday) and 6 (Saturday)".to_string(),
            ));
        }
        if self.start_hour >= self.end_hour || self.end_hour > 24 {
            return Err(ProviderError::InvalidSchedule(
                "Start hour must be before end hour, within a single day".to_string(),
            ));
        }
        if self.slot_minutes == 0 || 60 % self.slot_minutes != 0 {
            return Err(ProviderError::InvalidSchedule(
                "Slot granularity must evenly divide one hour".to_string(),
            ));
        }
        Ok(())
    }

    pub fn includes_weekday(&self, weekday: Weekday) -> bool {
        let day_of_week: u8 = match weekday {
            Weekday::Sun => 0,
            Weekday::Mon => 1,
            Weekday::Tue => 2,
            Weekday::Wed => 3,
            Weekday::Thu => 4,
            Weekday::Fri => 5,
            Weekday::Sat => 6,
        };
        self.working_days.contains(&day_of_week)
    }

    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        use chrono::Datelike;
        self.includes_weekday(date.weekday())
    }

    /// Whether a time-of-day falls inside the bookable window. The
    /// granularity divides a whole hour, so any aligned start inside the
    /// window also ends inside it.
    pub fn in_window(&self, time: NaiveTime) -> bool {
        time.hour() >= self.start_hour && time.hour() < self.end_hour
    }

    /// Whether a timestamp sits exactly on the slot grid.
    pub fn is_aligned(&self, time: NaiveTime) -> bool {
        time.minute() % self.slot_minutes == 0 && time.second() == 0 && time.nanosecond() == 0
    }

    /// Number of slots in one working day.
    pub fn slots_per_day(&self) -> u32 {
        (self.end_hour - self.start_hour) * 60 / self.slot_minutes
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    pub id: Uuid,
    /// Portal identity of the staff member behind this provider.
    pub user_id: Uuid,
    pub display_name: String,
    pub specialty: Option<String>,
    pub is_active: bool,
    pub schedule: WeeklySchedule,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProviderRequest {
    pub user_id: Uuid,
    pub display_name: String,
    pub specialty: Option<String>,
    pub schedule: Option<WeeklySchedule>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateScheduleRequest {
    pub schedule: WeeklySchedule,
}

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not found")]
    NotFound,

    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("Store error: {0}")]
    Store(String),
}

impl From<shared_database::DbError> for ProviderError {
    fn from(e: shared_database::DbError) -> Self {
        ProviderError::Store(e.to_string())
    }
}
