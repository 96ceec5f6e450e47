pub mod memory;
pub mod postgrest;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Booking, BookingQuery, BookingStatus};

pub use memory::MemoryBookingStore;
pub use postgrest::PostgrestBookingStore;

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub provider_id: Uuid,
    pub requester_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub duration_minutes: i32,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

#[derive(Error, Debug)]
pub enum StoreError {
    /// An active booking already holds (provider_id, start_time). This is
    /// the conflict signal the arbiter turns into `SchedulingError::Conflict`.
    #[error("an active booking already holds this provider/start pair")]
    DuplicateActiveSlot,

    #[error("booking not found")]
    NotFound,

    /// The booking's status no longer matches what the caller validated
    /// against; another writer got there first. Nothing was changed.
    #[error("booking status changed concurrently")]
    StaleStatus,

    #[error("store backend error: {0}")]
    Backend(String),
}

/// Durable booking store. `insert_active_unique` is the arbiter's single
/// serializable unit: implementations must make the duplicate check and
/// the insert atomic with respect to concurrent inserts for the same
/// (provider_id, start_time), without blocking other providers.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Insert a new `scheduled` booking unless an active booking already
    /// occupies the slot. All-or-nothing: on `DuplicateActiveSlot` no
    /// state has changed.
    async fn insert_active_unique(&self, new: NewBooking) -> Result<Booking, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Booking, StoreError>;

    /// Start times of active (scheduled/confirmed) bookings for a provider
    /// within `[from, to)`.
    async fn active_starts(
        &self,
        provider_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>, StoreError>;

    /// Compare-and-swap on the status field: the write applies only while
    /// the stored status still equals `expected`, otherwise `StaleStatus`
    /// and no state changes. Appends `note` to the booking notes when
    /// given. Returns the updated row.
    async fn update_status(
        &self,
        id: Uuid,
        expected: BookingStatus,
        status: BookingStatus,
        note: Option<String>,
    ) -> Result<Booking, StoreError>;

    /// Filtered search over bookings, newest start first.
    async fn search(&self, query: BookingQuery) -> Result<Vec<Booking>, StoreError>;
}
