use thiserror::Error;

use crate::models::BookingStatus;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum SchedulingError {
    /// The slot is already held by an active booking. Recoverable: the
    /// caller should re-query slots and pick another.
    #[error("Booking slot already taken")]
    Conflict,

    #[error("Provider not found")]
    ProviderNotFound,

    #[error("Booking not found")]
    BookingNotFound,

    /// Requested start falls outside the provider's working-hours policy
    /// or off the slot grid. Recoverable via the slot generator.
    #[error("Invalid slot: {0}")]
    InvalidSlot(String),

    #[error("Booking cannot move from {from} to {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("Cannot mark no-show before the scheduled start")]
    NoShowTooEarly,

    /// Store unavailable or write failed. Nothing was committed; the
    /// caller may retry.
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl From<StoreError> for SchedulingError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateActiveSlot => SchedulingError::Conflict,
            StoreError::NotFound => SchedulingError::BookingNotFound,
            StoreError::StaleStatus => {
                SchedulingError::Persistence("booking status changed concurrently".to_string())
            }
            StoreError::Backend(msg) => SchedulingError::Persistence(msg),
        }
    }
}

impl From<provider_cell::ProviderError> for SchedulingError {
    fn from(e: provider_cell::ProviderError) -> Self {
        match e {
            provider_cell::ProviderError::NotFound => SchedulingError::ProviderNotFound,
            provider_cell::ProviderError::InvalidSchedule(msg) => SchedulingError::InvalidSlot(msg),
            provider_cell::ProviderError::Store(msg) => SchedulingError::Persistence(msg),
        }
    }
}
