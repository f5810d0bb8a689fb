use chrono::NaiveDate;
use thiserror::Error;

use crate::engine::EngineError;
use crate::model::SlotTime;

#[derive(Debug, Error)]
pub enum BookingError {
    /// Malformed or out-of-policy input the caller can correct.
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    /// Lost the slot to another booking. The caller re-queries availability.
    #[error("time slot {time} on {date} is already booked, please choose another")]
    SlotConflict { date: NaiveDate, time: SlotTime },
    #[error("storage timed out")]
    StorageTimeout,
    #[error("storage unavailable")]
    StorageUnavailable,
    #[error("{0}")]
    Authorization(String),
}

impl BookingError {
    /// Infrastructure failures: retryable, never shown in detail.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, BookingError::StorageTimeout | BookingError::StorageUnavailable)
    }

    pub(crate) fn from_engine(op: &'static str, err: EngineError) -> Self {
        match err {
            EngineError::NotFound(id) => BookingError::NotFound(format!("{id} not found")),
            EngineError::SlotTaken { date, time, holder } => {
                tracing::debug!(op, %date, slot = %time, %holder, "slot already held");
                BookingError::SlotConflict { date, time }
            }
            EngineError::StatusMismatch { id, current, .. } => {
                BookingError::Validation(format!("appointment {id} is already {current}"))
            }
            EngineError::LimitExceeded(what) => BookingError::Validation(what.into()),
            e @ (EngineError::AlreadyExists(_) | EngineError::WalError(_)) => {
                tracing::error!(op, error = %e, "storage operation failed");
                BookingError::StorageUnavailable
            }
        }
    }
}
