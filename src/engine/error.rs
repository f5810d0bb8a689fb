use chrono::NaiveDate;
use thiserror::Error;
use ulid::Ulid;

use crate::model::{AppointmentStatus, SlotTime};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("not found: {0}")]
    NotFound(Ulid),
    #[error("already exists: {0}")]
    AlreadyExists(Ulid),
    #[error("slot {time} on {date} is held by appointment {holder}")]
    SlotTaken {
        date: NaiveDate,
        time: SlotTime,
        holder: Ulid,
    },
    #[error("appointment {id} is {current}, expected {expected}")]
    StatusMismatch {
        id: Ulid,
        expected: AppointmentStatus,
        current: AppointmentStatus,
    },
    #[error("limit exceeded: {0}")]
    LimitExceeded(&'static str),
    #[error("WAL error: {0}")]
    WalError(String),
}
