use crate::model::*;

use super::{DayLedger, EngineError};

/// Fail with `SlotTaken` if a pending or approved appointment owns `time`.
/// Only meaningful while the caller holds the ledger's write lock.
pub(crate) fn check_slot_vacant(ledger: &DayLedger, time: SlotTime) -> Result<(), EngineError> {
    match ledger.holder(time) {
        Some(holder) => Err(EngineError::SlotTaken {
            date: ledger.date,
            time,
            holder: holder.id,
        }),
        None => Ok(()),
    }
}

/// Compare-and-swap precondition for a status change.
pub(crate) fn check_status(
    appointment: &Appointment,
    expected: AppointmentStatus,
) -> Result<(), EngineError> {
    if appointment.status == expected {
        Ok(())
    } else {
        Err(EngineError::StatusMismatch {
            id: appointment.id,
            expected,
            current: appointment.status,
        })
    }
}
