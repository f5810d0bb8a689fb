//! The slot allocation core: working hours, availability, booking,
//! review lifecycle and the service catalog.
//!
//! Every storage round trip goes through [`Scheduler::bounded`], which caps
//! it at the configured timeout and turns storage failures into
//! [`BookingError`]s that carry no internal detail.

mod availability;
mod booking;
mod catalog;
mod error;
mod hours;
mod lifecycle;

pub use booking::BookingRequest;
pub use catalog::{ServiceDraft, ServicePatch};
pub use error::BookingError;
pub use hours::WorkingHoursPatch;
pub use lifecycle::AppointmentQuery;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;

use crate::clock::Clock;
use crate::engine::EngineError;
use crate::model::Claim;
use crate::store::Store;

pub struct Scheduler {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    storage_timeout: Duration,
}

impl Scheduler {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, storage_timeout: Duration) -> Self {
        Self {
            store,
            clock,
            storage_timeout,
        }
    }

    pub(crate) fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    /// Run one storage operation under the storage timeout.
    pub(crate) async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<T, BookingError>
    where
        F: Future<Output = Result<T, EngineError>>,
    {
        match tokio::time::timeout(self.storage_timeout, fut).await {
            Ok(result) => result.map_err(|e| BookingError::from_engine(op, e)),
            Err(_) => {
                metrics::counter!(crate::observability::STORAGE_TIMEOUTS_TOTAL, "op" => op)
                    .increment(1);
                tracing::error!(op, timeout_ms = self.storage_timeout.as_millis() as u64, "storage operation timed out");
                Err(BookingError::StorageTimeout)
            }
        }
    }
}

/// Admin gate for every configuration and review operation.
pub(crate) fn require_admin(claim: &Claim) -> Result<(), BookingError> {
    if claim.is_admin() {
        Ok(())
    } else {
        tracing::warn!(user_id = %claim.user_id, role = %claim.role, "admin operation refused");
        Err(BookingError::Authorization(
            "administrator role required".into(),
        ))
    }
}
