//! The storage collaborator the scheduler is written against.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use ulid::Ulid;

use crate::engine::EngineError;
use crate::model::*;

/// A compare-and-swap status change: applies only while the appointment is
/// still in `expected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
    pub id: Ulid,
    pub expected: AppointmentStatus,
    pub status: AppointmentStatus,
    pub reviewed_by: String,
    pub reviewed_at: DateTime<Utc>,
}

/// Durable state behind the scheduler. Implementations must make
/// `insert_appointment` an atomic check-and-insert over `(date, time_slot)`
/// among pending and approved appointments, failing with
/// [`EngineError::SlotTaken`] when the slot is owned.
#[async_trait]
pub trait Store: Send + Sync {
    async fn working_hours(&self, day_of_week: u8) -> Result<Option<WorkingHours>, EngineError>;

    /// Stored records only, ordered by weekday.
    async fn list_working_hours(&self) -> Result<Vec<WorkingHours>, EngineError>;

    /// Upsert keyed by `day_of_week`.
    async fn put_working_hours(&self, hours: WorkingHours) -> Result<WorkingHours, EngineError>;

    async fn is_date_closed(&self, date: NaiveDate) -> Result<bool, EngineError>;

    async fn set_date_closed(&self, date: NaiveDate, closed: bool) -> Result<(), EngineError>;

    async fn closed_dates(&self) -> Result<Vec<NaiveDate>, EngineError>;

    async fn service(&self, id: Ulid) -> Result<Option<Service>, EngineError>;

    async fn list_services(&self) -> Result<Vec<Service>, EngineError>;

    /// Upsert keyed by `id`.
    async fn save_service(&self, service: Service) -> Result<Service, EngineError>;

    async fn insert_appointment(&self, appointment: Appointment) -> Result<Appointment, EngineError>;

    async fn appointment(&self, id: Ulid) -> Result<Option<Appointment>, EngineError>;

    /// Every appointment on `date`, any status, ordered by time slot.
    async fn appointments_on(&self, date: NaiveDate) -> Result<Vec<Appointment>, EngineError>;

    async fn review_appointment(&self, review: Review) -> Result<Appointment, EngineError>;

    /// Matching appointments ordered by `(date, time_slot)`.
    async fn find_appointments(
        &self,
        filter: &AppointmentFilter,
    ) -> Result<Vec<Appointment>, EngineError>;
}
