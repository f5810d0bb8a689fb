use async_trait::async_trait;
use chrono::NaiveDate;
use ulid::Ulid;

use crate::model::*;
use crate::store::{Review, Store};

use super::{Engine, EngineError};

#[async_trait]
impl Store for Engine {
    async fn working_hours(&self, day_of_week: u8) -> Result<Option<WorkingHours>, EngineError> {
        Ok(Engine::working_hours(self, day_of_week))
    }

    async fn list_working_hours(&self) -> Result<Vec<WorkingHours>, EngineError> {
        Ok(Engine::list_working_hours(self))
    }

    async fn put_working_hours(&self, hours: WorkingHours) -> Result<WorkingHours, EngineError> {
        Engine::put_working_hours(self, hours).await
    }

    async fn is_date_closed(&self, date: NaiveDate) -> Result<bool, EngineError> {
        Ok(Engine::is_date_closed(self, &date))
    }

    async fn set_date_closed(&self, date: NaiveDate, closed: bool) -> Result<(), EngineError> {
        Engine::set_date_closed(self, date, closed).await
    }

    async fn closed_dates(&self) -> Result<Vec<NaiveDate>, EngineError> {
        Ok(Engine::closed_dates(self))
    }

    async fn service(&self, id: Ulid) -> Result<Option<Service>, EngineError> {
        Ok(Engine::service(self, &id))
    }

    async fn list_services(&self) -> Result<Vec<Service>, EngineError> {
        Ok(Engine::list_services(self))
    }

    async fn save_service(&self, service: Service) -> Result<Service, EngineError> {
        Engine::save_service(self, service).await
    }

    async fn insert_appointment(&self, appointment: Appointment) -> Result<Appointment, EngineError> {
        self.book_appointment(appointment).await
    }

    async fn appointment(&self, id: Ulid) -> Result<Option<Appointment>, EngineError> {
        Ok(Engine::appointment(self, &id).await)
    }

    async fn appointments_on(&self, date: NaiveDate) -> Result<Vec<Appointment>, EngineError> {
        Ok(Engine::appointments_on(self, &date).await)
    }

    async fn review_appointment(&self, review: Review) -> Result<Appointment, EngineError> {
        Engine::review_appointment(self, review).await
    }

    async fn find_appointments(
        &self,
        filter: &AppointmentFilter,
    ) -> Result<Vec<Appointment>, EngineError> {
        Ok(Engine::find_appointments(self, filter).await)
    }
}
