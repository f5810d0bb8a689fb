use chrono::NaiveDate;
use ulid::Ulid;

use crate::model::*;

use super::Engine;

impl Engine {
    pub fn working_hours(&self, day_of_week: u8) -> Option<WorkingHours> {
        self.hours.get(&day_of_week).map(|e| e.value().clone())
    }

    pub fn list_working_hours(&self) -> Vec<WorkingHours> {
        let mut all: Vec<WorkingHours> = self.hours.iter().map(|e| e.value().clone()).collect();
        all.sort_by_key(|h| h.day_of_week);
        all
    }

    pub fn is_date_closed(&self, date: &NaiveDate) -> bool {
        self.closed_dates.contains(date)
    }

    pub fn closed_dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self.closed_dates.iter().map(|d| *d).collect();
        dates.sort();
        dates
    }

    pub fn service(&self, id: &Ulid) -> Option<Service> {
        self.services.get(id).map(|e| e.value().clone())
    }

    /// All services, active or not, by `(display_order, name)`.
    pub fn list_services(&self) -> Vec<Service> {
        let mut all: Vec<Service> = self.services.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| {
            a.display_order
                .cmp(&b.display_order)
                .then_with(|| a.name.cmp(&b.name))
        });
        all
    }

    pub async fn appointment(&self, id: &Ulid) -> Option<Appointment> {
        let date = self.appointment_dates.get(id).map(|e| *e.value())?;
        let ledger = self.get_day(&date)?;
        let guard = ledger.read().await;
        guard.get(id).cloned()
    }

    /// One consistent snapshot of a date's ledger.
    pub async fn appointments_on(&self, date: &NaiveDate) -> Vec<Appointment> {
        match self.get_day(date) {
            Some(ledger) => ledger.read().await.appointments.clone(),
            None => Vec::new(),
        }
    }

    pub async fn find_appointments(&self, filter: &AppointmentFilter) -> Vec<Appointment> {
        let mut dates: Vec<NaiveDate> = match filter.date {
            Some(date) => vec![date],
            None => self
                .days
                .iter()
                .map(|e| *e.key())
                .filter(|d| filter.range.is_none_or(|(from, to)| from <= *d && *d <= to))
                .collect(),
        };
        dates.sort();

        let mut found = Vec::new();
        for date in dates {
            let Some(ledger) = self.get_day(&date) else {
                continue;
            };
            let guard = ledger.read().await;
            found.extend(guard.appointments.iter().filter(|a| filter.matches(a)).cloned());
        }
        found
    }
}
