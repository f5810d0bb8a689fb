use chrono::NaiveDate;
use ulid::Ulid;

use crate::model::*;

/// Every appointment ever booked on one calendar date, rejected ones included.
#[derive(Debug, Clone)]
pub struct DayLedger {
    pub date: NaiveDate,
    /// Sorted by `time_slot`; appointments sharing a slot keep booking order.
    pub appointments: Vec<Appointment>,
}

impl DayLedger {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            appointments: Vec::new(),
        }
    }

    /// Insert maintaining sort order by time slot.
    pub fn insert(&mut self, appointment: Appointment) {
        let pos = self
            .appointments
            .partition_point(|a| a.time_slot <= appointment.time_slot);
        self.appointments.insert(pos, appointment);
    }

    /// All appointments (any status) booked for `time`.
    pub fn at(&self, time: SlotTime) -> &[Appointment] {
        let start = self.appointments.partition_point(|a| a.time_slot < time);
        let end = self.appointments.partition_point(|a| a.time_slot <= time);
        &self.appointments[start..end]
    }

    /// The pending or approved appointment owning `time`, if any.
    pub fn holder(&self, time: SlotTime) -> Option<&Appointment> {
        self.at(time).iter().find(|a| a.holds_slot())
    }

    pub fn get(&self, id: &Ulid) -> Option<&Appointment> {
        self.appointments.iter().find(|a| a.id == *id)
    }

    /// Apply an appointment event. Caller holds the lock.
    pub fn apply(&mut self, event: &Event) {
        match event {
            Event::AppointmentBooked { appointment } => self.insert(appointment.clone()),
            Event::AppointmentReviewed {
                id,
                status,
                reviewed_by,
                reviewed_at,
                ..
            } => {
                if let Some(a) = self.appointments.iter_mut().find(|a| a.id == *id) {
                    a.status = *status;
                    a.reviewed_by = Some(reviewed_by.clone());
                    a.reviewed_at = Some(*reviewed_at);
                }
            }
            Event::WorkingHoursSet { .. }
            | Event::DateClosed { .. }
            | Event::DateReopened { .. }
            | Event::ServiceSaved { .. } => {}
        }
    }
}
