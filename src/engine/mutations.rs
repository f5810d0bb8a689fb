use chrono::NaiveDate;
use tokio::sync::oneshot;

use crate::limits::*;
use crate::model::*;
use crate::store::Review;

use super::conflict::{check_slot_vacant, check_status};
use super::{Engine, EngineError, WalCommand};

impl Engine {
    /// Atomically claim `(date, time_slot)` and record the appointment.
    ///
    /// The vacancy check and the WAL commit both run under the date's write
    /// lock, so of any number of concurrent claims on the same slot exactly
    /// one can observe it vacant. Once the check passes the commit finishes
    /// even if this future is dropped.
    pub async fn book_appointment(&self, appointment: Appointment) -> Result<Appointment, EngineError> {
        let gate = self.enter_commit().await;
        if self.appointment_dates.contains_key(&appointment.id) {
            return Err(EngineError::AlreadyExists(appointment.id));
        }
        let guard = self.day_or_create(appointment.date).write_owned().await;
        if guard.appointments.len() >= MAX_APPOINTMENTS_PER_DAY {
            return Err(EngineError::LimitExceeded("too many appointments on date"));
        }

        if appointment.holds_slot() {
            check_slot_vacant(&guard, appointment.time_slot)?;
        }

        let event = Event::AppointmentBooked {
            appointment: appointment.clone(),
        };
        self.commit_to_ledger(gate, guard, event).await?;
        Ok(appointment)
    }

    /// Move an appointment from `review.expected` to `review.status`.
    pub async fn review_appointment(&self, review: Review) -> Result<Appointment, EngineError> {
        let gate = self.enter_commit().await;
        let guard = self.resolve_appointment_write(&review.id).await?;
        let current = guard
            .get(&review.id)
            .ok_or(EngineError::NotFound(review.id))?;
        check_status(current, review.expected)?;
        let (date, time) = (current.date, current.time_slot);
        if review.status.holds_slot() && !current.holds_slot() {
            check_slot_vacant(&guard, time)?;
        }

        let event = Event::AppointmentReviewed {
            id: review.id,
            date,
            status: review.status,
            reviewed_by: review.reviewed_by,
            reviewed_at: review.reviewed_at,
        };
        let guard = self.commit_to_ledger(gate, guard, event).await?;
        guard
            .get(&review.id)
            .cloned()
            .ok_or(EngineError::NotFound(review.id))
    }

    pub async fn put_working_hours(&self, hours: WorkingHours) -> Result<WorkingHours, EngineError> {
        let event = Event::WorkingHoursSet {
            hours: hours.clone(),
        };
        self.commit_config(event).await?;
        Ok(hours)
    }

    /// Close or reopen a date. No WAL write when nothing changes.
    pub async fn set_date_closed(&self, date: NaiveDate, closed: bool) -> Result<(), EngineError> {
        if self.closed_dates.contains(&date) == closed {
            return Ok(());
        }
        let event = if closed {
            Event::DateClosed { date }
        } else {
            Event::DateReopened { date }
        };
        self.commit_config(event).await
    }

    pub async fn save_service(&self, service: Service) -> Result<Service, EngineError> {
        if !self.services.contains_key(&service.id) && self.services.len() >= MAX_SERVICES {
            return Err(EngineError::LimitExceeded("too many services"));
        }
        let event = Event::ServiceSaved {
            service: service.clone(),
        };
        self.commit_config(event).await?;
        Ok(service)
    }

    /// Compact the WAL by rewriting it with only the events needed to recreate the current state.
    pub async fn compact_wal(&self) -> Result<(), EngineError> {
        let _exclusive = self.commit_gate.write().await;
        let mut events = Vec::new();

        let mut hours: Vec<WorkingHours> = self.hours.iter().map(|e| e.value().clone()).collect();
        hours.sort_by_key(|h| h.day_of_week);
        events.extend(hours.into_iter().map(|hours| Event::WorkingHoursSet { hours }));

        let mut closed: Vec<NaiveDate> = self.closed_dates.iter().map(|d| *d).collect();
        closed.sort();
        events.extend(closed.into_iter().map(|date| Event::DateClosed { date }));

        let mut services: Vec<Service> = self.services.iter().map(|e| e.value().clone()).collect();
        services.sort_by_key(|s| s.id);
        events.extend(services.into_iter().map(|service| Event::ServiceSaved { service }));

        let mut dates: Vec<NaiveDate> = self.days.iter().map(|e| *e.key()).collect();
        dates.sort();
        for date in dates {
            let Some(ledger) = self.get_day(&date) else {
                continue;
            };
            let guard = ledger.read().await;
            // Booking order within a slot is preserved by the ledger's ordering.
            for appointment in &guard.appointments {
                events.push(Event::AppointmentBooked {
                    appointment: appointment.clone(),
                });
            }
        }

        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact { events, response: tx })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))
    }

    pub async fn wal_appends_since_compact(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self
            .wal_tx
            .send(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}
