use std::collections::HashSet;

use chrono::NaiveDate;

use crate::model::*;

use super::{BookingError, Scheduler};

impl Scheduler {
    /// Which of `date`'s slots can still be booked.
    ///
    /// A slot is unavailable when a pending or approved appointment holds it,
    /// or when `date` is today and the slot starts at or before now. The
    /// taken set comes from one snapshot of the date's appointments.
    pub async fn resolve_availability(&self, date: NaiveDate) -> Result<DayAvailability, BookingError> {
        let hours = self.working_hours_for(weekday_index(date)).await?;
        let verdict = if !hours.is_open {
            DayAvailability::Closed {
                date,
                reason: ClosedReason::Weekday,
            }
        } else if self
            .bounded("is_date_closed", self.store.is_date_closed(date))
            .await?
        {
            DayAvailability::Closed {
                date,
                reason: ClosedReason::ClosedDate,
            }
        } else {
            let booked = self
                .bounded("appointments_on", self.store.appointments_on(date))
                .await?;
            let taken: HashSet<SlotTime> = booked
                .iter()
                .filter(|a| a.holds_slot())
                .map(|a| a.time_slot)
                .collect();

            let now = self.now();
            let slots = hours
                .slots()
                .into_iter()
                .map(|time| SlotAvailability {
                    time,
                    available: !taken.contains(&time) && time.on(date) > now,
                })
                .collect();
            DayAvailability::Open { date, slots }
        };

        let result = if verdict.closed_reason().is_some() { "closed" } else { "open" };
        metrics::counter!(crate::observability::AVAILABILITY_QUERIES_TOTAL, "result" => result)
            .increment(1);
        Ok(verdict)
    }
}
