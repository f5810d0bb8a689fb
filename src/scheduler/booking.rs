use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;
use crate::observability::BOOKINGS_TOTAL;

use super::{BookingError, Scheduler};

/// A booking as submitted. Every field is optional on the wire so that a
/// missing field is a validation failure, not a decode failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    /// `YYYY-MM-DD`.
    pub date: Option<String>,
    /// `HH:MM`.
    pub time_slot: Option<String>,
    pub service_id: Option<String>,
    pub notes: Option<String>,
}

/// A request that passed the shape checks.
struct ValidBooking {
    customer_name: String,
    customer_phone: String,
    date: NaiveDate,
    time_slot: SlotTime,
    service_id: Ulid,
    notes: Option<String>,
}

fn required(value: Option<String>, field: &str, max_len: usize) -> Result<String, BookingError> {
    let value = value.map(|v| v.trim().to_string()).unwrap_or_default();
    if value.is_empty() {
        return Err(BookingError::Validation(format!("{field} is required")));
    }
    if value.chars().count() > max_len {
        return Err(BookingError::Validation(format!(
            "{field} must be at most {max_len} characters"
        )));
    }
    Ok(value)
}

impl BookingRequest {
    fn validate(self) -> Result<ValidBooking, BookingError> {
        let customer_name = required(self.customer_name, "customerName", MAX_CUSTOMER_NAME_LEN)?;
        let customer_phone = required(self.customer_phone, "customerPhone", MAX_PHONE_LEN)?;
        let date = required(self.date, "date", 32)?;
        let time_slot = required(self.time_slot, "timeSlot", 16)?;
        let service_id = required(self.service_id, "serviceId", 64)?;

        let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
            .map_err(|_| BookingError::Validation(format!("invalid date {date:?}: expected YYYY-MM-DD")))?;
        let time_slot: SlotTime = time_slot
            .parse()
            .map_err(|e: ParseSlotTimeError| BookingError::Validation(e.to_string()))?;
        let service_id = Ulid::from_string(&service_id)
            .map_err(|_| BookingError::Validation(format!("invalid serviceId {service_id:?}")))?;

        let notes = self
            .notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        if notes.as_ref().is_some_and(|n| n.chars().count() > MAX_NOTES_LEN) {
            return Err(BookingError::Validation(format!(
                "notes must be at most {MAX_NOTES_LEN} characters"
            )));
        }

        Ok(ValidBooking {
            customer_name,
            customer_phone,
            date,
            time_slot,
            service_id,
            notes,
        })
    }
}

fn outcome_label(err: &BookingError) -> &'static str {
    match err {
        BookingError::SlotConflict { .. } => "conflict",
        BookingError::NotFound(_) => "not_found",
        BookingError::StorageTimeout | BookingError::StorageUnavailable => "unavailable",
        BookingError::Validation(_) | BookingError::Authorization(_) => "rejected",
    }
}

impl Scheduler {
    /// Validate `request` and atomically claim its slot.
    ///
    /// Checks run in a fixed order and stop at the first failure: field
    /// presence and shape, not in the past, day open, slot inside the day's
    /// hours and on its slot grid, service active. The reservation itself is
    /// the last step and is the store's atomic check-and-insert; losing it is
    /// a `SlotConflict`.
    /// No other slot is tried on conflict.
    pub async fn create_booking(
        &self,
        request: BookingRequest,
        claim: Option<&Claim>,
    ) -> Result<Appointment, BookingError> {
        let result = self.try_create_booking(request, claim).await;
        let outcome = match &result {
            Ok(_) => "created",
            Err(e) => outcome_label(e),
        };
        metrics::counter!(BOOKINGS_TOTAL, "outcome" => outcome).increment(1);
        result
    }

    async fn try_create_booking(
        &self,
        request: BookingRequest,
        claim: Option<&Claim>,
    ) -> Result<Appointment, BookingError> {
        let req = request.validate()?;
        let (date, slot) = (req.date, req.time_slot);

        if slot.on(date) <= self.now() {
            return Err(BookingError::Validation(
                "cannot book an appointment in the past".into(),
            ));
        }

        let hours = self.working_hours_for(weekday_index(date)).await?;
        if !hours.is_open {
            return Err(BookingError::Validation(
                ClosedReason::Weekday.message().into(),
            ));
        }
        if self
            .bounded("is_date_closed", self.store.is_date_closed(date))
            .await?
        {
            return Err(BookingError::Validation(
                ClosedReason::ClosedDate.message().into(),
            ));
        }

        if !hours.admits(slot) {
            let reason = match hours.break_window() {
                Some((start, end)) if start <= slot && slot < end => {
                    format!("{slot} falls within the break ({start}-{end})")
                }
                _ => format!(
                    "{slot} is outside working hours ({}-{})",
                    hours.open_time, hours.close_time
                ),
            };
            return Err(BookingError::Validation(reason));
        }
        if !hours.slots().contains(&slot) {
            return Err(BookingError::Validation(format!(
                "{slot} is not a bookable slot; slots start at {} every {} minutes",
                hours.open_time, hours.slot_interval
            )));
        }

        let service = self
            .bounded("service", self.store.service(req.service_id))
            .await?
            .filter(|s| s.is_active)
            .ok_or_else(|| BookingError::NotFound("service not found".into()))?;

        let appointment = Appointment {
            id: Ulid::new(),
            customer_name: req.customer_name,
            customer_phone: req.customer_phone,
            date,
            time_slot: slot,
            service_id: service.id,
            status: AppointmentStatus::Pending,
            total_price: service.price,
            notes: req.notes,
            booked_by: claim.map(|c| c.user_id.clone()),
            reviewed_by: None,
            reviewed_at: None,
            created_at: Utc::now(),
        };

        match self
            .bounded("insert_appointment", self.store.insert_appointment(appointment))
            .await
        {
            Ok(created) => {
                tracing::info!(
                    appointment_id = %created.id,
                    %date,
                    %slot,
                    service_id = %service.id,
                    "appointment booked"
                );
                Ok(created)
            }
            Err(e) => {
                if e.is_infrastructure() {
                    tracing::error!(%date, %slot, service_id = %service.id, error = %e, "booking insert failed");
                }
                Err(e)
            }
        }
    }
}
