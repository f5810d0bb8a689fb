use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use ulid::Ulid;

use crate::limits::MAX_QUERY_RANGE_DAYS;
use crate::model::*;
use crate::store::Review;

use super::{require_admin, BookingError, Scheduler};

/// Admin listing query as it arrives on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentQuery {
    pub status: Option<String>,
    pub date: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub phone: Option<String>,
}

fn parse_date(raw: &str, field: &str) -> Result<NaiveDate, BookingError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        BookingError::Validation(format!("invalid {field} {raw:?}: expected YYYY-MM-DD"))
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl AppointmentQuery {
    pub fn into_filter(self) -> Result<AppointmentFilter, BookingError> {
        let status = non_empty(self.status)
            .map(|s| s.parse::<AppointmentStatus>().map_err(BookingError::Validation))
            .transpose()?;
        let date = non_empty(self.date)
            .map(|d| parse_date(&d, "date"))
            .transpose()?;

        let range = match (non_empty(self.from), non_empty(self.to)) {
            (None, None) => None,
            (Some(from), Some(to)) => {
                let (from, to) = (parse_date(&from, "from")?, parse_date(&to, "to")?);
                if from > to {
                    return Err(BookingError::Validation(format!(
                        "from {from} is after to {to}"
                    )));
                }
                if (to - from).num_days() > MAX_QUERY_RANGE_DAYS {
                    return Err(BookingError::Validation(format!(
                        "date range may span at most {MAX_QUERY_RANGE_DAYS} days"
                    )));
                }
                Some((from, to))
            }
            _ => {
                return Err(BookingError::Validation(
                    "from and to must be given together".into(),
                ));
            }
        };

        Ok(AppointmentFilter {
            status,
            date,
            range,
            phone: non_empty(self.phone),
        })
    }
}

impl Scheduler {
    /// Move a pending appointment to `approved` or `rejected`.
    ///
    /// The change is a compare-and-swap against the status read here, so two
    /// admins reviewing the same appointment cannot both succeed.
    pub async fn set_status(
        &self,
        claim: &Claim,
        id: Ulid,
        status: &str,
    ) -> Result<Appointment, BookingError> {
        require_admin(claim)?;
        let target: AppointmentStatus = status.trim().parse().map_err(BookingError::Validation)?;
        if !target.is_terminal() {
            return Err(BookingError::Validation(format!(
                "status must be approved or rejected, got {target}"
            )));
        }

        let current = self
            .bounded("appointment", self.store.appointment(id))
            .await?
            .ok_or_else(|| BookingError::NotFound("appointment not found".into()))?;
        if !current.status.can_transition_to(target) {
            return Err(BookingError::Validation(format!(
                "appointment is already {}, cannot change to {target}",
                current.status
            )));
        }

        let review = Review {
            id,
            expected: current.status,
            status: target,
            reviewed_by: claim.user_id.clone(),
            reviewed_at: Utc::now(),
        };
        let updated = self
            .bounded("review_appointment", self.store.review_appointment(review))
            .await?;

        metrics::counter!(crate::observability::STATUS_TRANSITIONS_TOTAL, "status" => target.as_str())
            .increment(1);
        tracing::info!(
            appointment_id = %id,
            date = %updated.date,
            slot = %updated.time_slot,
            status = %target,
            admin = %claim.user_id,
            "appointment reviewed"
        );
        Ok(updated)
    }

    /// Appointments matching `filter`, ordered by `(date, time_slot)`.
    pub async fn list_appointments(
        &self,
        claim: &Claim,
        filter: AppointmentFilter,
    ) -> Result<Vec<Appointment>, BookingError> {
        require_admin(claim)?;
        let mut found = self
            .bounded("find_appointments", self.store.find_appointments(&filter))
            .await?;
        found.sort_by_key(|a| (a.date, a.time_slot));
        Ok(found)
    }
}
