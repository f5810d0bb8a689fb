use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Deserializer};
use ulid::Ulid;

use crate::model::*;

use super::{require_admin, BookingError, Scheduler};

/// Partial update of one weekday. Absent fields keep their current value;
/// `breakStart`/`breakEnd` set to `null` clear the break.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WorkingHoursPatch {
    pub is_open: Option<bool>,
    pub open_time: Option<SlotTime>,
    pub close_time: Option<SlotTime>,
    pub slot_interval: Option<u16>,
    #[serde(default, deserialize_with = "present")]
    pub break_start: Option<Option<SlotTime>>,
    #[serde(default, deserialize_with = "present")]
    pub break_end: Option<Option<SlotTime>>,
}

/// Distinguishes an explicit `null` (`Some(None)`) from an absent field (`None`).
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl WorkingHoursPatch {
    fn apply_to(self, mut hours: WorkingHours) -> WorkingHours {
        if let Some(v) = self.is_open {
            hours.is_open = v;
        }
        if let Some(v) = self.open_time {
            hours.open_time = v;
        }
        if let Some(v) = self.close_time {
            hours.close_time = v;
        }
        if let Some(v) = self.slot_interval {
            hours.slot_interval = v;
        }
        if let Some(v) = self.break_start {
            hours.break_start = v;
        }
        if let Some(v) = self.break_end {
            hours.break_end = v;
        }
        hours
    }
}

fn check_weekday(day_of_week: u8) -> Result<(), BookingError> {
    if day_of_week > 6 {
        return Err(BookingError::Validation(format!(
            "day of week must be 0 (Sunday) to 6 (Saturday), got {day_of_week}"
        )));
    }
    Ok(())
}

/// Weekly schedule written into an empty store.
fn seed_hours(day_of_week: u8) -> WorkingHours {
    WorkingHours {
        day_of_week,
        is_open: day_of_week != 0,
        open_time: SlotTime::hm(9, 0),
        close_time: SlotTime::hm(19, 0),
        slot_interval: 30,
        break_start: Some(SlotTime::hm(13, 0)),
        break_end: Some(SlotTime::hm(14, 0)),
    }
}

/// Catalog written into an empty store: (name, description, price, minutes).
const SEED_SERVICES: [(&str, &str, u64, u16); 5] = [
    ("Haircut", "Classic men's haircut", 15_000, 30),
    ("Beard Shave", "Straight razor beard shave", 10_000, 20),
    ("Haircut + Beard", "Haircut and beard shave combo", 22_000, 45),
    ("Waxing", "Face and nose waxing", 8_000, 15),
    ("Skin Care", "Facial cleansing and mask", 20_000, 60),
];

impl Scheduler {
    /// The effective configuration for `day_of_week`, falling back to
    /// [`WorkingHours::fallback`] when nothing is stored.
    pub async fn working_hours_for(&self, day_of_week: u8) -> Result<WorkingHours, BookingError> {
        check_weekday(day_of_week)?;
        let stored = self
            .bounded("working_hours", self.store.working_hours(day_of_week))
            .await?;
        Ok(stored.unwrap_or_else(|| WorkingHours::fallback(day_of_week)))
    }

    /// All seven weekdays, Sunday first.
    pub async fn list_working_hours(&self) -> Result<Vec<WorkingHours>, BookingError> {
        let stored = self
            .bounded("list_working_hours", self.store.list_working_hours())
            .await?;
        Ok((0..=6u8)
            .map(|day| {
                stored
                    .iter()
                    .find(|h| h.day_of_week == day)
                    .cloned()
                    .unwrap_or_else(|| WorkingHours::fallback(day))
            })
            .collect())
    }

    /// Upsert one weekday. Fields missing from `patch` keep the current
    /// (or fallback) value; the merged record must validate.
    pub async fn update_working_hours(
        &self,
        claim: &Claim,
        day_of_week: u8,
        patch: WorkingHoursPatch,
    ) -> Result<WorkingHours, BookingError> {
        require_admin(claim)?;
        let current = self.working_hours_for(day_of_week).await?;
        let updated = patch.apply_to(current);
        updated.validate().map_err(BookingError::Validation)?;

        let saved = self
            .bounded("put_working_hours", self.store.put_working_hours(updated))
            .await?;
        tracing::info!(
            day_of_week,
            is_open = saved.is_open,
            open = %saved.open_time,
            close = %saved.close_time,
            admin = %claim.user_id,
            "working hours updated"
        );
        Ok(saved)
    }

    pub async fn close_date(&self, claim: &Claim, date: NaiveDate) -> Result<(), BookingError> {
        require_admin(claim)?;
        self.bounded("close_date", self.store.set_date_closed(date, true))
            .await?;
        tracing::info!(%date, admin = %claim.user_id, "date closed");
        Ok(())
    }

    pub async fn reopen_date(&self, claim: &Claim, date: NaiveDate) -> Result<(), BookingError> {
        require_admin(claim)?;
        self.bounded("reopen_date", self.store.set_date_closed(date, false))
            .await?;
        tracing::info!(%date, admin = %claim.user_id, "date reopened");
        Ok(())
    }

    pub async fn closed_dates(&self, claim: &Claim) -> Result<Vec<NaiveDate>, BookingError> {
        require_admin(claim)?;
        self.bounded("closed_dates", self.store.closed_dates()).await
    }

    /// Seed the weekly schedule and catalog when the store holds none.
    /// Returns whether anything was written.
    pub async fn seed_defaults(&self) -> Result<bool, BookingError> {
        let mut seeded = false;

        let hours = self
            .bounded("list_working_hours", self.store.list_working_hours())
            .await?;
        if hours.is_empty() {
            for day in 0..=6u8 {
                self.bounded("put_working_hours", self.store.put_working_hours(seed_hours(day)))
                    .await?;
            }
            seeded = true;
        }

        let services = self
            .bounded("list_services", self.store.list_services())
            .await?;
        if services.is_empty() {
            for (order, (name, description, price, minutes)) in SEED_SERVICES.into_iter().enumerate() {
                let service = Service {
                    id: Ulid::new(),
                    name: name.into(),
                    description: Some(description.into()),
                    price,
                    duration_minutes: minutes,
                    is_active: true,
                    display_order: order as i32 + 1,
                    created_at: Utc::now(),
                };
                self.bounded("save_service", self.store.save_service(service))
                    .await?;
            }
            seeded = true;
        }

        if seeded {
            tracing::info!("seeded default working hours and service catalog");
        }
        Ok(seeded)
    }
}
