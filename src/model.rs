use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use ulid::Ulid;

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Role carried by a verified claim that may administer the shop.
pub const ROLE_ADMIN: &str = "admin";

/// A time of day at minute granularity, written `"HH:MM"` (24h).
///
/// Ordering matches lexicographic ordering of the zero-padded label, so
/// comparisons between labels and between `SlotTime`s always agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotTime(u16);

impl SlotTime {
    /// For literal labels known to be in range.
    pub(crate) const fn hm(hour: u16, minute: u16) -> Self {
        Self(hour * 60 + minute)
    }

    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self((hour * 60 + minute) as u16))
        } else {
            None
        }
    }

    pub fn from_minutes(minutes: u32) -> Option<Self> {
        (minutes < MINUTES_PER_DAY).then_some(Self(minutes as u16))
    }

    /// Minutes since midnight.
    pub fn minutes(self) -> u32 {
        u32::from(self.0)
    }

    pub fn hour(self) -> u32 {
        self.minutes() / 60
    }

    pub fn minute(self) -> u32 {
        self.minutes() % 60
    }

    pub fn to_naive_time(self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour(), self.minute(), 0).unwrap_or(NaiveTime::MIN)
    }

    /// The instant this label denotes on `date`.
    pub fn on(self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.to_naive_time())
    }
}

impl fmt::Display for SlotTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSlotTimeError(String);

impl fmt::Display for ParseSlotTimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid time {:?}: expected HH:MM", self.0)
    }
}

impl std::error::Error for ParseSlotTimeError {}

impl FromStr for SlotTime {
    type Err = ParseSlotTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseSlotTimeError(s.to_string());
        let (h, m) = s.split_once(':').ok_or_else(err)?;
        if h.len() != 2 || m.len() != 2 {
            return Err(err());
        }
        if !h.bytes().chain(m.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(err());
        }
        let hour: u32 = h.parse().map_err(|_| err())?;
        let minute: u32 = m.parse().map_err(|_| err())?;
        Self::from_hm(hour, minute).ok_or_else(err)
    }
}

impl Serialize for SlotTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SlotTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// 0 = Sunday … 6 = Saturday.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// Per-weekday opening configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingHours {
    pub day_of_week: u8,
    pub is_open: bool,
    pub open_time: SlotTime,
    pub close_time: SlotTime,
    /// Minutes between consecutive slots.
    pub slot_interval: u16,
    pub break_start: Option<SlotTime>,
    pub break_end: Option<SlotTime>,
}

impl WorkingHours {
    /// Configuration applied to a weekday that has no stored record:
    /// 08:30–20:00 every 30 minutes, no break, Sunday closed.
    pub fn fallback(day_of_week: u8) -> Self {
        Self {
            day_of_week,
            is_open: day_of_week != 0,
            open_time: SlotTime::hm(8, 30),
            close_time: SlotTime::hm(20, 0),
            slot_interval: 30,
            break_start: None,
            break_end: None,
        }
    }

    /// The break as a half-open window. Only honoured when both ends are set.
    pub fn break_window(&self) -> Option<(SlotTime, SlotTime)> {
        self.break_start.zip(self.break_end)
    }

    /// Candidate labels for a day governed by this record.
    pub fn slots(&self) -> Vec<SlotTime> {
        if !self.is_open {
            return Vec::new();
        }
        crate::slots::generate_slots(
            self.open_time,
            self.close_time,
            self.slot_interval,
            self.break_start,
            self.break_end,
        )
    }

    /// Whether `time` lies inside `[open, close)` and outside the break.
    pub fn admits(&self, time: SlotTime) -> bool {
        if !self.is_open || time < self.open_time || time >= self.close_time {
            return false;
        }
        match self.break_window() {
            Some((start, end)) => !(start <= time && time < end),
            None => true,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        use crate::limits::MIN_SLOT_INTERVAL_MINUTES;

        if self.day_of_week > 6 {
            return Err(format!("day of week {} out of range 0..=6", self.day_of_week));
        }
        if self.slot_interval < MIN_SLOT_INTERVAL_MINUTES {
            return Err(format!(
                "slot interval must be at least {MIN_SLOT_INTERVAL_MINUTES} minutes"
            ));
        }
        if self.break_start.is_some() != self.break_end.is_some() {
            return Err("break start and break end must be set together".into());
        }
        if !self.is_open {
            return Ok(());
        }
        if self.open_time >= self.close_time {
            return Err(format!(
                "open time {} must be before close time {}",
                self.open_time, self.close_time
            ));
        }
        if let Some((start, end)) = self.break_window()
            && start >= end
        {
            return Err(format!("break start {start} must be before break end {end}"));
        }
        Ok(())
    }
}

/// A bookable offering in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: Ulid,
    pub name: String,
    pub description: Option<String>,
    /// Minor currency units.
    pub price: u64,
    pub duration_minutes: u16,
    pub is_active: bool,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Approved,
    Rejected,
}

impl AppointmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Approved => "approved",
            AppointmentStatus::Rejected => "rejected",
        }
    }

    /// Pending and approved appointments own their `(date, slot)`.
    pub fn holds_slot(self) -> bool {
        !matches!(self, AppointmentStatus::Rejected)
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, AppointmentStatus::Pending)
    }

    /// `pending → approved | rejected`; terminal states have no exits.
    pub fn can_transition_to(self, next: AppointmentStatus) -> bool {
        matches!(
            (self, next),
            (AppointmentStatus::Pending, AppointmentStatus::Approved)
                | (AppointmentStatus::Pending, AppointmentStatus::Rejected)
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AppointmentStatus::Pending),
            "approved" => Ok(AppointmentStatus::Approved),
            "rejected" => Ok(AppointmentStatus::Rejected),
            other => Err(format!("unknown appointment status {other:?}")),
        }
    }
}

/// The reservation record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Ulid,
    pub customer_name: String,
    pub customer_phone: String,
    pub date: NaiveDate,
    pub time_slot: SlotTime,
    pub service_id: Ulid,
    pub status: AppointmentStatus,
    /// Service price at booking time.
    pub total_price: u64,
    pub notes: Option<String>,
    /// Identity that placed the booking, if the request carried one.
    pub booked_by: Option<String>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    pub fn holds_slot(&self) -> bool {
        self.status.holds_slot()
    }
}

/// A pre-verified identity handed to the core by the auth collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    pub user_id: String,
    pub role: String,
}

impl Claim {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

/// The WAL record format. One variant per durable state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    WorkingHoursSet {
        hours: WorkingHours,
    },
    DateClosed {
        date: NaiveDate,
    },
    DateReopened {
        date: NaiveDate,
    },
    ServiceSaved {
        service: Service,
    },
    AppointmentBooked {
        appointment: Appointment,
    },
    AppointmentReviewed {
        id: Ulid,
        date: NaiveDate,
        status: AppointmentStatus,
        reviewed_by: String,
        reviewed_at: DateTime<Utc>,
    },
}

// ── Query types ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlotAvailability {
    pub time: SlotTime,
    pub available: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ClosedReason {
    /// The weekday's working hours are marked closed.
    Weekday,
    /// The specific date was closed by an administrator.
    ClosedDate,
}

impl ClosedReason {
    pub fn message(self) -> &'static str {
        match self {
            ClosedReason::Weekday => "the shop is closed on this weekday",
            ClosedReason::ClosedDate => "the shop is closed on this date",
        }
    }
}

/// Availability verdict for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DayAvailability {
    Open {
        date: NaiveDate,
        slots: Vec<SlotAvailability>,
    },
    Closed {
        date: NaiveDate,
        reason: ClosedReason,
    },
}

impl DayAvailability {
    pub fn date(&self) -> NaiveDate {
        match self {
            DayAvailability::Open { date, .. } | DayAvailability::Closed { date, .. } => *date,
        }
    }

    /// Slots in chronological order; empty for a closed day.
    pub fn slots(&self) -> &[SlotAvailability] {
        match self {
            DayAvailability::Open { slots, .. } => slots,
            DayAvailability::Closed { .. } => &[],
        }
    }

    pub fn closed_reason(&self) -> Option<ClosedReason> {
        match self {
            DayAvailability::Open { .. } => None,
            DayAvailability::Closed { reason, .. } => Some(*reason),
        }
    }
}

/// Admin listing filter. All set criteria must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppointmentFilter {
    pub status: Option<AppointmentStatus>,
    pub date: Option<NaiveDate>,
    /// Inclusive on both ends.
    pub range: Option<(NaiveDate, NaiveDate)>,
    pub phone: Option<String>,
}

impl AppointmentFilter {
    pub fn matches(&self, appointment: &Appointment) -> bool {
        if self.status.is_some_and(|s| s != appointment.status) {
            return false;
        }
        if self.date.is_some_and(|d| d != appointment.date) {
            return false;
        }
        if let Some((from, to)) = self.range
            && (appointment.date < from || appointment.date > to)
        {
            return false;
        }
        if let Some(ref phone) = self.phone
            && *phone != appointment.customer_phone
        {
            return false;
        }
        true
    }
}
