//! Hard limits on user-supplied input.

pub const MIN_SLOT_INTERVAL_MINUTES: u16 = 15;
pub const MAX_CUSTOMER_NAME_LEN: usize = 100;
pub const MAX_PHONE_LEN: usize = 32;
pub const MAX_NOTES_LEN: usize = 500;
pub const MAX_SERVICE_NAME_LEN: usize = 100;
pub const MAX_DESCRIPTION_LEN: usize = 1_000;
/// Widest `from..=to` window an appointment listing may request.
pub const MAX_QUERY_RANGE_DAYS: i64 = 366;
/// Upper bound on appointments held by a single calendar day, rejected included.
pub const MAX_APPOINTMENTS_PER_DAY: usize = 2_000;
pub const MAX_SERVICES: usize = 500;
