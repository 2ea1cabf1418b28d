//! Timezone conversion between absolute instants and a party's local wall clock.
//!
//! The engine stores and compares instants in UTC only. Local time is derived on
//! demand, for availability-rule matching and display.

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::ValidationError;
use crate::interval::WallTime;

/// Policy for local times that fall into a DST gap (e.g. 02:30 during spring forward).
///
/// Ambiguous local times (the repeated hour in autumn) always resolve to the earlier
/// instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DstPolicy {
    /// The local time does not exist; produce nothing.
    Skip,
    /// Move to the first valid minute after the gap.
    #[default]
    ShiftForward,
}

/// Parse an IANA timezone name (e.g. "America/New_York").
pub fn parse_timezone(name: &str) -> Result<Tz, ValidationError> {
    name.parse()
        .map_err(|_| ValidationError::InvalidTimezone(name.to_string()))
}

/// The local wall-clock date and time of `instant` in `tz`.
pub fn to_local(instant: DateTime<Utc>, tz: Tz) -> NaiveDateTime {
    instant.with_timezone(&tz).naive_local()
}

/// Resolve a local date and wall time in `tz` to an absolute instant.
pub fn from_local(
    date: NaiveDate,
    time: WallTime,
    tz: Tz,
    policy: DstPolicy,
) -> Option<DateTime<Utc>> {
    resolve(date.and_time(time.to_naive()), tz, policy)
}

fn resolve(local: NaiveDateTime, tz: Tz, policy: DstPolicy) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => match policy {
            DstPolicy::Skip => None,
            DstPolicy::ShiftForward => {
                // No real-world gap exceeds a few hours.
                (1..=180).find_map(|m| {
                    match tz.from_local_datetime(&(local + Duration::minutes(m))) {
                        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
                        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
                        LocalResult::None => None,
                    }
                })
            }
        },
    }
}

/// Day-of-week index with Sunday as 0, matching availability rule numbering.
pub fn day_of_week(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}
