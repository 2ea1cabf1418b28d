//! Time-interval primitives: absolute intervals, wall-clock times, overlap tests and
//! slot enumeration.
//!
//! All intervals are half-open (`[start, end)`). Intervals that merely touch
//! (`a.end == b.start`) do NOT overlap, which is what makes back-to-back lessons legal
//! when a teacher has no buffer.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// An absolute `[start, end)` interval. `start < end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawInterval")]
pub struct TimeInterval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

#[derive(Deserialize)]
struct RawInterval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TryFrom<RawInterval> for TimeInterval {
    type Error = ValidationError;

    fn try_from(raw: RawInterval) -> Result<Self, Self::Error> {
        TimeInterval::new(raw.start, raw.end)
    }
}

impl TimeInterval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ValidationError> {
        if start >= end {
            return Err(ValidationError::InvalidInterval);
        }
        Ok(Self { start, end })
    }

    /// Build an interval from a start instant and a positive length in minutes.
    pub fn starting_at(start: DateTime<Utc>, minutes: i64) -> Result<Self, ValidationError> {
        if minutes <= 0 {
            return Err(ValidationError::InvalidDuration(minutes));
        }
        let end = Duration::try_minutes(minutes)
            .and_then(|length| start.checked_add_signed(length))
            .ok_or(ValidationError::InvalidDuration(minutes))?;
        Self::new(start, end)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Length in whole minutes, truncated. See [`TimeInterval::is_whole_minutes`].
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// Whether the length is an exact number of minutes.
    pub fn is_whole_minutes(&self) -> bool {
        let length = self.end - self.start;
        length == Duration::minutes(length.num_minutes())
    }

    /// Minutes shared by `self` and `other`, zero when they do not overlap.
    pub fn overlap_minutes(&self, other: &TimeInterval) -> i64 {
        if !overlaps(self, other) {
            return 0;
        }
        let overlap_start = self.start.max(other.start);
        let overlap_end = self.end.min(other.end);
        (overlap_end - overlap_start).num_minutes()
    }
}

/// Two intervals overlap iff `a.start < b.end && b.start < a.end`.
///
/// Adjacent intervals where one ends exactly when the other starts are NOT overlapping.
pub fn overlaps(a: &TimeInterval, b: &TimeInterval) -> bool {
    a.start < b.end && b.start < a.end
}

/// Expand `interval` on both ends by `buffer_minutes`.
pub fn with_buffer(interval: &TimeInterval, buffer_minutes: u32) -> TimeInterval {
    let pad = Duration::minutes(i64::from(buffer_minutes));
    TimeInterval {
        start: interval.start - pad,
        end: interval.end + pad,
    }
}

/// A wall-clock time of day with minute precision, written `HH:MM` (00:00 to 23:59).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WallTime {
    minutes: u16,
}

impl WallTime {
    pub const MIDNIGHT: WallTime = WallTime { minutes: 0 };

    pub fn new(hour: u32, minute: u32) -> Result<Self, ValidationError> {
        if hour > 23 || minute > 59 {
            return Err(ValidationError::InvalidWallTime(format!(
                "{:02}:{:02}",
                hour, minute
            )));
        }
        Ok(Self {
            minutes: (hour * 60 + minute) as u16,
        })
    }

    /// Minutes since local midnight.
    pub fn minutes(&self) -> u32 {
        u32::from(self.minutes)
    }

    pub fn hour(&self) -> u32 {
        self.minutes() / 60
    }

    pub fn minute(&self) -> u32 {
        self.minutes() % 60
    }

    /// Truncates seconds.
    pub fn from_naive(time: NaiveTime) -> Self {
        Self {
            minutes: (time.hour() * 60 + time.minute()) as u16,
        }
    }

    pub fn to_naive(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour(), self.minute(), 0).unwrap_or(NaiveTime::MIN)
    }
}

impl FromStr for WallTime {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidWallTime(s.to_string());
        let (h, m) = s.split_once(':').ok_or_else(invalid)?;
        if h.len() != 2 || m.len() != 2 {
            return Err(invalid());
        }
        let hour: u32 = h.parse().map_err(|_| invalid())?;
        let minute: u32 = m.parse().map_err(|_| invalid())?;
        WallTime::new(hour, minute).map_err(|_| invalid())
    }
}

impl TryFrom<String> for WallTime {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<WallTime> for String {
    fn from(t: WallTime) -> Self {
        t.to_string()
    }
}

impl fmt::Display for WallTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

/// Lazy, restartable sequence of slot start times in `[day_start, day_end)`.
///
/// Created by [`enumerate_slots`]. Cloning the iterator restarts from the clone point.
#[derive(Debug, Clone)]
pub struct SlotIter {
    cursor: u32,
    end: u32,
    step: u32,
}

impl Iterator for SlotIter {
    type Item = WallTime;

    fn next(&mut self) -> Option<WallTime> {
        if self.step == 0 || self.cursor >= self.end {
            return None;
        }
        let slot = WallTime {
            minutes: self.cursor as u16,
        };
        self.cursor += self.step;
        Some(slot)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.step == 0 || self.cursor >= self.end {
            return (0, Some(0));
        }
        let n = (self.end - self.cursor).div_ceil(self.step) as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for SlotIter {}

/// Slot start times from `day_start` at `step_minutes` granularity, emitted while
/// `cursor < day_end`. `day_end` itself is never a start time. A zero step yields nothing.
pub fn enumerate_slots(day_start: WallTime, day_end: WallTime, step_minutes: u32) -> SlotIter {
    SlotIter {
        cursor: day_start.minutes(),
        end: day_end.minutes(),
        step: step_minutes,
    }
}

/// Merge overlapping or adjacent `[start, end)` wall-clock windows.
///
/// Returns a sorted, non-overlapping list.
pub fn merge_windows(windows: &[(WallTime, WallTime)]) -> Vec<(WallTime, WallTime)> {
    let mut sorted: Vec<(WallTime, WallTime)> =
        windows.iter().copied().filter(|(s, e)| s < e).collect();
    sorted.sort();

    let mut merged: Vec<(WallTime, WallTime)> = Vec::new();
    for (start, end) in sorted {
        if let Some(last) = merged.last_mut() {
            if start <= last.1 {
                last.1 = last.1.max(end);
                continue;
            }
        }
        merged.push((start, end));
    }
    merged
}
