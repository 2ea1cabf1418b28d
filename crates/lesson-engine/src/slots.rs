//! List the bookable lesson starts on one teacher-local date.
//!
//! Walks the date's effective availability windows at a fixed step, resolves each
//! local start to an instant in the teacher's zone, and keeps the starts the
//! [`ConflictResolver`] approves.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::availability::AvailabilityIndex;
use crate::booking::Booking;
use crate::conflict::ConflictResolver;
use crate::interval::{enumerate_slots, TimeInterval, WallTime};
use crate::pricing::Money;
use crate::teacher::TeacherProfile;
use crate::timezone::{from_local, DstPolicy};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookableSlot {
    /// Start as shown to the teacher.
    pub local_start: WallTime,
    pub interval: TimeInterval,
    pub amount: Money,
}

/// Bookable `duration_minutes` lessons starting on `date` (teacher-local), sorted by start.
#[allow(clippy::too_many_arguments)]
pub fn bookable_slots(
    resolver: &ConflictResolver<'_>,
    availability: &AvailabilityIndex,
    teacher: &TeacherProfile,
    date: NaiveDate,
    duration_minutes: i64,
    step_minutes: u32,
    existing: &[Booking],
    now: DateTime<Utc>,
) -> Vec<BookableSlot> {
    let mut seen: HashSet<DateTime<Utc>> = HashSet::new();
    let mut slots = Vec::new();

    for (window_start, window_end) in availability.windows_on(&teacher.teacher_id, date) {
        for local_start in enumerate_slots(window_start, window_end, step_minutes) {
            // Starts inside a DST gap collapse onto the same instant.
            let resolved = from_local(date, local_start, teacher.timezone, DstPolicy::ShiftForward);
            let Some(start) = resolved else {
                continue;
            };
            if !seen.insert(start) {
                continue;
            }
            let Ok(interval) = TimeInterval::starting_at(start, duration_minutes) else {
                continue;
            };
            if let Ok(approval) = resolver.can_book(&interval, teacher, existing, None, now) {
                slots.push(BookableSlot {
                    local_start,
                    interval,
                    amount: approval.amount,
                });
            }
        }
    }

    slots.sort_by_key(|s| s.interval.start());
    slots
}
