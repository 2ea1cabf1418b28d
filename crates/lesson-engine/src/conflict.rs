//! Decide whether a candidate lesson interval is bookable.
//!
//! The checks run in a fixed order and the first failure is reported:
//!
//! 1. the teacher is active;
//! 2. the teacher's published hours cover the candidate ([`ContainmentPolicy`]);
//! 3. the duration is offered;
//! 4. the start respects the minimum and maximum advance notice;
//! 5. the teacher's daily lesson cap is not reached;
//! 6. no slot-holding booking, expanded by the teacher's buffer, overlaps the candidate.
//!
//! The resolver is a pure function of its inputs. Mutual exclusion between concurrent
//! callers is the job of the [`BookingStore`](crate::store::BookingStore) transaction
//! that wraps the check and the subsequent write.
//!
//! [`ContainmentPolicy`]: crate::availability::ContainmentPolicy

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::availability::AvailabilityIndex;
use crate::booking::Booking;
use crate::config::EngineConfig;
use crate::error::Rejection;
use crate::interval::{overlaps, with_buffer, TimeInterval};
use crate::pricing::{quote, Money, Quote};
use crate::teacher::TeacherProfile;
use crate::timezone::to_local;

/// A successful check: everything needed to create the booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    pub interval: TimeInterval,
    pub duration_minutes: i64,
    /// What the student is charged.
    pub amount: Money,
    pub quote: Quote,
}

/// An existing booking that collides with a candidate once buffers are applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub booking_id: String,
    pub interval: TimeInterval,
    /// Overlap between the candidate and the buffered booking.
    pub overlap_minutes: i64,
}

pub struct ConflictResolver<'a> {
    config: &'a EngineConfig,
    availability: &'a AvailabilityIndex,
}

impl<'a> ConflictResolver<'a> {
    pub fn new(config: &'a EngineConfig, availability: &'a AvailabilityIndex) -> Self {
        Self {
            config,
            availability,
        }
    }

    /// Check `candidate` against the teacher's rules and `existing` bookings.
    ///
    /// `exclude_booking_id` is skipped during the conflict and daily-cap checks, so a
    /// booking can be moved into a slot that overlaps only its own current interval.
    pub fn can_book<'b>(
        &self,
        candidate: &TimeInterval,
        teacher: &TeacherProfile,
        existing: impl IntoIterator<Item = &'b Booking> + Clone,
        exclude_booking_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Approval, Rejection> {
        if !teacher.active {
            return Err(Rejection::TeacherInactive);
        }

        if !self.availability.covers(
            &teacher.teacher_id,
            candidate,
            self.config.availability_check,
        ) {
            return Err(Rejection::OutsideAvailability);
        }

        let duration_minutes = candidate.duration_minutes();
        if !candidate.is_whole_minutes() || !self.config.durations.allows(duration_minutes) {
            return Err(Rejection::DurationNotAllowed {
                minutes: duration_minutes,
            });
        }

        let lead = candidate.start() - now;
        if lead < Duration::hours(i64::from(self.config.min_advance_hours)) {
            return Err(Rejection::TooSoon {
                min_hours: self.config.min_advance_hours,
            });
        }
        if lead > Duration::days(i64::from(self.config.max_advance_days)) {
            return Err(Rejection::TooFarAhead {
                max_days: self.config.max_advance_days,
            });
        }

        let local_date = to_local(candidate.start(), teacher.timezone).date();
        let same_day = existing
            .clone()
            .into_iter()
            .filter(|b| b.status.holds_slot() && Some(b.id.as_str()) != exclude_booking_id)
            .filter(|b| to_local(b.interval.start(), teacher.timezone).date() == local_date)
            .count();
        if same_day >= self.config.max_lessons_per_day as usize {
            return Err(Rejection::DailyLimitReached {
                limit: self.config.max_lessons_per_day,
            });
        }

        if let Some(conflict) =
            first_conflict(candidate, existing, teacher.buffer_minutes, exclude_booking_id)
        {
            return Err(Rejection::SlotUnavailable {
                conflicting_booking_id: conflict.booking_id,
            });
        }

        let quote = quote(teacher.hourly_rate, duration_minutes, &self.config.pricing);
        Ok(Approval {
            interval: *candidate,
            duration_minutes,
            amount: quote.student_pays,
            quote,
        })
    }
}

/// The first slot-holding booking that conflicts with `candidate` after expanding it by
/// `buffer_minutes` on both sides. Any single conflict is fatal, so this short-circuits.
pub fn first_conflict<'b>(
    candidate: &TimeInterval,
    existing: impl IntoIterator<Item = &'b Booking>,
    buffer_minutes: u32,
    exclude_booking_id: Option<&str>,
) -> Option<Conflict> {
    existing
        .into_iter()
        .find_map(|b| conflict_with(candidate, b, buffer_minutes, exclude_booking_id))
}

/// Every slot-holding booking that conflicts with `candidate`, in input order.
pub fn find_conflicts<'b>(
    candidate: &TimeInterval,
    existing: impl IntoIterator<Item = &'b Booking>,
    buffer_minutes: u32,
    exclude_booking_id: Option<&str>,
) -> Vec<Conflict> {
    existing
        .into_iter()
        .filter_map(|b| conflict_with(candidate, b, buffer_minutes, exclude_booking_id))
        .collect()
}

fn conflict_with(
    candidate: &TimeInterval,
    booking: &Booking,
    buffer_minutes: u32,
    exclude_booking_id: Option<&str>,
) -> Option<Conflict> {
    if !booking.status.holds_slot() || Some(booking.id.as_str()) == exclude_booking_id {
        return None;
    }
    let buffered = with_buffer(&booking.interval, buffer_minutes);
    overlaps(candidate, &buffered).then(|| Conflict {
        booking_id: booking.id.clone(),
        interval: booking.interval,
        overlap_minutes: candidate.overlap_minutes(&buffered),
    })
}
