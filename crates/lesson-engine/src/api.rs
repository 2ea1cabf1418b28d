//! Typed request and response records for stateless callers.
//!
//! Each request carries a [`ScheduleSnapshot`]: everything needed to answer it without
//! a store. The CLI reads these from JSON files; the wasm bindings receive them as
//! JSON strings.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::availability::{AvailabilityIndex, WeeklyAvailabilityRule};
use crate::booking::Booking;
use crate::config::EngineConfig;
use crate::conflict::{find_conflicts, Approval, Conflict, ConflictResolver};
use crate::error::{Rejection, ValidationError};
use crate::interval::TimeInterval;
use crate::notification::{schedule_for, ReminderNotification};
use crate::pricing::{quote, Money, Quote};
use crate::slots::{bookable_slots, BookableSlot};
use crate::teacher::TeacherProfile;

/// One teacher's schedule at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSnapshot {
    pub teacher: TeacherProfile,
    #[serde(default)]
    pub rules: Vec<WeeklyAvailabilityRule>,
    #[serde(default)]
    pub bookings: Vec<Booking>,
    pub now: DateTime<Utc>,
}

impl ScheduleSnapshot {
    fn index(&self, config: &EngineConfig) -> Result<AvailabilityIndex, ValidationError> {
        self.teacher.validate(config)?;
        for booking in &self.bookings {
            if booking.teacher_id != self.teacher.teacher_id {
                return Err(ValidationError::ForeignBooking {
                    booking_id: booking.id.clone(),
                    teacher_id: booking.teacher_id.clone(),
                    expected: self.teacher.teacher_id.clone(),
                });
            }
            booking.validate()?;
        }
        AvailabilityIndex::with_schedule(
            &self.teacher.teacher_id,
            self.teacher.timezone,
            self.rules
                .iter()
                .filter(|r| r.teacher_id == self.teacher.teacher_id)
                .cloned(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRequest {
    pub schedule: ScheduleSnapshot,
    pub start: DateTime<Utc>,
    pub duration_minutes: i64,
    #[serde(default)]
    pub exclude_booking_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval: Option<Approval>,
    /// Every buffered collision, not just the first; empty unless rejected for one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<Conflict>,
}

impl CheckResponse {
    fn approved(approval: Approval) -> Self {
        Self {
            ok: true,
            reason: None,
            message: None,
            approval: Some(approval),
            conflicts: Vec::new(),
        }
    }

    fn rejected(rejection: &Rejection, conflicts: Vec<Conflict>) -> Self {
        Self {
            ok: false,
            reason: Some(rejection.code().to_string()),
            message: Some(rejection.to_string()),
            approval: None,
            conflicts,
        }
    }
}

/// Would the candidate in `request` be accepted?
pub fn check(
    config: &EngineConfig,
    request: &CheckRequest,
) -> Result<CheckResponse, ValidationError> {
    let schedule = &request.schedule;
    let availability = schedule.index(config)?;
    let candidate = TimeInterval::starting_at(request.start, request.duration_minutes)?;
    let exclude = request.exclude_booking_id.as_deref();

    let resolver = ConflictResolver::new(config, &availability);
    let verdict = resolver.can_book(
        &candidate,
        &schedule.teacher,
        &schedule.bookings,
        exclude,
        schedule.now,
    );
    match verdict {
        Ok(approval) => Ok(CheckResponse::approved(approval)),
        Err(rejection) => {
            let conflicts = match rejection {
                Rejection::SlotUnavailable { .. } => find_conflicts(
                    &candidate,
                    &schedule.bookings,
                    schedule.teacher.buffer_minutes,
                    exclude,
                ),
                _ => Vec::new(),
            };
            Ok(CheckResponse::rejected(&rejection, conflicts))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotsRequest {
    pub schedule: ScheduleSnapshot,
    /// Teacher-local calendar date.
    pub date: NaiveDate,
    pub duration_minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotsResponse {
    pub teacher_id: String,
    pub date: NaiveDate,
    pub timezone: Tz,
    pub duration_minutes: i64,
    pub slots: Vec<BookableSlot>,
}

pub fn slots(
    config: &EngineConfig,
    request: &SlotsRequest,
) -> Result<SlotsResponse, ValidationError> {
    let schedule = &request.schedule;
    let availability = schedule.index(config)?;
    let resolver = ConflictResolver::new(config, &availability);
    let slots = bookable_slots(
        &resolver,
        &availability,
        &schedule.teacher,
        request.date,
        request.duration_minutes,
        config.slot_step_minutes,
        &schedule.bookings,
        schedule.now,
    );
    Ok(SlotsResponse {
        teacher_id: schedule.teacher.teacher_id.clone(),
        date: request.date,
        timezone: schedule.teacher.timezone,
        duration_minutes: request.duration_minutes,
        slots,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderPreviewRequest {
    pub booking: Booking,
    /// When the booking is (or would be) confirmed.
    pub confirmed_at: DateTime<Utc>,
}

/// The notifications a confirmation at `confirmed_at` would schedule.
pub fn preview_reminders(
    config: &EngineConfig,
    request: &ReminderPreviewRequest,
) -> Result<Vec<ReminderNotification>, ValidationError> {
    request.booking.validate()?;
    Ok(schedule_for(&request.booking, request.confirmed_at, &config.reminders))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub hourly_rate: Money,
    pub duration_minutes: i64,
}

/// A lesson never spans more than one day.
const MAX_QUOTE_MINUTES: i64 = 24 * 60;

/// Price a lesson at a rate within the configured bounds.
pub fn quote_lesson(
    config: &EngineConfig,
    request: &QuoteRequest,
) -> Result<Quote, ValidationError> {
    if request.duration_minutes <= 0 || request.duration_minutes > MAX_QUOTE_MINUTES {
        return Err(ValidationError::InvalidDuration(request.duration_minutes));
    }
    if request.hourly_rate < config.min_hourly_rate || request.hourly_rate > config.max_hourly_rate
    {
        return Err(ValidationError::HourlyRateOutOfRange(
            request.hourly_rate.minor(),
        ));
    }
    Ok(quote(request.hourly_rate, request.duration_minutes, &config.pricing))
}
