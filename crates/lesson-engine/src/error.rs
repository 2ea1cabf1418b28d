//! Error types for lesson-engine operations.
//!
//! Three layers, from most to least caller-correctable:
//!
//! - [`ValidationError`] — malformed input, rejected before any scheduling logic runs.
//! - [`Rejection`] — a well-formed request that cannot be scheduled (conflict, policy).
//! - [`EngineError`] — everything an engine entry point can return, including
//!   authorization, lifecycle and persistence failures.

use serde::Serialize;
use thiserror::Error;

use crate::booking::BookingStatus;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid interval: start must be before end")]
    InvalidInterval,

    #[error("Invalid time of day '{0}', expected HH:MM")]
    InvalidWallTime(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid day of week {0}, expected 0 (Sunday) to 6 (Saturday)")]
    InvalidDayOfWeek(u8),

    #[error("Availability window {start}-{end} is empty or wraps past midnight")]
    EmptyWindow { start: String, end: String },

    #[error("One-off availability rules require a specific date")]
    MissingSpecificDate,

    #[error("Specific date {date} falls on day {actual}, rule says day {expected}")]
    DateWeekdayMismatch {
        date: String,
        expected: u8,
        actual: u8,
    },

    #[error("Invalid duration: {0} minutes")]
    InvalidDuration(i64),

    #[error("Reason must be at least {min} characters")]
    ReasonTooShort { min: usize },

    #[error("Notes must be at most {max} characters")]
    NotesTooLong { max: usize },

    #[error("Buffer of {0} minutes is outside the allowed range")]
    BufferOutOfRange(u32),

    #[error("Hourly rate {0} is outside the allowed range")]
    HourlyRateOutOfRange(i64),

    #[error("Payment amount mismatch: expected {expected}, got {actual}")]
    PaymentAmountMismatch { expected: i64, actual: i64 },

    #[error("Booking {booking_id} belongs to teacher {teacher_id}, not {expected}")]
    ForeignBooking {
        booking_id: String,
        teacher_id: String,
        expected: String,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// A typed refusal to schedule a lesson.
///
/// Rejections are recoverable: the caller picks another time or adjusts the request.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Rejection {
    #[error("Teacher is not available at this time")]
    OutsideAvailability,

    #[error("Lesson duration of {minutes} minutes is not offered")]
    DurationNotAllowed { minutes: i64 },

    #[error("Lessons must be booked at least {min_hours} hours in advance")]
    TooSoon { min_hours: u32 },

    #[error("Lessons cannot be booked more than {max_days} days in advance")]
    TooFarAhead { max_days: u32 },

    #[error("This time slot is no longer available")]
    SlotUnavailable { conflicting_booking_id: String },

    #[error("Teacher already has {limit} lessons on this day")]
    DailyLimitReached { limit: u32 },

    #[error("Student already has {limit} active bookings")]
    StudentLimitReached { limit: u32 },

    #[error("Teacher is not accepting bookings")]
    TeacherInactive,

    #[error("New lesson time must be in the future")]
    StartInPast,
}

impl Rejection {
    /// Stable machine-readable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            Rejection::OutsideAvailability => "OUTSIDE_AVAILABILITY",
            Rejection::DurationNotAllowed { .. } => "DURATION_NOT_ALLOWED",
            Rejection::TooSoon { .. } => "TOO_SOON",
            Rejection::TooFarAhead { .. } => "TOO_FAR_AHEAD",
            Rejection::SlotUnavailable { .. } => "SLOT_UNAVAILABLE",
            Rejection::DailyLimitReached { .. } => "DAILY_LIMIT_REACHED",
            Rejection::StudentLimitReached { .. } => "STUDENT_LIMIT_REACHED",
            Rejection::TeacherInactive => "TEACHER_INACTIVE",
            Rejection::StartInPast => "START_IN_PAST",
        }
    }
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Rejected(#[from] Rejection),

    #[error("Actor {actor_id} may not act on {resource}")]
    Forbidden { actor_id: String, resource: String },

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Cannot {action} booking {booking_id} in status {from:?}")]
    InvalidTransition {
        booking_id: String,
        from: BookingStatus,
        action: &'static str,
    },

    #[error("Store error: {0}")]
    Store(String),
}

impl EngineError {
    /// Only persistence failures are worth retrying; everything else will fail again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Store(_))
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            EngineError::Rejected(r) => Some(r),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
