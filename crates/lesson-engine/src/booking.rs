//! Booking and payment records, and the rules of the booking lifecycle.
//!
//! ```text
//! PENDING_PAYMENT ──confirm──▶ CONFIRMED ──complete──▶ COMPLETED
//!       │                         │  │
//!       │ expire / cancel         │  └─reschedule─▶ RESCHEDULED ──complete──▶ COMPLETED
//!       ▼                         ▼                     │
//!   CANCELLED ◀──────cancel───────┴─────────cancel──────┘
//!       │
//!       └─refund settled─▶ REFUNDED
//! ```
//!
//! A rescheduled booking keeps its id; the new interval replaces the old one in place
//! and the change is appended to [`Booking::history`].

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, ValidationError};
use crate::interval::TimeInterval;
use crate::pricing::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    PendingPayment,
    Confirmed,
    Rescheduled,
    Completed,
    Cancelled,
    Refunded,
}

impl BookingStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Completed | BookingStatus::Cancelled | BookingStatus::Refunded
        )
    }

    /// Statuses whose interval blocks the teacher's calendar.
    pub fn holds_slot(&self) -> bool {
        matches!(
            self,
            BookingStatus::PendingPayment | BookingStatus::Confirmed | BookingStatus::Rescheduled
        )
    }

    /// Confirmed, possibly moved, and not yet over.
    pub fn is_scheduled(&self) -> bool {
        matches!(self, BookingStatus::Confirmed | BookingStatus::Rescheduled)
    }
}

/// How a new booking is paid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMode {
    /// Payment is captured immediately and the booking starts out confirmed.
    #[default]
    Mock,
    /// The booking waits in `PENDING_PAYMENT` for the gateway webhook.
    Gateway,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub booking_id: String,
    pub amount: Money,
    pub status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_reference: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Student,
    Teacher,
    Admin,
}

/// Whoever is asking for a transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub role: Role,
}

impl Actor {
    pub fn student(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Student,
        }
    }

    pub fn teacher(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Teacher,
        }
    }

    pub fn admin(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Admin,
        }
    }
}

/// One entry in a booking's reschedule history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalChange {
    pub from: TimeInterval,
    pub to: TimeInterval,
    pub reason: String,
    pub changed_by: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub student_id: String,
    pub teacher_id: String,
    pub interval: TimeInterval,
    pub duration_minutes: i64,
    pub status: BookingStatus,
    #[serde(default = "utc")]
    pub student_timezone: Tz,
    #[serde(default = "utc")]
    pub teacher_timezone: Tz,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<IntervalChange>,
}

fn utc() -> Tz {
    Tz::UTC
}

impl Booking {
    /// `duration_minutes` must equal the interval length, which must be whole minutes.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.interval.is_whole_minutes()
            || self.duration_minutes != self.interval.duration_minutes()
        {
            return Err(ValidationError::InvalidDuration(self.duration_minutes));
        }
        Ok(())
    }

    pub fn is_party(&self, actor: &Actor) -> bool {
        actor.role == Role::Admin || actor.id == self.student_id || actor.id == self.teacher_id
    }

    pub fn authorize(&self, actor: &Actor) -> Result<(), EngineError> {
        if self.is_party(actor) {
            Ok(())
        } else {
            Err(EngineError::Forbidden {
                actor_id: actor.id.clone(),
                resource: format!("booking {}", self.id),
            })
        }
    }

    pub(crate) fn invalid(&self, action: &'static str) -> EngineError {
        EngineError::InvalidTransition {
            booking_id: self.id.clone(),
            from: self.status,
            action,
        }
    }
}

/// A student's request for a new lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub student_id: String,
    pub teacher_id: String,
    pub start: DateTime<Utc>,
    pub duration_minutes: i64,
    /// IANA zone name; defaults to UTC when absent.
    #[serde(default)]
    pub student_timezone: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}
