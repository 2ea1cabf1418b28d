//! Side-effect intents emitted by booking transitions, and the collaborator traits
//! that can carry them out.
//!
//! Transitions never perform I/O. They return [`Intent`]s; the caller executes them,
//! either by hand or through [`dispatch_intents`](crate::dispatch::dispatch_intents).
//! A failing side effect is reported but never rolls back the transition that
//! produced it.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::interval::TimeInterval;
use crate::notification::ReminderNotification;
use crate::pricing::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmailKind {
    BookingConfirmed,
    BookingCancelled,
    BookingRescheduled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarAction {
    Add,
    Update,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Intent {
    /// Open a payment-gateway checkout for a pending booking.
    StartCheckout {
        booking_id: String,
        payment_id: String,
        amount: Money,
    },
    RequestMeetingLink(MeetingRequest),
    /// Already persisted in the teacher's reminder queue; informational.
    ScheduleNotifications {
        notifications: Vec<ReminderNotification>,
    },
    DiscardNotifications {
        booking_id: String,
    },
    SendEmail {
        kind: EmailKind,
        recipient_id: String,
        booking_id: String,
    },
    SyncCalendar {
        booking_id: String,
        action: CalendarAction,
    },
    IssueRefund {
        booking_id: String,
        payment_id: String,
        amount: Money,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingRequest {
    pub booking_id: String,
    pub interval: TimeInterval,
    pub teacher_id: String,
    pub student_id: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Provider request failed: {0}")]
    Failed(String),
}

/// Issues a join URL for a lesson. Provider selection and fallback order are the
/// implementor's business.
pub trait MeetingLinkProvider {
    fn request_link(&self, request: &MeetingRequest) -> Result<String, ProviderError>;
}

pub trait CalendarSync {
    fn sync(&self, booking_id: &str, action: CalendarAction) -> Result<(), ProviderError>;
}

pub trait Mailer {
    fn send(&self, kind: EmailKind, recipient_id: &str, booking_id: &str)
        -> Result<(), ProviderError>;
}

/// Deterministic room links on a fixed domain, for when no video provider is set up.
#[derive(Debug, Clone)]
pub struct SimpleMeetingLinkProvider {
    domain: String,
}

impl SimpleMeetingLinkProvider {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
        }
    }

    pub fn link_for(&self, booking_id: &str) -> String {
        let room: String = STANDARD
            .encode(booking_id)
            .chars()
            .take(10)
            .filter(|c| !matches!(c, '+' | '/' | '='))
            .collect();
        format!("https://{}/room/{}", self.domain, room)
    }
}

impl MeetingLinkProvider for SimpleMeetingLinkProvider {
    fn request_link(&self, request: &MeetingRequest) -> Result<String, ProviderError> {
        Ok(self.link_for(&request.booking_id))
    }
}
