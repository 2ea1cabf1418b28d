//! # lesson-engine
//!
//! Availability, conflict resolution and booking lifecycle for a lesson marketplace
//! whose students and teachers live in different timezones.
//!
//! Instants are stored and compared in UTC. A teacher's availability is written in
//! the teacher's own zone and only converted when a rule is matched.
//!
//! ## Modules
//!
//! - [`interval`] — half-open time intervals, buffers, `HH:MM` wall times, slot enumeration
//! - [`timezone`] — instant/wall-clock conversion and DST gap handling
//! - [`availability`] — weekly rules with one-off date overrides
//! - [`conflict`] — decides whether a candidate lesson is bookable
//! - [`slots`] — bookable starts for one teacher-local date
//! - [`booking`] — booking and payment records, lifecycle states
//! - [`engine`] — the booking state machine over a [`BookingStore`]
//! - [`notification`] — confirmation and reminder scheduling
//! - [`intent`] — side effects emitted by transitions; [`dispatch`] executes them
//! - [`pricing`] — lesson amounts, commission, cancellation refunds
//! - [`api`] — typed request/response records over a schedule snapshot
//! - [`config`] — [`EngineConfig`] and its product defaults
//! - [`error`] — error types

pub mod api;
pub mod availability;
pub mod booking;
pub mod config;
pub mod conflict;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod intent;
pub mod interval;
pub mod notification;
pub mod pricing;
pub mod slots;
pub mod store;
pub mod teacher;
pub mod timezone;

pub use availability::{AvailabilityIndex, ContainmentPolicy, WeeklyAvailabilityRule};
pub use booking::{
    Actor, Booking, BookingRequest, BookingStatus, Payment, PaymentMode, PaymentStatus, Role,
};
pub use config::{DurationRule, EngineConfig};
pub use conflict::{Approval, Conflict, ConflictResolver};
pub use dispatch::{dispatch_intents, Collaborators, DispatchReport};
pub use engine::{BookingEngine, Transition};
pub use error::{EngineError, Rejection, Result, ValidationError};
pub use intent::{Intent, SimpleMeetingLinkProvider};
pub use interval::{overlaps, with_buffer, TimeInterval, WallTime};
pub use notification::{schedule_for, ReminderKind, ReminderNotification};
pub use pricing::{Money, Quote};
pub use store::{BookingStore, InMemoryStore};
pub use teacher::TeacherProfile;
