//! Reminder scheduling for confirmed bookings.
//!
//! On confirmation a booking gets an immediate `CONFIRMED` notification plus one entry
//! per configured reminder whose fire time is still in the future. Past-due reminders
//! are dropped, never back-filled. An external dispatcher drains due entries from a
//! [`ReminderQueue`] and delivers them.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::booking::Booking;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReminderKind {
    #[serde(rename = "CONFIRMED")]
    Confirmed,
    #[serde(rename = "REMINDER_24H")]
    Reminder24h,
    #[serde(rename = "REMINDER_1H")]
    Reminder1h,
}

impl ReminderKind {
    /// How long before the lesson start this kind fires. Zero for `Confirmed`.
    pub fn lead(&self) -> Duration {
        match self {
            ReminderKind::Confirmed => Duration::zero(),
            ReminderKind::Reminder24h => Duration::hours(24),
            ReminderKind::Reminder1h => Duration::hours(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderNotification {
    pub booking_id: String,
    pub kind: ReminderKind,
    pub fires_at: DateTime<Utc>,
}

/// Notifications for a booking that has just been confirmed at `now`.
pub fn schedule_for(
    booking: &Booking,
    now: DateTime<Utc>,
    reminders: &[ReminderKind],
) -> Vec<ReminderNotification> {
    let mut scheduled = vec![ReminderNotification {
        booking_id: booking.id.clone(),
        kind: ReminderKind::Confirmed,
        fires_at: now,
    }];
    scheduled.extend(upcoming_reminders(booking, now, reminders));
    scheduled
}

/// The configured reminders for `booking` that still lie in the future, without the
/// confirmation notice. Used again after a reschedule.
pub fn upcoming_reminders(
    booking: &Booking,
    now: DateTime<Utc>,
    reminders: &[ReminderKind],
) -> Vec<ReminderNotification> {
    reminders
        .iter()
        .filter(|kind| **kind != ReminderKind::Confirmed)
        .filter_map(|&kind| {
            let fires_at = booking.interval.start() - kind.lead();
            (fires_at > now).then(|| ReminderNotification {
                booking_id: booking.id.clone(),
                kind,
                fires_at,
            })
        })
        .collect()
}

/// Not-yet-fired notifications, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderQueue {
    pending: Vec<ReminderNotification>,
}

impl ReminderQueue {
    pub fn enqueue(&mut self, notifications: impl IntoIterator<Item = ReminderNotification>) {
        self.pending.extend(notifications);
    }

    /// Drop every pending notification for `booking_id`, returning how many went.
    pub fn discard_for(&mut self, booking_id: &str) -> usize {
        let before = self.pending.len();
        self.pending.retain(|n| n.booking_id != booking_id);
        before - self.pending.len()
    }

    /// Remove and return every notification due at or before `now`, earliest first.
    pub fn take_due(&mut self, now: DateTime<Utc>) -> Vec<ReminderNotification> {
        let (mut due, rest): (Vec<_>, Vec<_>) =
            self.pending.drain(..).partition(|n| n.fires_at <= now);
        self.pending = rest;
        due.sort_by_key(|n| n.fires_at);
        due
    }

    pub fn pending_for(&self, booking_id: &str) -> Vec<ReminderNotification> {
        self.pending
            .iter()
            .filter(|n| n.booking_id == booking_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
