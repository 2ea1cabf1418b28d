//! The booking state machine, run against a [`BookingStore`].
//!
//! Every transition executes inside one store transaction scoped to the booking's
//! teacher, so the conflict check and the write it guards are atomic. Transitions
//! return a [`Transition`] carrying the updated records and the [`Intent`]s the caller
//! should execute; no side effect is performed here.
//!
//! Repeated deliveries are harmless: confirming an already-confirmed booking,
//! expiring or cancelling an already-cancelled one, and similar repeats return an
//! unchanged `Transition` instead of an error.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::availability::{AvailabilityIndex, WeeklyAvailabilityRule};
use crate::booking::{
    Actor, Booking, BookingRequest, BookingStatus, IntervalChange, Payment, PaymentMode,
    PaymentStatus, Role,
};
use crate::config::EngineConfig;
use crate::conflict::{Approval, ConflictResolver};
use crate::error::{EngineError, Rejection, Result, ValidationError};
use crate::intent::{CalendarAction, EmailKind, Intent, MeetingRequest};
use crate::interval::TimeInterval;
use crate::notification::{schedule_for, upcoming_reminders, ReminderNotification};
use crate::pricing::{refund_for_cancellation, Money};
use crate::slots::{bookable_slots, BookableSlot};
use crate::store::{not_found, BookingStore, TeacherLedger};
use crate::teacher::TeacherProfile;
use crate::timezone::parse_timezone;

const EXPIRED_REASON: &str = "Payment session expired";

/// The outcome of a lifecycle call.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub booking: Booking,
    pub payment: Option<Payment>,
    pub intents: Vec<Intent>,
    /// False when the call was an idempotent repeat and nothing was written.
    pub changed: bool,
}

impl Transition {
    fn unchanged(ledger: &TeacherLedger, booking: Booking) -> Self {
        let payment = ledger.payments.get(&booking.id).cloned();
        Self {
            booking,
            payment,
            intents: Vec::new(),
            changed: false,
        }
    }
}

pub struct BookingEngine<S> {
    config: EngineConfig,
    store: S,
    availability: RwLock<AvailabilityIndex>,
    teachers: RwLock<HashMap<String, TeacherProfile>>,
}

impl<S: BookingStore> BookingEngine<S> {
    pub fn new(config: EngineConfig, store: S) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            store,
            availability: RwLock::new(AvailabilityIndex::new()),
            teachers: RwLock::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // ── Teachers and availability ──────────────────────────────────────────

    /// Register or update the profile the engine reads for a teacher.
    pub fn register_teacher(&self, profile: TeacherProfile) -> Result<()> {
        profile.validate(&self.config)?;
        self.availability_mut()?
            .set_timezone(&profile.teacher_id, profile.timezone);
        info!(
            teacher_id = %profile.teacher_id,
            timezone = %profile.timezone,
            buffer_minutes = profile.buffer_minutes,
            active = profile.active,
            "teacher registered"
        );
        self.teachers
            .write()
            .map_err(|_| poisoned("teacher directory"))?
            .insert(profile.teacher_id.clone(), profile);
        Ok(())
    }

    pub fn teacher(&self, teacher_id: &str) -> Result<TeacherProfile> {
        self.teachers
            .read()
            .map_err(|_| poisoned("teacher directory"))?
            .get(teacher_id)
            .cloned()
            .ok_or_else(|| not_found("teacher", teacher_id))
    }

    /// Add or replace an availability rule. Only the owning teacher or an admin may.
    pub fn add_rule(&self, actor: &Actor, rule: WeeklyAvailabilityRule) -> Result<()> {
        authorize_owner(actor, &rule.teacher_id)?;
        self.teacher(&rule.teacher_id)?;
        info!(
            teacher_id = %rule.teacher_id,
            rule_id = %rule.id,
            day_of_week = rule.day_of_week,
            start = %rule.start_time,
            end = %rule.end_time,
            recurring = rule.recurring,
            "availability rule saved"
        );
        self.availability_mut()?.insert_rule(rule)?;
        Ok(())
    }

    pub fn remove_rule(
        &self,
        actor: &Actor,
        teacher_id: &str,
        rule_id: &str,
    ) -> Result<WeeklyAvailabilityRule> {
        authorize_owner(actor, teacher_id)?;
        let removed = self
            .availability_mut()?
            .remove_rule(teacher_id, rule_id)
            .ok_or_else(|| not_found("availability rule", rule_id))?;
        info!(teacher_id, rule_id, "availability rule removed");
        Ok(removed)
    }

    pub fn rules_for(
        &self,
        teacher_id: &str,
        day_of_week: u8,
    ) -> Result<Vec<WeeklyAvailabilityRule>> {
        if day_of_week > 6 {
            return Err(ValidationError::InvalidDayOfWeek(day_of_week).into());
        }
        Ok(self
            .availability()?
            .rules_for(teacher_id, day_of_week)
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn is_available(&self, teacher_id: &str, instant: DateTime<Utc>) -> Result<bool> {
        Ok(self.availability()?.is_available(teacher_id, instant))
    }

    // ── Checks ─────────────────────────────────────────────────────────────

    /// Run the conflict resolver without writing anything.
    pub fn can_book(
        &self,
        teacher_id: &str,
        candidate: &TimeInterval,
        exclude_booking_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Approval> {
        let teacher = self.teacher(teacher_id)?;
        self.store.transaction(teacher_id, |ledger| {
            self.resolve(&teacher, candidate, ledger, exclude_booking_id, now)
        })
    }

    /// Bookable starts for a `duration_minutes` lesson on a teacher-local `date`.
    pub fn bookable_slots(
        &self,
        teacher_id: &str,
        date: NaiveDate,
        duration_minutes: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<BookableSlot>> {
        let teacher = self.teacher(teacher_id)?;
        self.store.transaction(teacher_id, |ledger| {
            let existing: Vec<Booking> = ledger.bookings.values().cloned().collect();
            let availability = self.availability()?;
            let resolver = ConflictResolver::new(&self.config, &availability);
            Ok(bookable_slots(
                &resolver,
                &availability,
                &teacher,
                date,
                duration_minutes,
                self.config.slot_step_minutes,
                &existing,
                now,
            ))
        })
    }

    fn resolve(
        &self,
        teacher: &TeacherProfile,
        candidate: &TimeInterval,
        ledger: &TeacherLedger,
        exclude_booking_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Approval> {
        let availability = self.availability()?;
        ConflictResolver::new(&self.config, &availability)
            .can_book(
                candidate,
                teacher,
                ledger.bookings.values(),
                exclude_booking_id,
                now,
            )
            .map_err(|rejection| {
                debug!(
                    teacher_id = %teacher.teacher_id,
                    start = %candidate.start(),
                    end = %candidate.end(),
                    reason = rejection.code(),
                    "candidate rejected"
                );
                EngineError::Rejected(rejection)
            })
    }

    // ── Lifecycle ──────────────────────────────────────────────────────────

    /// Create a booking for an approved candidate.
    ///
    /// In mock payment mode the booking is confirmed immediately; in gateway mode it
    /// waits in `PENDING_PAYMENT` and a `StartCheckout` intent is emitted.
    pub fn create(&self, request: BookingRequest, now: DateTime<Utc>) -> Result<Transition> {
        if let Some(notes) = &request.notes {
            if notes.chars().count() > self.config.max_notes_chars {
                return Err(ValidationError::NotesTooLong {
                    max: self.config.max_notes_chars,
                }
                .into());
            }
        }
        let student_timezone = match request.student_timezone.as_deref() {
            Some(name) => parse_timezone(name)?,
            None => chrono_tz::Tz::UTC,
        };
        let candidate = TimeInterval::starting_at(request.start, request.duration_minutes)?;
        let teacher = self.teacher(&request.teacher_id)?;

        // Per-student cap spans teachers, so it is read outside the teacher transaction.
        let active = self.store.active_bookings_for_student(&request.student_id)?;
        let limit = self.config.max_active_bookings_per_student;
        if active >= limit as usize {
            debug!(student_id = %request.student_id, active, "student booking cap reached");
            return Err(Rejection::StudentLimitReached { limit }.into());
        }

        self.store.transaction(&teacher.teacher_id, |ledger| {
            let approval = self.resolve(&teacher, &candidate, ledger, None, now)?;

            let booking_id = Uuid::new_v4().to_string();
            let mut booking = Booking {
                id: booking_id.clone(),
                student_id: request.student_id.clone(),
                teacher_id: teacher.teacher_id.clone(),
                interval: approval.interval,
                duration_minutes: approval.duration_minutes,
                status: BookingStatus::PendingPayment,
                student_timezone,
                teacher_timezone: teacher.timezone,
                meeting_link: None,
                cancel_reason: None,
                notes: request.notes.clone(),
                history: Vec::new(),
            };
            let mut payment = Payment {
                id: Uuid::new_v4().to_string(),
                booking_id: booking_id.clone(),
                amount: approval.amount,
                status: PaymentStatus::Pending,
                external_reference: None,
            };

            let intents = match self.config.payment_mode {
                PaymentMode::Mock => {
                    payment.status = PaymentStatus::Completed;
                    payment.external_reference = Some(format!("mock_{}", booking_id));
                    booking.status = BookingStatus::Confirmed;
                    self.on_confirmed(ledger, &booking, now)
                }
                PaymentMode::Gateway => vec![Intent::StartCheckout {
                    booking_id: booking_id.clone(),
                    payment_id: payment.id.clone(),
                    amount: payment.amount,
                }],
            };

            ledger.bookings.insert(booking_id.clone(), booking.clone());
            ledger.payments.insert(booking_id.clone(), payment.clone());
            info!(
                booking_id = %booking_id,
                teacher_id = %booking.teacher_id,
                student_id = %booking.student_id,
                start = %booking.interval.start(),
                duration_minutes = booking.duration_minutes,
                amount = payment.amount.minor(),
                status = ?booking.status,
                "booking created"
            );
            Ok(Transition {
                booking,
                payment: Some(payment),
                intents,
                changed: true,
            })
        })
    }

    /// Record a captured payment. Safe to call repeatedly and out of order: anything
    /// other than a `PENDING_PAYMENT` booking is left untouched.
    pub fn confirm_payment(
        &self,
        booking_id: &str,
        amount: Money,
        external_reference: &str,
        now: DateTime<Utc>,
    ) -> Result<Transition> {
        let teacher_id = self.locate(booking_id)?;
        self.store.transaction(&teacher_id, |ledger| {
            let booking = ledger.booking(booking_id)?.clone();
            match booking.status {
                BookingStatus::PendingPayment => {}
                BookingStatus::Cancelled | BookingStatus::Refunded => {
                    warn!(
                        booking_id,
                        external_reference, "payment confirmed for a cancelled booking; ignored"
                    );
                    return Ok(Transition::unchanged(ledger, booking));
                }
                status => {
                    debug!(booking_id, ?status, "duplicate payment confirmation ignored");
                    return Ok(Transition::unchanged(ledger, booking));
                }
            }

            let payment = ledger.payment_mut(booking_id)?;
            if payment.amount != amount {
                return Err(ValidationError::PaymentAmountMismatch {
                    expected: payment.amount.minor(),
                    actual: amount.minor(),
                }
                .into());
            }
            payment.status = PaymentStatus::Completed;
            payment.external_reference = Some(external_reference.to_string());
            let payment = payment.clone();

            let booking = {
                let stored = ledger.booking_mut(booking_id)?;
                stored.status = BookingStatus::Confirmed;
                stored.clone()
            };
            let intents = self.on_confirmed(ledger, &booking, now);
            info!(booking_id, external_reference, "payment confirmed");
            Ok(Transition {
                booking,
                payment: Some(payment),
                intents,
                changed: true,
            })
        })
    }

    /// The gateway gave up on a checkout session. Only meaningful while payment is
    /// pending; a booking that is already cancelled is left as is.
    pub fn expire_payment(&self, booking_id: &str) -> Result<Transition> {
        let teacher_id = self.locate(booking_id)?;
        self.store.transaction(&teacher_id, |ledger| {
            let booking = ledger.booking(booking_id)?.clone();
            match booking.status {
                BookingStatus::PendingPayment => {}
                BookingStatus::Cancelled | BookingStatus::Refunded => {
                    debug!(booking_id, "expiry for cancelled booking ignored");
                    return Ok(Transition::unchanged(ledger, booking));
                }
                _ => return Err(booking.invalid("expire payment for")),
            }

            let payment = ledger.payment_mut(booking_id)?;
            payment.status = PaymentStatus::Failed;
            let payment = payment.clone();
            let booking = {
                let stored = ledger.booking_mut(booking_id)?;
                stored.status = BookingStatus::Cancelled;
                stored.cancel_reason = Some(EXPIRED_REASON.to_string());
                stored.clone()
            };
            info!(booking_id, "payment session expired; booking cancelled");
            Ok(Transition {
                booking,
                payment: Some(payment),
                intents: Vec::new(),
                changed: true,
            })
        })
    }

    /// Cancel on behalf of the student, the teacher or an admin.
    ///
    /// Pending reminders are discarded. A captured payment yields an `IssueRefund`
    /// intent sized by the cancellation policy.
    pub fn cancel(
        &self,
        booking_id: &str,
        actor: &Actor,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<Transition> {
        let teacher_id = self.locate(booking_id)?;
        self.store.transaction(&teacher_id, |ledger| {
            let booking = ledger.booking(booking_id)?.clone();
            booking.authorize(actor)?;
            match booking.status {
                BookingStatus::PendingPayment
                | BookingStatus::Confirmed
                | BookingStatus::Rescheduled => {}
                BookingStatus::Cancelled | BookingStatus::Refunded => {
                    debug!(booking_id, "booking already cancelled");
                    return Ok(Transition::unchanged(ledger, booking));
                }
                BookingStatus::Completed => return Err(booking.invalid("cancel")),
            }
            self.check_reason(reason)?;

            let was_scheduled = booking.status.is_scheduled();
            let discarded = ledger.reminders.discard_for(booking_id);
            let mut intents = vec![Intent::DiscardNotifications {
                booking_id: booking_id.to_string(),
            }];

            let payment = ledger.payment_mut(booking_id)?;
            match payment.status {
                PaymentStatus::Completed => {
                    let refund = refund_for_cancellation(
                        payment.amount,
                        booking.interval.start() - now,
                        actor.role,
                        &self.config.refunds,
                    );
                    if refund > Money::ZERO {
                        intents.push(Intent::IssueRefund {
                            booking_id: booking_id.to_string(),
                            payment_id: payment.id.clone(),
                            amount: refund,
                        });
                    }
                }
                PaymentStatus::Pending => payment.status = PaymentStatus::Failed,
                PaymentStatus::Failed | PaymentStatus::Refunded => {}
            }
            let payment = payment.clone();

            let booking = {
                let stored = ledger.booking_mut(booking_id)?;
                stored.status = BookingStatus::Cancelled;
                stored.cancel_reason = Some(reason.to_string());
                stored.clone()
            };
            if was_scheduled {
                intents.extend(emails_to_both(&booking, EmailKind::BookingCancelled));
                intents.push(Intent::SyncCalendar {
                    booking_id: booking_id.to_string(),
                    action: CalendarAction::Remove,
                });
            }
            info!(
                booking_id,
                actor_id = %actor.id,
                discarded_reminders = discarded,
                "booking cancelled"
            );
            Ok(Transition {
                booking,
                payment: Some(payment),
                intents,
                changed: true,
            })
        })
    }

    /// Move a confirmed booking to `new_interval`.
    ///
    /// The full conflict check runs again with the booking itself excluded, so a move
    /// that overlaps only its own current slot succeeds. The price is not recomputed.
    pub fn reschedule(
        &self,
        booking_id: &str,
        actor: &Actor,
        new_interval: TimeInterval,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<Transition> {
        let teacher_id = self.locate(booking_id)?;
        let teacher = self.teacher(&teacher_id)?;
        self.store.transaction(&teacher_id, |ledger| {
            let booking = ledger.booking(booking_id)?.clone();
            booking.authorize(actor)?;
            if booking.status != BookingStatus::Confirmed {
                return Err(booking.invalid("reschedule"));
            }
            self.check_reason(reason)?;
            if !new_interval.is_whole_minutes() {
                let minutes = new_interval.duration_minutes();
                return Err(ValidationError::InvalidDuration(minutes).into());
            }
            if new_interval.start() <= now {
                return Err(Rejection::StartInPast.into());
            }
            let approval = self.resolve(&teacher, &new_interval, ledger, Some(booking_id), now)?;

            let booking = {
                let stored = ledger.booking_mut(booking_id)?;
                stored.history.push(IntervalChange {
                    from: stored.interval,
                    to: approval.interval,
                    reason: reason.to_string(),
                    changed_by: actor.id.clone(),
                    at: now,
                });
                stored.interval = approval.interval;
                stored.duration_minutes = approval.duration_minutes;
                stored.status = BookingStatus::Rescheduled;
                stored.clone()
            };

            ledger.reminders.discard_for(booking_id);
            let reminders = upcoming_reminders(&booking, now, &self.config.reminders);
            ledger.reminders.enqueue(reminders.clone());

            let payment = ledger.payments.get(booking_id).cloned();
            if let Some(paid) = &payment {
                if paid.amount != approval.amount {
                    debug!(
                        booking_id,
                        paid = paid.amount.minor(),
                        repriced = approval.amount.minor(),
                        "reschedule changes list price; amount kept"
                    );
                }
            }

            let mut intents = vec![
                Intent::DiscardNotifications {
                    booking_id: booking_id.to_string(),
                },
                Intent::ScheduleNotifications {
                    notifications: reminders,
                },
                Intent::RequestMeetingLink(meeting_request(&booking)),
            ];
            intents.extend(emails_to_both(&booking, EmailKind::BookingRescheduled));
            intents.push(Intent::SyncCalendar {
                booking_id: booking_id.to_string(),
                action: CalendarAction::Update,
            });
            info!(
                booking_id,
                actor_id = %actor.id,
                start = %booking.interval.start(),
                duration_minutes = booking.duration_minutes,
                "booking rescheduled"
            );
            Ok(Transition {
                booking,
                payment,
                intents,
                changed: true,
            })
        })
    }

    /// Mark a confirmed or rescheduled lesson as held, once it has ended.
    pub fn complete(&self, booking_id: &str, now: DateTime<Utc>) -> Result<Transition> {
        let teacher_id = self.locate(booking_id)?;
        self.store.transaction(&teacher_id, |ledger| {
            let booking = ledger.booking(booking_id)?.clone();
            if booking.status == BookingStatus::Completed {
                return Ok(Transition::unchanged(ledger, booking));
            }
            if !booking.status.is_scheduled() || booking.interval.end() > now {
                return Err(booking.invalid("complete"));
            }
            complete_in(ledger, booking_id)
        })
    }

    /// Complete every lesson that has ended by `now`, across all teachers.
    pub fn complete_elapsed(&self, now: DateTime<Utc>) -> Result<Vec<Transition>> {
        let mut completed = Vec::new();
        for teacher_id in self.store.teacher_ids()? {
            let batch = self.store.transaction(&teacher_id, |ledger| {
                let due: Vec<String> = ledger
                    .bookings
                    .values()
                    .filter(|b| b.status.is_scheduled() && b.interval.end() <= now)
                    .map(|b| b.id.clone())
                    .collect();
                due.iter().map(|id| complete_in(ledger, id)).collect::<Result<Vec<_>>>()
            })?;
            completed.extend(batch);
        }
        Ok(completed)
    }

    /// The gateway settled the refund for a cancelled booking.
    pub fn mark_refunded(&self, booking_id: &str, refund_reference: &str) -> Result<Transition> {
        let teacher_id = self.locate(booking_id)?;
        self.store.transaction(&teacher_id, |ledger| {
            let booking = ledger.booking(booking_id)?.clone();
            match booking.status {
                BookingStatus::Refunded => return Ok(Transition::unchanged(ledger, booking)),
                BookingStatus::Cancelled => {}
                _ => return Err(booking.invalid("refund")),
            }
            let payment = ledger.payment_mut(booking_id)?;
            if payment.status != PaymentStatus::Completed {
                return Err(booking.invalid("refund"));
            }
            payment.status = PaymentStatus::Refunded;
            let payment = payment.clone();
            let booking = {
                let stored = ledger.booking_mut(booking_id)?;
                stored.status = BookingStatus::Refunded;
                stored.clone()
            };
            info!(booking_id, refund_reference, "refund settled");
            Ok(Transition {
                booking,
                payment: Some(payment),
                intents: Vec::new(),
                changed: true,
            })
        })
    }

    /// Store a provisioned meeting link. Bookings that reached a terminal state in the
    /// meantime are left alone.
    pub fn attach_meeting_link(&self, booking_id: &str, link: &str) -> Result<Booking> {
        let teacher_id = self.locate(booking_id)?;
        self.store.transaction(&teacher_id, |ledger| {
            let stored = ledger.booking_mut(booking_id)?;
            if !stored.status.is_terminal() {
                stored.meeting_link = Some(link.to_string());
            }
            Ok(stored.clone())
        })
    }

    // ── Reads ──────────────────────────────────────────────────────────────

    pub fn booking(&self, booking_id: &str) -> Result<Booking> {
        let teacher_id = self.locate(booking_id)?;
        self.store
            .transaction(&teacher_id, |ledger| Ok(ledger.booking(booking_id)?.clone()))
    }

    pub fn payment(&self, booking_id: &str) -> Result<Payment> {
        let teacher_id = self.locate(booking_id)?;
        self.store.transaction(&teacher_id, |ledger| {
            ledger
                .payments
                .get(booking_id)
                .cloned()
                .ok_or_else(|| not_found("payment", booking_id))
        })
    }

    pub fn pending_reminders(&self, booking_id: &str) -> Result<Vec<ReminderNotification>> {
        let teacher_id = self.locate(booking_id)?;
        self.store
            .transaction(&teacher_id, |ledger| Ok(ledger.reminders.pending_for(booking_id)))
    }

    /// Remove and return every reminder due by `now`, for an external dispatcher.
    pub fn take_due_reminders(&self, now: DateTime<Utc>) -> Result<Vec<ReminderNotification>> {
        let mut due = Vec::new();
        for teacher_id in self.store.teacher_ids()? {
            due.extend(
                self.store
                    .transaction(&teacher_id, |ledger| Ok(ledger.reminders.take_due(now)))?,
            );
        }
        due.sort_by_key(|n| n.fires_at);
        Ok(due)
    }

    // ── Helpers ────────────────────────────────────────────────────────────

    fn on_confirmed(
        &self,
        ledger: &mut TeacherLedger,
        booking: &Booking,
        now: DateTime<Utc>,
    ) -> Vec<Intent> {
        let notifications = schedule_for(booking, now, &self.config.reminders);
        ledger.reminders.enqueue(notifications.clone());

        let mut intents = vec![
            Intent::RequestMeetingLink(meeting_request(booking)),
            Intent::ScheduleNotifications { notifications },
        ];
        intents.extend(emails_to_both(booking, EmailKind::BookingConfirmed));
        intents.push(Intent::SyncCalendar {
            booking_id: booking.id.clone(),
            action: CalendarAction::Add,
        });
        intents
    }

    fn check_reason(&self, reason: &str) -> Result<()> {
        if reason.trim().chars().count() < self.config.min_reason_chars {
            return Err(ValidationError::ReasonTooShort {
                min: self.config.min_reason_chars,
            }
            .into());
        }
        Ok(())
    }

    fn locate(&self, booking_id: &str) -> Result<String> {
        self.store
            .locate(booking_id)?
            .ok_or_else(|| not_found("booking", booking_id))
    }

    fn availability(&self) -> Result<RwLockReadGuard<'_, AvailabilityIndex>> {
        self.availability
            .read()
            .map_err(|_| poisoned("availability index"))
    }

    fn availability_mut(&self) -> Result<RwLockWriteGuard<'_, AvailabilityIndex>> {
        self.availability
            .write()
            .map_err(|_| poisoned("availability index"))
    }
}

fn complete_in(ledger: &mut TeacherLedger, booking_id: &str) -> Result<Transition> {
    let booking = {
        let stored = ledger.booking_mut(booking_id)?;
        stored.status = BookingStatus::Completed;
        stored.clone()
    };
    ledger.reminders.discard_for(booking_id);
    info!(booking_id, "lesson completed");
    Ok(Transition {
        payment: ledger.payments.get(booking_id).cloned(),
        booking,
        intents: Vec::new(),
        changed: true,
    })
}

fn authorize_owner(actor: &Actor, teacher_id: &str) -> Result<()> {
    let allowed = match actor.role {
        Role::Admin => true,
        Role::Teacher => actor.id == teacher_id,
        Role::Student => false,
    };
    if allowed {
        Ok(())
    } else {
        Err(EngineError::Forbidden {
            actor_id: actor.id.clone(),
            resource: format!("availability of teacher {}", teacher_id),
        })
    }
}

fn meeting_request(booking: &Booking) -> MeetingRequest {
    MeetingRequest {
        booking_id: booking.id.clone(),
        interval: booking.interval,
        teacher_id: booking.teacher_id.clone(),
        student_id: booking.student_id.clone(),
    }
}

fn emails_to_both(booking: &Booking, kind: EmailKind) -> [Intent; 2] {
    [&booking.student_id, &booking.teacher_id].map(|recipient| Intent::SendEmail {
        kind,
        recipient_id: recipient.clone(),
        booking_id: booking.id.clone(),
    })
}

fn poisoned(what: &str) -> EngineError {
    EngineError::Store(format!("{} lock poisoned", what))
}
