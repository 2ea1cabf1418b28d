//! Persistence seam for bookings, payments and pending reminders.
//!
//! Everything the engine writes lives in a per-teacher [`TeacherLedger`]. Every
//! read-check-write sequence (conflict check followed by insert, reschedule, payment
//! confirmation) runs inside [`BookingStore::transaction`], which must serialise
//! callers for the same teacher and commit only when the closure succeeds. Without
//! that, two requests could both pass the conflict check and double-book a slot.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, RwLock};

use serde::{Deserialize, Serialize};

use crate::booking::{Booking, Payment};
use crate::error::{EngineError, Result};
use crate::notification::ReminderQueue;

/// One teacher's bookings, their payments and their pending reminders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherLedger {
    pub bookings: BTreeMap<String, Booking>,
    /// Keyed by booking id; a booking owns at most one payment.
    pub payments: BTreeMap<String, Payment>,
    pub reminders: ReminderQueue,
}

impl TeacherLedger {
    pub fn booking(&self, booking_id: &str) -> Result<&Booking> {
        self.bookings.get(booking_id).ok_or_else(|| not_found("booking", booking_id))
    }

    pub fn booking_mut(&mut self, booking_id: &str) -> Result<&mut Booking> {
        self.bookings
            .get_mut(booking_id)
            .ok_or_else(|| not_found("booking", booking_id))
    }

    pub fn payment_mut(&mut self, booking_id: &str) -> Result<&mut Payment> {
        self.payments
            .get_mut(booking_id)
            .ok_or_else(|| not_found("payment", booking_id))
    }
}

pub(crate) fn not_found(kind: &'static str, id: &str) -> EngineError {
    EngineError::NotFound {
        kind,
        id: id.to_string(),
    }
}

pub trait BookingStore: Send + Sync {
    /// Run `f` against the teacher's ledger as one atomic, per-teacher-serialised unit.
    ///
    /// Changes made by `f` are committed only when it returns `Ok`. Implementations
    /// must not be re-entered from inside `f`.
    fn transaction<T, F>(&self, teacher_id: &str, f: F) -> Result<T>
    where
        F: FnOnce(&mut TeacherLedger) -> Result<T>;

    /// The teacher owning `booking_id`, if the booking exists.
    fn locate(&self, booking_id: &str) -> Result<Option<String>>;

    /// Bookings of this student that currently hold a slot, across all teachers.
    fn active_bookings_for_student(&self, student_id: &str) -> Result<usize>;

    fn teacher_ids(&self) -> Result<Vec<String>>;
}

/// A [`BookingStore`] kept in process memory, one mutex per teacher.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    ledgers: Mutex<HashMap<String, Arc<Mutex<TeacherLedger>>>>,
    owners: RwLock<HashMap<String, String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn ledger(&self, teacher_id: &str) -> Result<Arc<Mutex<TeacherLedger>>> {
        let mut ledgers = self.ledgers.lock().map_err(|_| poisoned("ledger map"))?;
        Ok(ledgers
            .entry(teacher_id.to_string())
            .or_default()
            .clone())
    }

    fn all_ledgers(&self) -> Result<Vec<Arc<Mutex<TeacherLedger>>>> {
        let ledgers = self.ledgers.lock().map_err(|_| poisoned("ledger map"))?;
        Ok(ledgers.values().cloned().collect())
    }
}

impl BookingStore for InMemoryStore {
    fn transaction<T, F>(&self, teacher_id: &str, f: F) -> Result<T>
    where
        F: FnOnce(&mut TeacherLedger) -> Result<T>,
    {
        let ledger = self.ledger(teacher_id)?;
        let mut committed = ledger.lock().map_err(|_| poisoned("teacher ledger"))?;

        let mut working = committed.clone();
        let value = f(&mut working)?;

        let mut owners = self.owners.write().map_err(|_| poisoned("owner index"))?;
        for booking_id in working.bookings.keys() {
            if !committed.bookings.contains_key(booking_id) {
                owners.insert(booking_id.clone(), teacher_id.to_string());
            }
        }
        *committed = working;
        Ok(value)
    }

    fn locate(&self, booking_id: &str) -> Result<Option<String>> {
        let owners = self.owners.read().map_err(|_| poisoned("owner index"))?;
        Ok(owners.get(booking_id).cloned())
    }

    fn active_bookings_for_student(&self, student_id: &str) -> Result<usize> {
        let mut count = 0;
        for ledger in self.all_ledgers()? {
            let ledger = ledger.lock().map_err(|_| poisoned("teacher ledger"))?;
            count += ledger
                .bookings
                .values()
                .filter(|b| b.student_id == student_id && b.status.holds_slot())
                .count();
        }
        Ok(count)
    }

    fn teacher_ids(&self) -> Result<Vec<String>> {
        let ledgers = self.ledgers.lock().map_err(|_| poisoned("ledger map"))?;
        let mut ids: Vec<String> = ledgers.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

fn poisoned(what: &str) -> EngineError {
    EngineError::Store(format!("{} lock poisoned", what))
}
