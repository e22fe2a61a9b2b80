//! # Attendance Ledger
//!
//! Converts a successful identification into exactly one attendance fact per
//! day, with punctuality classification and counter bookkeeping. Safe under
//! concurrent callers: the store's `(person, day)` key layout makes the
//! insert idempotent, so no ledger-level lock exists.

use chrono::{NaiveDateTime, NaiveTime};
use std::sync::Arc;

use crate::storage::{AttendanceStore, ClockInsert};
use crate::types::{
    AttendanceRecord, ClockOutcome, ClockStatus, Identity, PersonId, PresenciaError,
};

/// Classify a clock-in against the per-person cutoff.
///
/// Time-of-day only; the comparison is date-independent and the boundary is
/// inclusive: clocking exactly at the threshold is on time.
#[must_use]
pub fn classify(clock_in: NaiveTime, threshold: NaiveTime) -> ClockStatus {
    if clock_in <= threshold {
        ClockStatus::Present
    } else {
        ClockStatus::Late
    }
}

/// The daily attendance ledger.
#[derive(Debug, Clone)]
pub struct AttendanceLedger {
    store: Arc<AttendanceStore>,
}

impl AttendanceLedger {
    #[must_use]
    pub fn new(store: Arc<AttendanceStore>) -> Self {
        Self { store }
    }

    /// Record a clocking for `person` at `now`.
    ///
    /// Looks up the identity (its threshold and counter), classifies the
    /// time of day, then delegates the insert-or-no-op plus conditional
    /// counter increment to a single store transaction. Two near-simultaneous
    /// calls for the same person and day race the insert; exactly one wins
    /// the row and the other returns [`ClockOutcome::AlreadyRecorded`].
    pub fn record_clocking(
        &self,
        person: &PersonId,
        now: NaiveDateTime,
    ) -> Result<ClockOutcome, PresenciaError> {
        let identity = self
            .store
            .get_identity(person)?
            .ok_or_else(|| PresenciaError::UnknownIdentity(person.as_str().to_string()))?;

        let status = classify(now.time(), identity.late_threshold);
        let record = AttendanceRecord {
            person: person.clone(),
            date: now.date(),
            clock_in: Some(now.time()),
            status,
            notified: false,
        };

        match self.store.insert_clocking(&record)? {
            ClockInsert::Created { delays } => Ok(ClockOutcome::Recorded { status, delays }),
            ClockInsert::Existing { delays } => Ok(ClockOutcome::AlreadyRecorded { delays }),
        }
    }

    /// Re-enrollment amnesty: zero the counter and reclassify historical
    /// `Late` rows to `Present`. Returns the number of rows reclassified.
    pub fn amnesty(&self, person: &PersonId) -> Result<u32, PresenciaError> {
        self.store.apply_amnesty(person)
    }

    /// Attendance history for one person, in date order.
    pub fn history_for(&self, person: &PersonId) -> Result<Vec<AttendanceRecord>, PresenciaError> {
        self.store.attendance_for(person)
    }

    /// Attendance history across the roster for an inclusive date range.
    pub fn history_between(
        &self,
        from: chrono::NaiveDate,
        to: chrono::NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, PresenciaError> {
        self.store.attendance_between(from, to)
    }

    /// Load the identity backing a receipt.
    pub fn identity(&self, person: &PersonId) -> Result<Identity, PresenciaError> {
        self.store
            .get_identity(person)?
            .ok_or_else(|| PresenciaError::UnknownIdentity(person.as_str().to_string()))
    }
}

// =============================================================================
// TESTS
// =============================================================================
