//! # Kiosk Façade
//!
//! The surface the screen layer programs against. Composes the device
//! coordinator, template registry, and attendance ledger into the two
//! walk-up flows (scan, claimed-identity verify) and the admin flows
//! (enroll, edit, roster, reports, manual reset).
//!
//! The façade owns nothing UI-shaped: callers get structured outcomes and
//! receipts, and progress arrives through the injected [`EventSink`].

use chrono::NaiveDateTime;
use std::sync::Arc;

use crate::coordinator::DeviceCoordinator;
use crate::device::CaptureDevice;
use crate::events::{EventSink, KioskEvent};
use crate::ledger::AttendanceLedger;
use crate::registry::TemplateRegistry;
use crate::storage::AttendanceStore;
use crate::types::{
    AttendanceRecord, ClockOutcome, ClockReceipt, EnrollmentProfile, Identity, PersonId,
    PresenciaError, ScanOutcome, Template, VerifyOutcome,
};

/// Outcome of the walk-up scan flow (identify-any, then record).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanClock {
    Clocked(ClockReceipt),
    /// Capture matched nobody. Not an error.
    NoMatch,
    /// Nothing enrolled; the device was never touched.
    Empty,
}

/// Outcome of the claimed-identity flow (verify, then record).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyClock {
    Clocked(ClockReceipt),
    /// Capture did not confirm the claimed identity. Not an error.
    Rejected,
}

/// The kiosk: one device, one roster, one ledger.
pub struct Kiosk<D: CaptureDevice> {
    coordinator: DeviceCoordinator<D>,
    registry: TemplateRegistry,
    ledger: AttendanceLedger,
    store: Arc<AttendanceStore>,
    events: Arc<dyn EventSink>,
}

impl<D: CaptureDevice> std::fmt::Debug for Kiosk<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kiosk").finish_non_exhaustive()
    }
}

impl<D: CaptureDevice> Kiosk<D> {
    /// Assemble a kiosk around an exclusively owned device and a shared store.
    #[must_use]
    pub fn new(device: D, store: Arc<AttendanceStore>, events: Arc<dyn EventSink>) -> Self {
        Self {
            coordinator: DeviceCoordinator::new(device),
            registry: TemplateRegistry::new(Arc::clone(&store), Arc::clone(&events)),
            ledger: AttendanceLedger::new(Arc::clone(&store)),
            store,
            events,
        }
    }

    // =========================================================================
    // ADMIN FLOWS
    // =========================================================================

    /// Enroll or re-enroll a person (blocking device acquisition).
    pub fn enroll(&self, profile: EnrollmentProfile) -> Result<Template, PresenciaError> {
        self.registry.enroll(&self.coordinator, profile)
    }

    /// Edit an existing identity's profile fields without touching its
    /// template, counter, or history.
    pub fn update_identity(&self, profile: EnrollmentProfile) -> Result<(), PresenciaError> {
        profile.validate()?;
        let mut identity = self
            .store
            .get_identity(&profile.person)?
            .ok_or_else(|| PresenciaError::UnknownIdentity(profile.person.as_str().to_string()))?;

        identity.first_name = profile.first_name;
        identity.middle_name = profile.middle_name;
        identity.paternal_surname = profile.paternal_surname;
        identity.maternal_surname = profile.maternal_surname;
        identity.cohort = profile.cohort;
        identity.late_threshold = profile.late_threshold;
        identity.warning_threshold = profile.warning_threshold;
        self.store.upsert_identity(&identity)
    }

    /// Full roster in person-id order, for the listing screen and exports.
    pub fn roster(&self) -> Result<Vec<Identity>, PresenciaError> {
        self.store.identities()
    }

    /// Zero every delay counter on demand (admin action, outside the sweep).
    pub fn reset_all_delays(&self) -> Result<usize, PresenciaError> {
        let touched = self.store.reset_all_delays()?;
        self.events.report(KioskEvent::DelaysReset {
            identities: touched,
        });
        Ok(touched)
    }

    // =========================================================================
    // WALK-UP FLOWS
    // =========================================================================

    /// Walk-up identification with no claimed identity: one-to-many scan,
    /// then record today's clocking for the matched person.
    pub fn clock_by_scan(&self, now: NaiveDateTime) -> Result<ScanClock, PresenciaError> {
        match self.registry.identify_any(&self.coordinator)? {
            ScanOutcome::Matched(hit) => {
                let receipt = self.record_and_receipt(&hit.person, now)?;
                Ok(ScanClock::Clocked(receipt))
            }
            ScanOutcome::NoMatch => Ok(ScanClock::NoMatch),
            ScanOutcome::Empty => Ok(ScanClock::Empty),
        }
    }

    /// Claimed-identity flow: one-to-one verification, then record.
    pub fn clock_by_verify(
        &self,
        person: &PersonId,
        now: NaiveDateTime,
    ) -> Result<VerifyClock, PresenciaError> {
        match self.registry.identify_one(&self.coordinator, person)? {
            VerifyOutcome::Confirmed { .. } => {
                let receipt = self.record_and_receipt(person, now)?;
                Ok(VerifyClock::Clocked(receipt))
            }
            VerifyOutcome::Rejected => Ok(VerifyClock::Rejected),
        }
    }

    fn record_and_receipt(
        &self,
        person: &PersonId,
        now: NaiveDateTime,
    ) -> Result<ClockReceipt, PresenciaError> {
        let outcome = self.ledger.record_clocking(person, now)?;
        let identity = self.ledger.identity(person)?;

        let (status, duplicate) = match outcome {
            ClockOutcome::Recorded { status, .. } => {
                self.events.report(KioskEvent::ClockRecorded {
                    person: person.clone(),
                    status,
                    delays: outcome.delays(),
                });
                (status, false)
            }
            ClockOutcome::AlreadyRecorded { .. } => {
                self.events.report(KioskEvent::ClockDuplicate {
                    person: person.clone(),
                    delays: outcome.delays(),
                });
                // Today's row keeps its original classification.
                let today = self
                    .ledger
                    .history_for(person)?
                    .into_iter()
                    .find(|r| r.date == now.date())
                    .map(|r| r.status)
                    .unwrap_or(crate::types::ClockStatus::Present);
                (today, true)
            }
        };

        Ok(ClockReceipt {
            person: person.clone(),
            full_name: identity.full_name(),
            status,
            delays: outcome.delays(),
            warning_threshold: identity.warning_threshold,
            duplicate,
        })
    }

    // =========================================================================
    // READ SIDE (reporting collaborators)
    // =========================================================================

    /// Attendance history across the roster for an inclusive date range.
    pub fn history_between(
        &self,
        from: chrono::NaiveDate,
        to: chrono::NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, PresenciaError> {
        self.ledger.history_between(from, to)
    }

    /// Attendance history for one person.
    pub fn history_for(&self, person: &PersonId) -> Result<Vec<AttendanceRecord>, PresenciaError> {
        self.ledger.history_for(person)
    }

    /// The shared store, for the rollover engine that runs before traffic.
    #[must_use]
    pub fn store(&self) -> &Arc<AttendanceStore> {
        &self.store
    }
}

// =============================================================================
// TESTS
// =============================================================================
