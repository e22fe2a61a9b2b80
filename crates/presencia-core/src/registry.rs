//! # Template Registry
//!
//! Manages the identity → template store and the two matching protocols:
//! one-to-one verification against a claimed identity, and one-to-many scan
//! against the full enrolled set.
//!
//! Enrollment runs under the coordinator's blocking acquisition (the admin
//! is willing to wait); both identify variants run under the non-blocking
//! acquisition so a second walk-up trigger is rejected with `DeviceBusy`
//! instead of queued.

use std::sync::Arc;

use crate::coordinator::DeviceCoordinator;
use crate::device::CaptureDevice;
use crate::events::{EventSink, KioskEvent};
use crate::policy::MAX_TEMPLATE_BYTES;
use crate::storage::AttendanceStore;
use crate::types::{
    EnrollmentProfile, Identity, PersonId, PresenciaError, ScanOutcome, Template, VerifyOutcome,
};

/// The identity → template registry.
pub struct TemplateRegistry {
    store: Arc<AttendanceStore>,
    events: Arc<dyn EventSink>,
}

impl std::fmt::Debug for TemplateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateRegistry").finish_non_exhaustive()
    }
}

impl TemplateRegistry {
    #[must_use]
    pub fn new(store: Arc<AttendanceStore>, events: Arc<dyn EventSink>) -> Self {
        Self { store, events }
    }

    /// Enroll (or re-enroll) a person: run the multi-sample capture sequence
    /// under the blocking device acquisition, upsert the resulting template
    /// keyed by the person id (replace, never append), and apply the
    /// amnesty rule for that person.
    ///
    /// Returns the serialized template bytes on success.
    pub fn enroll<D: CaptureDevice>(
        &self,
        coordinator: &DeviceCoordinator<D>,
        profile: EnrollmentProfile,
    ) -> Result<Template, PresenciaError> {
        profile.validate()?;
        self.events.report(KioskEvent::EnrollStarted {
            person: profile.person.clone(),
        });

        let template = coordinator.with_device(|device| device.enroll_capture())?;
        if template.is_empty() || template.len() > MAX_TEMPLATE_BYTES {
            return Err(PresenciaError::CaptureFailed(format!(
                "device produced a template of {} bytes",
                template.len()
            )));
        }

        // Re-enrollment keeps the existing delay count until the amnesty
        // below zeroes it; a first enrollment starts at zero either way.
        let previous = self.store.get_identity(&profile.person)?;
        let identity = Identity {
            person: profile.person.clone(),
            first_name: profile.first_name,
            middle_name: profile.middle_name,
            paternal_surname: profile.paternal_surname,
            maternal_surname: profile.maternal_surname,
            cohort: profile.cohort,
            late_threshold: profile.late_threshold,
            warning_threshold: profile.warning_threshold,
            delay_count: previous.as_ref().map_or(0, |p| p.delay_count),
            active: true,
            template: Some(template.as_bytes().to_vec()),
        };
        self.store.upsert_identity(&identity)?;

        let reclassified = self.store.apply_amnesty(&profile.person)?;
        self.events.report(KioskEvent::AmnestyApplied {
            person: profile.person.clone(),
            reclassified,
        });
        self.events.report(KioskEvent::EnrollCompleted {
            person: profile.person,
            template_len: template.len(),
        });

        Ok(template)
    }

    /// One-to-one verification: load exactly the claimed identity's template
    /// and confirm it against a single live capture.
    ///
    /// A person without a stored template is unknown to the registry.
    pub fn identify_one<D: CaptureDevice>(
        &self,
        coordinator: &DeviceCoordinator<D>,
        person: &PersonId,
    ) -> Result<VerifyOutcome, PresenciaError> {
        let identity = self
            .store
            .get_identity(person)?
            .ok_or_else(|| PresenciaError::UnknownIdentity(person.as_str().to_string()))?;
        let template = identity
            .template
            .filter(|t| !t.is_empty())
            .ok_or_else(|| PresenciaError::UnknownIdentity(person.as_str().to_string()))?;

        let candidates = vec![(person.clone(), Template::new(template))];
        self.events.report(KioskEvent::ScanStarted { candidates: 1 });

        let matched =
            coordinator.try_with_device(|device| device.identify_capture(&candidates))?;

        match matched {
            Some(hit) if hit.person == *person => {
                self.events.report(KioskEvent::Identified {
                    person: hit.person,
                    score: hit.score,
                });
                Ok(VerifyOutcome::Confirmed { score: hit.score })
            }
            _ => {
                self.events.report(KioskEvent::NotRecognized);
                Ok(VerifyOutcome::Rejected)
            }
        }
    }

    /// One-to-many scan: one live capture compared against every enrolled
    /// template in a single pass.
    ///
    /// Zero enrolled templates short-circuits to [`ScanOutcome::Empty`]
    /// without touching hardware.
    pub fn identify_any<D: CaptureDevice>(
        &self,
        coordinator: &DeviceCoordinator<D>,
    ) -> Result<ScanOutcome, PresenciaError> {
        let candidates = self.store.enrolled_templates()?;
        if candidates.is_empty() {
            return Ok(ScanOutcome::Empty);
        }

        self.events.report(KioskEvent::ScanStarted {
            candidates: candidates.len(),
        });

        let matched =
            coordinator.try_with_device(|device| device.identify_capture(&candidates))?;

        match matched {
            Some(hit) => {
                self.events.report(KioskEvent::Identified {
                    person: hit.person.clone(),
                    score: hit.score,
                });
                Ok(ScanOutcome::Matched(hit))
            }
            None => {
                self.events.report(KioskEvent::NotRecognized);
                Ok(ScanOutcome::NoMatch)
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::events::NullSink;
    use crate::types::CaptureMatch;
    use chrono::NaiveTime;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::tempdir;

    /// Device returning a fixed template and matching on exact bytes.
    struct FixedDevice {
        template: Vec<u8>,
        capture: Vec<u8>,
        touches: Arc<AtomicU32>,
    }

    impl FixedDevice {
        fn new(template: &[u8], capture: &[u8]) -> Self {
            Self {
                template: template.to_vec(),
                capture: capture.to_vec(),
                touches: Arc::new(AtomicU32::new(0)),
            }
        }
    }

    impl CaptureDevice for FixedDevice {
        fn is_present(&self) -> bool {
            true
        }

        fn open(&mut self) -> Result<(), PresenciaError> {
            self.touches.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn close(&mut self) -> Result<(), PresenciaError> {
            Ok(())
        }

        fn enroll_capture(&mut self) -> Result<Template, PresenciaError> {
            Ok(Template::new(self.template.clone()))
        }

        fn identify_capture(
            &mut self,
            candidates: &[(PersonId, Template)],
        ) -> Result<Option<CaptureMatch>, PresenciaError> {
            Ok(candidates
                .iter()
                .find(|(_, t)| t.as_bytes() == self.capture.as_slice())
                .map(|(person, _)| CaptureMatch {
                    person: person.clone(),
                    score: 100,
                }))
        }
    }

    fn registry() -> (TemplateRegistry, Arc<AttendanceStore>, tempfile::TempDir) {
        let temp = tempdir().expect("temp dir");
        let store =
            Arc::new(AttendanceStore::open(temp.path().join("test.redb")).expect("open db"));
        let registry = TemplateRegistry::new(Arc::clone(&store), Arc::new(NullSink));
        (registry, store, temp)
    }

    fn profile(id: &str) -> EnrollmentProfile {
        EnrollmentProfile {
            person: PersonId::new(id).expect("id"),
            first_name: "Ana".to_string(),
            middle_name: None,
            paternal_surname: "Rojas".to_string(),
            maternal_surname: "Soto".to_string(),
            cohort: "1ro Medio".to_string(),
            late_threshold: NaiveTime::from_hms_opt(8, 15, 0).expect("time"),
            warning_threshold: 10,
        }
    }

    #[test]
    fn enroll_persists_template() {
        let (registry, store, _tmp) = registry();
        let coordinator = DeviceCoordinator::new(FixedDevice::new(&[7, 7, 7], &[]));

        let template = registry
            .enroll(&coordinator, profile("1-9"))
            .expect("enroll");
        assert_eq!(template.as_bytes(), &[7, 7, 7]);

        let identity = store
            .get_identity(&PersonId::new("1-9").expect("id"))
            .expect("get")
            .expect("present");
        assert_eq!(identity.template, Some(vec![7, 7, 7]));
        assert!(identity.active);
    }

    #[test]
    fn reenroll_replaces_template_and_applies_amnesty() {
        let (registry, store, _tmp) = registry();
        let coordinator = DeviceCoordinator::new(FixedDevice::new(&[1], &[]));
        registry
            .enroll(&coordinator, profile("1-9"))
            .expect("enroll");

        // Accumulate a late record and counter out of band.
        let person = PersonId::new("1-9").expect("id");
        let record = crate::types::AttendanceRecord {
            person: person.clone(),
            date: chrono::NaiveDate::from_ymd_opt(2026, 3, 2).expect("date"),
            clock_in: NaiveTime::from_hms_opt(9, 0, 0),
            status: crate::types::ClockStatus::Late,
            notified: false,
        };
        store.insert_clocking(&record).expect("insert");
        assert_eq!(
            store.get_identity(&person).expect("get").expect("p").delay_count,
            1
        );

        let coordinator = DeviceCoordinator::new(FixedDevice::new(&[2], &[]));
        registry
            .enroll(&coordinator, profile("1-9"))
            .expect("re-enroll");

        let identity = store.get_identity(&person).expect("get").expect("present");
        assert_eq!(identity.template, Some(vec![2]), "template replaced");
        assert_eq!(identity.delay_count, 0, "counter zeroed");
        let rows = store.attendance_for(&person).expect("rows");
        assert!(
            rows.iter().all(|r| r.status == crate::types::ClockStatus::Present),
            "late history reclassified"
        );
    }

    #[test]
    fn scan_with_empty_roster_skips_hardware() {
        let (registry, _store, _tmp) = registry();
        let device = FixedDevice::new(&[], &[1]);
        let touches = Arc::clone(&device.touches);
        let coordinator = DeviceCoordinator::new(device);

        let outcome = registry.identify_any(&coordinator).expect("scan");
        assert_eq!(outcome, ScanOutcome::Empty);
        assert_eq!(touches.load(Ordering::SeqCst), 0, "device never opened");
    }

    #[test]
    fn scan_matches_enrolled_person() {
        let (registry, _store, _tmp) = registry();
        let coordinator = DeviceCoordinator::new(FixedDevice::new(&[9, 9], &[9, 9]));
        registry
            .enroll(&coordinator, profile("1-9"))
            .expect("enroll");

        let outcome = registry.identify_any(&coordinator).expect("scan");
        match outcome {
            ScanOutcome::Matched(hit) => {
                assert_eq!(hit.person.as_str(), "19");
                assert_eq!(hit.score, 100);
            }
            other => panic!("expected match, got {:?}", other),
        }
    }

    #[test]
    fn scan_reports_clean_no_match() {
        let (registry, _store, _tmp) = registry();
        let coordinator = DeviceCoordinator::new(FixedDevice::new(&[9, 9], &[5, 5]));
        registry
            .enroll(&coordinator, profile("1-9"))
            .expect("enroll");

        let outcome = registry.identify_any(&coordinator).expect("scan");
        assert_eq!(outcome, ScanOutcome::NoMatch);
    }

    #[test]
    fn verify_confirms_claimed_identity() {
        let (registry, _store, _tmp) = registry();
        let coordinator = DeviceCoordinator::new(FixedDevice::new(&[4], &[4]));
        registry
            .enroll(&coordinator, profile("1-9"))
            .expect("enroll");

        let person = PersonId::new("1-9").expect("id");
        let outcome = registry
            .identify_one(&coordinator, &person)
            .expect("verify");
        assert_eq!(outcome, VerifyOutcome::Confirmed { score: 100 });
    }

    #[test]
    fn verify_rejects_mismatched_capture() {
        let (registry, _store, _tmp) = registry();
        let coordinator = DeviceCoordinator::new(FixedDevice::new(&[4], &[8]));
        registry
            .enroll(&coordinator, profile("1-9"))
            .expect("enroll");

        let person = PersonId::new("1-9").expect("id");
        let outcome = registry
            .identify_one(&coordinator, &person)
            .expect("verify");
        assert_eq!(outcome, VerifyOutcome::Rejected);
    }

    #[test]
    fn verify_unknown_person_is_an_error() {
        let (registry, _store, _tmp) = registry();
        let coordinator = DeviceCoordinator::new(FixedDevice::new(&[4], &[4]));

        let person = PersonId::new("1-9").expect("id");
        let result = registry.identify_one(&coordinator, &person);
        assert!(matches!(result, Err(PresenciaError::UnknownIdentity(_))));
    }

    #[test]
    fn empty_template_from_device_is_capture_failure() {
        let (registry, _store, _tmp) = registry();
        let coordinator = DeviceCoordinator::new(FixedDevice::new(&[], &[]));

        let result = registry.enroll(&coordinator, profile("1-9"));
        assert!(matches!(result, Err(PresenciaError::CaptureFailed(_))));
    }
}
