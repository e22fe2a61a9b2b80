//! # Annual Rollover
//!
//! Once per year the sweep zeroes every delay counter and advances each
//! identity's cohort; identities leaving the terminal cohort graduate and
//! are deleted together with their attendance history.
//!
//! The advancement mapping is a declared, ordered transition table with an
//! explicit graduate marker, checked for completeness when the engine is
//! constructed. A persisted year marker makes the sweep idempotent: the
//! marker is written only after the whole sweep succeeds, and every step is
//! individually safe to re-run after an interruption.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::events::{EventSink, KioskEvent};
use crate::storage::AttendanceStore;
use crate::types::PresenciaError;

// =============================================================================
// COHORTS
// =============================================================================

/// The four cohorts of the secondary cycle, in advancement order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Cohort {
    FirstYear,
    SecondYear,
    ThirdYear,
    FourthYear,
}

/// Where a cohort goes at rollover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Promote(Cohort),
    /// Terminal marker: the identity leaves the roster.
    Graduate,
}

/// The declared advancement table, in cohort order.
pub const ADVANCEMENT_TABLE: [(Cohort, Advance); 4] = [
    (Cohort::FirstYear, Advance::Promote(Cohort::SecondYear)),
    (Cohort::SecondYear, Advance::Promote(Cohort::ThirdYear)),
    (Cohort::ThirdYear, Advance::Promote(Cohort::FourthYear)),
    (Cohort::FourthYear, Advance::Graduate),
];

impl Cohort {
    /// The roster label stored on identity records.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Cohort::FirstYear => "1ro Medio",
            Cohort::SecondYear => "2do Medio",
            Cohort::ThirdYear => "3ro Medio",
            Cohort::FourthYear => "4to Medio",
        }
    }

    /// Resolve a stored label against the known cohorts.
    #[must_use]
    pub fn parse(label: &str) -> Option<Cohort> {
        ADVANCEMENT_TABLE
            .iter()
            .map(|(cohort, _)| *cohort)
            .find(|cohort| cohort.label() == label)
    }

    /// Where this cohort goes at rollover.
    #[must_use]
    pub fn advance(&self) -> Advance {
        match self {
            Cohort::FirstYear => Advance::Promote(Cohort::SecondYear),
            Cohort::SecondYear => Advance::Promote(Cohort::ThirdYear),
            Cohort::ThirdYear => Advance::Promote(Cohort::FourthYear),
            Cohort::FourthYear => Advance::Graduate,
        }
    }

    /// Check if this cohort is terminal.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self.advance(), Advance::Graduate)
    }

    fn all() -> [Cohort; 4] {
        [
            Cohort::FirstYear,
            Cohort::SecondYear,
            Cohort::ThirdYear,
            Cohort::FourthYear,
        ]
    }
}

impl std::fmt::Display for Cohort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Verify the advancement table covers every cohort exactly once as a source,
/// agrees with [`Cohort::advance`], and names only one terminal cohort.
pub fn verify_advancement_table() -> Result<(), PresenciaError> {
    for cohort in Cohort::all() {
        let entries: Vec<&Advance> = ADVANCEMENT_TABLE
            .iter()
            .filter(|(source, _)| *source == cohort)
            .map(|(_, advance)| advance)
            .collect();
        match entries.as_slice() {
            [advance] => {
                if **advance != cohort.advance() {
                    return Err(PresenciaError::InvalidAdvancementTable(format!(
                        "table disagrees with advance() for '{}'",
                        cohort
                    )));
                }
            }
            [] => {
                return Err(PresenciaError::InvalidAdvancementTable(format!(
                    "cohort '{}' has no advancement entry",
                    cohort
                )));
            }
            _ => {
                return Err(PresenciaError::InvalidAdvancementTable(format!(
                    "cohort '{}' has duplicate advancement entries",
                    cohort
                )));
            }
        }
    }

    let terminals = ADVANCEMENT_TABLE
        .iter()
        .filter(|(_, advance)| matches!(advance, Advance::Graduate))
        .count();
    if terminals != 1 {
        return Err(PresenciaError::InvalidAdvancementTable(format!(
            "expected exactly one terminal cohort, found {}",
            terminals
        )));
    }
    Ok(())
}

// =============================================================================
// SWEEP
// =============================================================================

/// What one sweep did.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SweepReport {
    pub counters_reset: usize,
    pub promoted: usize,
    pub graduated: usize,
    /// Person ids whose cohort label was not in the table, left untouched.
    pub skipped: Vec<String>,
}

/// Result of [`RolloverEngine::run_if_due`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepOutcome {
    Applied(SweepReport),
    /// The marker already names this year; nothing was changed.
    AlreadyApplied,
}

/// The yearly sweep. Runs single-threaded at process start, before any
/// capture traffic is accepted.
pub struct RolloverEngine {
    store: Arc<AttendanceStore>,
    events: Arc<dyn EventSink>,
}

impl std::fmt::Debug for RolloverEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RolloverEngine").finish_non_exhaustive()
    }
}

impl RolloverEngine {
    /// Build the engine, verifying the advancement table first.
    pub fn new(
        store: Arc<AttendanceStore>,
        events: Arc<dyn EventSink>,
    ) -> Result<Self, PresenciaError> {
        verify_advancement_table()?;
        Ok(Self { store, events })
    }

    /// Run the sweep for `year` unless the marker says it already ran.
    ///
    /// Order: reset counters, advance cohorts (graduates deleted with their
    /// attendance, one transaction each), then persist the marker. A crash
    /// before the marker write leaves a state where every step can safely
    /// re-run; deletion of an already-deleted graduate is a no-op.
    pub fn run_if_due(&self, year: u64) -> Result<SweepOutcome, PresenciaError> {
        if self.store.rollover_year()? == Some(year) {
            self.events.report(KioskEvent::SweepSkipped { year });
            return Ok(SweepOutcome::AlreadyApplied);
        }

        self.events.report(KioskEvent::SweepStarted { year });
        let mut report = SweepReport::default();

        report.counters_reset = self.store.reset_all_delays()?;
        self.events.report(KioskEvent::DelaysReset {
            identities: report.counters_reset,
        });

        for mut identity in self.store.identities()? {
            let Some(cohort) = Cohort::parse(&identity.cohort) else {
                self.events.report(KioskEvent::CohortUnknown {
                    person: identity.person.clone(),
                    label: identity.cohort.clone(),
                });
                report.skipped.push(identity.person.as_str().to_string());
                continue;
            };

            match cohort.advance() {
                Advance::Promote(next) => {
                    identity.cohort = next.label().to_string();
                    self.store.upsert_identity(&identity)?;
                    report.promoted += 1;
                }
                Advance::Graduate => {
                    self.store.remove_identity_cascade(&identity.person)?;
                    report.graduated += 1;
                }
            }
        }

        // Marker last: only a fully applied sweep counts as done.
        self.store.set_rollover_year(year)?;
        self.events.report(KioskEvent::SweepCompleted {
            year,
            promoted: report.promoted,
            graduated: report.graduated,
        });

        Ok(SweepOutcome::Applied(report))
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
    use crate::types::{AttendanceRecord, ClockStatus, Identity, PersonId};
    use chrono::{NaiveDate, NaiveTime};
    use tempfile::tempdir;

    fn student(id: &str, cohort: &str, delays: u32) -> Identity {
        Identity {
            person: PersonId::new(id).expect("id"),
            first_name: "Ana".to_string(),
            middle_name: None,
            paternal_surname: "Rojas".to_string(),
            maternal_surname: "Soto".to_string(),
            cohort: cohort.to_string(),
            late_threshold: NaiveTime::from_hms_opt(8, 15, 0).expect("time"),
            warning_threshold: 10,
            delay_count: delays,
            active: true,
            template: Some(vec![1]),
        }
    }

    fn engine_with(
        identities: &[Identity],
    ) -> (RolloverEngine, Arc<AttendanceStore>, tempfile::TempDir) {
        let temp = tempdir().expect("temp dir");
        let store =
            Arc::new(AttendanceStore::open(temp.path().join("test.redb")).expect("open db"));
        for identity in identities {
            store.upsert_identity(identity).expect("upsert");
        }
        let engine =
            RolloverEngine::new(Arc::clone(&store), Arc::new(NullSink)).expect("engine");
        (engine, store, temp)
    }

    #[test]
    fn advancement_table_is_complete() {
        assert!(verify_advancement_table().is_ok());
    }

    #[test]
    fn labels_roundtrip_through_parse() {
        for (cohort, _) in ADVANCEMENT_TABLE {
            assert_eq!(Cohort::parse(cohort.label()), Some(cohort));
        }
        assert_eq!(Cohort::parse("5to Medio"), None);
    }

    #[test]
    fn only_fourth_year_is_terminal() {
        assert!(!Cohort::FirstYear.is_terminal());
        assert!(!Cohort::ThirdYear.is_terminal());
        assert!(Cohort::FourthYear.is_terminal());
    }

    #[test]
    fn sweep_resets_counters_and_promotes() {
        let (engine, store, _tmp) = engine_with(&[
            student("1-9", "1ro Medio", 5),
            student("2-7", "3ro Medio", 2),
        ]);

        let outcome = engine.run_if_due(2027).expect("sweep");
        let SweepOutcome::Applied(report) = outcome else {
            panic!("expected applied sweep");
        };
        assert_eq!(report.counters_reset, 2);
        assert_eq!(report.promoted, 2);
        assert_eq!(report.graduated, 0);

        let roster = store.identities().expect("roster");
        assert!(roster.iter().all(|i| i.delay_count == 0));
        let cohorts: Vec<&str> = roster.iter().map(|i| i.cohort.as_str()).collect();
        assert_eq!(cohorts, vec!["2do Medio", "4to Medio"]);
    }

    #[test]
    fn terminal_cohort_graduates_with_history() {
        let (engine, store, _tmp) = engine_with(&[student("1-9", "4to Medio", 1)]);
        let person = PersonId::new("1-9").expect("id");
        store
            .insert_clocking(&AttendanceRecord {
                person: person.clone(),
                date: NaiveDate::from_ymd_opt(2026, 3, 2).expect("date"),
                clock_in: NaiveTime::from_hms_opt(8, 0, 0),
                status: ClockStatus::Present,
                notified: false,
            })
            .expect("insert");

        let outcome = engine.run_if_due(2027).expect("sweep");
        let SweepOutcome::Applied(report) = outcome else {
            panic!("expected applied sweep");
        };
        assert_eq!(report.graduated, 1);
        assert!(store.get_identity(&person).expect("get").is_none());
        assert!(store.attendance_for(&person).expect("rows").is_empty());
    }

    #[test]
    fn sweep_is_idempotent_per_year() {
        let (engine, store, _tmp) = engine_with(&[student("1-9", "1ro Medio", 3)]);

        let first = engine.run_if_due(2027).expect("sweep");
        assert!(matches!(first, SweepOutcome::Applied(_)));

        let second = engine.run_if_due(2027).expect("sweep");
        assert_eq!(second, SweepOutcome::AlreadyApplied);

        // Still exactly one promotion.
        let roster = store.identities().expect("roster");
        assert_eq!(roster[0].cohort, "2do Medio");
    }

    #[test]
    fn next_year_sweeps_again() {
        let (engine, store, _tmp) = engine_with(&[student("1-9", "1ro Medio", 0)]);

        engine.run_if_due(2027).expect("sweep");
        engine.run_if_due(2028).expect("sweep");

        let roster = store.identities().expect("roster");
        assert_eq!(roster[0].cohort, "3ro Medio");
        assert_eq!(store.rollover_year().expect("marker"), Some(2028));
    }

    #[test]
    fn unknown_cohort_is_skipped_not_fatal() {
        let (engine, store, _tmp) = engine_with(&[
            student("1-9", "Nocturna", 4),
            student("2-7", "1ro Medio", 0),
        ]);

        let outcome = engine.run_if_due(2027).expect("sweep");
        let SweepOutcome::Applied(report) = outcome else {
            panic!("expected applied sweep");
        };
        assert_eq!(report.skipped, vec!["19".to_string()]);
        assert_eq!(report.promoted, 1);

        let odd = store
            .get_identity(&PersonId::new("1-9").expect("id"))
            .expect("get")
            .expect("present");
        assert_eq!(odd.cohort, "Nocturna", "label untouched");
        assert_eq!(odd.delay_count, 0, "counter still reset");
    }

    #[test]
    fn marker_written_after_sweep() {
        let (engine, store, _tmp) = engine_with(&[]);
        assert_eq!(store.rollover_year().expect("marker"), None);

        engine.run_if_due(2027).expect("sweep");
        assert_eq!(store.rollover_year().expect("marker"), Some(2027));
    }
}
