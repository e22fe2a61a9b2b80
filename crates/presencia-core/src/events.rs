//! # Progress Events
//!
//! Components report human-relevant progress through a narrow injected
//! capability instead of a loosely-typed callback threaded down the call
//! chain. The kiosk binary installs a tracing-backed sink; tests install a
//! collector.

use crate::types::{ClockStatus, PersonId};

/// One progress event from the attendance engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KioskEvent {
    EnrollStarted { person: PersonId },
    EnrollCompleted { person: PersonId, template_len: usize },
    AmnestyApplied { person: PersonId, reclassified: u32 },
    ScanStarted { candidates: usize },
    Identified { person: PersonId, score: u8 },
    NotRecognized,
    ClockRecorded { person: PersonId, status: ClockStatus, delays: u32 },
    ClockDuplicate { person: PersonId, delays: u32 },
    SweepStarted { year: u64 },
    SweepSkipped { year: u64 },
    SweepCompleted { year: u64, promoted: usize, graduated: usize },
    CohortUnknown { person: PersonId, label: String },
    DelaysReset { identities: usize },
}

impl std::fmt::Display for KioskEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KioskEvent::EnrollStarted { person } => {
                write!(f, "enrollment started for {}", person)
            }
            KioskEvent::EnrollCompleted {
                person,
                template_len,
            } => write!(
                f,
                "enrollment completed for {} ({} template bytes)",
                person, template_len
            ),
            KioskEvent::AmnestyApplied {
                person,
                reclassified,
            } => write!(
                f,
                "amnesty for {}: counter zeroed, {} records reclassified",
                person, reclassified
            ),
            KioskEvent::ScanStarted { candidates } => {
                write!(f, "scan started against {} candidates", candidates)
            }
            KioskEvent::Identified { person, score } => {
                write!(f, "identified {} (score {})", person, score)
            }
            KioskEvent::NotRecognized => f.write_str("capture matched no enrolled identity"),
            KioskEvent::ClockRecorded {
                person,
                status,
                delays,
            } => write!(
                f,
                "clocking recorded for {}: {} ({} delays)",
                person, status, delays
            ),
            KioskEvent::ClockDuplicate { person, delays } => write!(
                f,
                "clocking for {} already recorded today ({} delays)",
                person, delays
            ),
            KioskEvent::SweepStarted { year } => write!(f, "rollover sweep started for {}", year),
            KioskEvent::SweepSkipped { year } => {
                write!(f, "rollover already applied for {}", year)
            }
            KioskEvent::SweepCompleted {
                year,
                promoted,
                graduated,
            } => write!(
                f,
                "rollover {} complete: {} promoted, {} graduated",
                year, promoted, graduated
            ),
            KioskEvent::CohortUnknown { person, label } => {
                write!(f, "cohort '{}' of {} not in advancement table", label, person)
            }
            KioskEvent::DelaysReset { identities } => {
                write!(f, "delay counters reset for {} identities", identities)
            }
        }
    }
}

/// Narrow reporting capability injected into the engine.
pub trait EventSink: Send + Sync {
    fn report(&self, event: KioskEvent);
}

/// Sink that drops every event. Useful for one-shot CLI paths and tests
/// that do not assert on events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn report(&self, _event: KioskEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_render_for_humans() {
        let person = PersonId::new("12345678-K").expect("id");
        let rendered = KioskEvent::ClockRecorded {
            person,
            status: ClockStatus::Late,
            delays: 3,
        }
        .to_string();
        assert_eq!(rendered, "clocking recorded for 12345678K: late (3 delays)");
    }
}
