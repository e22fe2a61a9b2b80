//! # Core Type Definitions
//!
//! This module contains all core types for the Presencia attendance engine:
//! - Identifiers (`PersonId`)
//! - Roster records (`Identity`, `EnrollmentProfile`)
//! - Attendance facts (`AttendanceRecord`, `ClockStatus`, `ClockOutcome`)
//! - Capture results (`Template`, `CaptureMatch`, `ScanOutcome`, `VerifyOutcome`)
//! - Error types (`PresenciaError`)
//!
//! ## Outcome vs Error
//!
//! A failed match (`ScanOutcome::NoMatch`) and a duplicate same-day clocking
//! (`ClockOutcome::AlreadyRecorded`) are legitimate results of a correctly
//! functioning kiosk. They are modeled as enum variants, never as errors, so
//! the idempotent paths stay out of error-style control flow.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::policy::MAX_PERSON_ID_LENGTH;

// =============================================================================
// PERSON IDENTIFIER
// =============================================================================

/// Normalized external identifier of an enrolled person.
///
/// Construction strips dots and dashes and uppercases the remainder, matching
/// how the identifier is keyed throughout the store. Checksum validation is
/// the job of the enrollment front-end, not this crate.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PersonId(String);

impl PersonId {
    /// Normalize and validate a raw identifier.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, PresenciaError> {
        let normalized: String = raw
            .as_ref()
            .chars()
            .filter(|c| *c != '.' && *c != '-')
            .flat_map(char::to_uppercase)
            .collect();

        if normalized.is_empty() {
            return Err(PresenciaError::InvalidProfile(
                "person identifier is empty".to_string(),
            ));
        }
        if normalized.len() > MAX_PERSON_ID_LENGTH {
            return Err(PresenciaError::InvalidProfile(format!(
                "person identifier exceeds {} characters",
                MAX_PERSON_ID_LENGTH
            )));
        }
        if !normalized.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(PresenciaError::InvalidProfile(format!(
                "person identifier '{}' contains invalid characters",
                normalized
            )));
        }

        Ok(Self(normalized))
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PersonId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// TEMPLATE
// =============================================================================

/// Opaque serialized biometric reference data produced by enrollment.
///
/// The engine never inspects the bytes; they are produced and consumed only
/// by the capture device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template(Vec<u8>);

impl Template {
    /// Wrap raw template bytes.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Get the template as a byte slice.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume the template and return the raw bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// =============================================================================
// IDENTITY (roster record)
// =============================================================================

/// An enrolled person.
///
/// One row in the identity table. The `template` field stays `None` until the
/// first successful enrollment capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Unique external identifier.
    pub person: PersonId,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub paternal_surname: String,
    pub maternal_surname: String,
    /// Cohort label, resolved against the advancement table during rollover.
    pub cohort: String,
    /// Time-of-day cutoff separating `Present` from `Late`.
    pub late_threshold: NaiveTime,
    /// Delay count at which the receipt collaborator renders a warning.
    pub warning_threshold: u32,
    /// Running count of `Late` classifications since the last reset.
    pub delay_count: u32,
    pub active: bool,
    /// Serialized capture template; `None` until first enrollment.
    pub template: Option<Vec<u8>>,
}

impl Identity {
    /// Display name assembled from the stored name parts.
    #[must_use]
    pub fn full_name(&self) -> String {
        let mut name = self.first_name.clone();
        if let Some(middle) = &self.middle_name {
            name.push(' ');
            name.push_str(middle);
        }
        name.push(' ');
        name.push_str(&self.paternal_surname);
        name.push(' ');
        name.push_str(&self.maternal_surname);
        name
    }

    /// Whether this identity has a usable enrollment template.
    #[must_use]
    pub fn is_enrolled(&self) -> bool {
        self.template.as_ref().is_some_and(|t| !t.is_empty())
    }
}

/// Validated input for an enrollment or identity edit.
///
/// Produced by the front-end after field validation; the registry turns it
/// into an [`Identity`] once a template has been captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentProfile {
    pub person: PersonId,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub paternal_surname: String,
    pub maternal_surname: String,
    pub cohort: String,
    pub late_threshold: NaiveTime,
    pub warning_threshold: u32,
}

impl EnrollmentProfile {
    /// Check the mandatory name parts.
    pub fn validate(&self) -> Result<(), PresenciaError> {
        if self.first_name.trim().is_empty() {
            return Err(PresenciaError::InvalidProfile(
                "first name is required".to_string(),
            ));
        }
        if self.paternal_surname.trim().is_empty() || self.maternal_surname.trim().is_empty() {
            return Err(PresenciaError::InvalidProfile(
                "both surnames are required".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// ATTENDANCE
// =============================================================================

/// Punctuality classification of a clocking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ClockStatus {
    Present,
    Late,
    Absent,
}

impl ClockStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ClockStatus::Present => "present",
            ClockStatus::Late => "late",
            ClockStatus::Absent => "absent",
        }
    }

    #[must_use]
    pub fn is_late(&self) -> bool {
        matches!(self, ClockStatus::Late)
    }
}

impl std::fmt::Display for ClockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One attendance fact: at most one per (person, date).
///
/// Never updated after creation except by the re-enrollment amnesty rule,
/// which reclassifies historical `Late` rows to `Present`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub person: PersonId,
    pub date: NaiveDate,
    pub clock_in: Option<NaiveTime>,
    pub status: ClockStatus,
    pub notified: bool,
}

/// Result of a clocking attempt. Both variants are success cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockOutcome {
    /// A new row was created for today.
    Recorded { status: ClockStatus, delays: u32 },
    /// Today's row already existed; nothing was written.
    AlreadyRecorded { delays: u32 },
}

impl ClockOutcome {
    /// Current delay count after the attempt.
    #[must_use]
    pub fn delays(&self) -> u32 {
        match self {
            ClockOutcome::Recorded { delays, .. } | ClockOutcome::AlreadyRecorded { delays } => {
                *delays
            }
        }
    }
}

/// The tuple handed to the receipt/notification collaborator after a
/// successful identify-and-record cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClockReceipt {
    pub person: PersonId,
    pub full_name: String,
    pub status: ClockStatus,
    pub delays: u32,
    pub warning_threshold: u32,
    /// True when today's row already existed before this cycle.
    pub duplicate: bool,
}

impl ClockReceipt {
    /// Whether the collaborator should render a delay warning.
    #[must_use]
    pub fn warning_due(&self) -> bool {
        self.delays >= self.warning_threshold
    }
}

// =============================================================================
// CAPTURE RESULTS
// =============================================================================

/// Best match reported by the capture device, with an integer confidence
/// score from 0 to 100. The acceptance threshold lives in the device; a
/// returned match is already above it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureMatch {
    pub person: PersonId,
    pub score: u8,
}

/// Result of a one-to-many scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// The live capture matched an enrolled identity.
    Matched(CaptureMatch),
    /// Capture succeeded but matched nobody. A valid outcome, not an error.
    NoMatch,
    /// No templates are enrolled; the device was never touched.
    Empty,
}

/// Result of a one-to-one verification against a claimed identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// The live capture confirmed the claimed identity.
    Confirmed { score: u8 },
    /// Capture succeeded but did not match the claimed identity.
    Rejected,
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors surfaced by the attendance engine.
///
/// Hardware and storage errors propagate to the immediate caller as typed
/// results and are never retried inside the engine; retry is a user-initiated
/// re-trigger.
#[derive(Debug, Error)]
pub enum PresenciaError {
    /// No capture device is enumerated. Fatal to the operation, not the process.
    #[error("no capture device available")]
    HardwareUnavailable,

    /// Another capture holds the device. Retryable by the caller.
    #[error("capture device is busy")]
    DeviceBusy,

    /// The capture primitive failed or timed out. Retryable.
    #[error("capture failed: {0}")]
    CaptureFailed(String),

    /// The referenced person is not in the roster (or has no enrollment).
    #[error("unknown identity: {0}")]
    UnknownIdentity(String),

    /// Enrollment input failed validation.
    #[error("invalid profile: {0}")]
    InvalidProfile(String),

    /// The cohort advancement table is malformed.
    #[error("invalid advancement table: {0}")]
    InvalidAdvancementTable(String),

    /// An unexpected storage failure (anything beyond the expected
    /// key-already-exists no-op).
    #[error("storage error: {0}")]
    Storage(String),

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {0}")]
    Serialization(String),
}

// =============================================================================
// TESTS
// =============================================================================
