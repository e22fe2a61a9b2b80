//! # Attendance Policy Constants
//!
//! Hardcoded defaults and input limits for the attendance engine.
//!
//! These are compile-time policy values; per-person overrides (late
//! threshold, warning threshold) live on the [`crate::Identity`] record.

use chrono::NaiveTime;

/// Default time-of-day cutoff separating `present` from `late`.
///
/// Applied when an identity record carries no explicit threshold override.
pub const DEFAULT_LATE_THRESHOLD: (u32, u32, u32) = (8, 15, 0);

/// Default delay count at which the receipt collaborator prints a warning.
pub const DEFAULT_WARNING_THRESHOLD: u32 = 10;

/// Maximum length of a normalized person identifier.
///
/// Identifiers longer than this are rejected at construction. Prevents
/// unbounded keys in the identity table.
pub const MAX_PERSON_ID_LENGTH: usize = 16;

/// Maximum accepted template size in bytes.
///
/// Captures larger than this are rejected as malformed. Real device
/// templates are a few kilobytes.
pub const MAX_TEMPLATE_BYTES: usize = 256 * 1024;

/// Resolve the default late threshold as a `NaiveTime`.
#[must_use]
pub fn default_late_threshold() -> NaiveTime {
    let (h, m, s) = DEFAULT_LATE_THRESHOLD;
    NaiveTime::from_hms_opt(h, m, s).unwrap_or(NaiveTime::MIN)
}
