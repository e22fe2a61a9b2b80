//! # presencia-core
//!
//! The attendance engine for Presencia - THE LOGIC.
//!
//! This crate implements the kiosk core: exclusive coordination of one
//! biometric capture device, the identity → template registry with its two
//! matching protocols, the idempotent daily attendance ledger, and the
//! annual rollover sweep.
//!
//! ## Architectural Constraints
//!
//! - Pure synchronous Rust: no async, no network dependencies
//! - The biometric matching primitive is consumed as an opaque capability
//!   ([`CaptureDevice`]); nothing in this crate inspects template bytes
//! - The store's `(person, day)` key layout is the sole correctness
//!   mechanism for concurrent same-day clockings
//! - Outcomes that are not failures (no-match, duplicate clocking) are
//!   modeled as enum variants, never as errors

// =============================================================================
// MODULES
// =============================================================================

pub mod coordinator;
pub mod device;
pub mod events;
pub mod kiosk;
pub mod ledger;
pub mod policy;
pub mod registry;
pub mod rollover;
pub mod storage;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    AttendanceRecord, CaptureMatch, ClockOutcome, ClockReceipt, ClockStatus, EnrollmentProfile,
    Identity, PersonId, PresenciaError, ScanOutcome, Template, VerifyOutcome,
};

// =============================================================================
// RE-EXPORTS: Engine Components
// =============================================================================

pub use coordinator::DeviceCoordinator;
pub use device::CaptureDevice;
pub use events::{EventSink, KioskEvent, NullSink};
pub use kiosk::{Kiosk, ScanClock, VerifyClock};
pub use ledger::{AttendanceLedger, classify};
pub use registry::TemplateRegistry;
pub use rollover::{
    ADVANCEMENT_TABLE, Advance, Cohort, RolloverEngine, SweepOutcome, SweepReport,
    verify_advancement_table,
};
pub use storage::{AttendanceStore, ClockInsert};
