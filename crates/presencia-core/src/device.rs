//! # Capture Device Abstraction
//!
//! The biometric matching primitive is consumed as an opaque capability.
//! This module defines the trait the rest of the engine programs against;
//! concrete implementations (libfprint bindings, the simulated device used
//! by the kiosk binary) live outside this crate.
//!
//! # Extension Point
//!
//! This trait is intentionally defined without in-crate implementations
//! beyond test doubles. Implementors are expected to be exclusive owners of
//! one physical reader; serialization across callers is the
//! [`crate::DeviceCoordinator`]'s job, not the device's.

use crate::{CaptureMatch, PersonId, PresenciaError, Template};

/// A single physical capture device.
///
/// Open/close bracketing is driven by the coordinator: every operation runs
/// between exactly one `open` and one `close`, and the device must tolerate
/// `close` after a failed operation.
pub trait CaptureDevice: Send {
    /// Whether a physical reader is currently enumerated.
    fn is_present(&self) -> bool;

    /// Open the device for a capture operation.
    fn open(&mut self) -> Result<(), PresenciaError>;

    /// Close the device. Called on every exit path, including failures.
    fn close(&mut self) -> Result<(), PresenciaError>;

    /// Run the multi-sample enrollment sequence and return one serialized
    /// template. Blocks until the physical interaction completes.
    fn enroll_capture(&mut self) -> Result<Template, PresenciaError>;

    /// Take one live capture and compare it against the candidate set in a
    /// single pass. Returns the best match above the device's acceptance
    /// threshold, or `None` for a clean no-match.
    fn identify_capture(
        &mut self,
        candidates: &[(PersonId, Template)],
    ) -> Result<Option<CaptureMatch>, PresenciaError>;
}
