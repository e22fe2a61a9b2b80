//! # Hardware Capture Coordinator
//!
//! Exactly one capture (enroll or identify) may touch the physical device at
//! a time, across any number of concurrently requesting threads. The
//! coordinator owns the device behind a mutex and brackets every operation
//! with open/close.
//!
//! Two acquisition modes:
//! - [`DeviceCoordinator::with_device`] blocks until the device is free
//!   (admin-triggered enrollment, caller is willing to wait).
//! - [`DeviceCoordinator::try_with_device`] fails immediately with
//!   [`PresenciaError::DeviceBusy`] when a capture is in flight (walk-up
//!   identification, the front-end rejects the second trigger rather than
//!   queue it). Acquisition never suspends on this path.
//!
//! Invariant: the device ends every operation closed, on every exit path.
//! A left-open handle starves all subsequent callers.

use std::sync::{Mutex, PoisonError, TryLockError};

use crate::device::CaptureDevice;
use crate::types::PresenciaError;

/// Owned resource guard for the single capture device.
///
/// Injected into every component that touches hardware; the mutex is the
/// only ordering mechanism for capture operations.
pub struct DeviceCoordinator<D: CaptureDevice> {
    device: Mutex<D>,
}

impl<D: CaptureDevice> std::fmt::Debug for DeviceCoordinator<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceCoordinator")
            .field("busy", &self.device.try_lock().is_err())
            .finish_non_exhaustive()
    }
}

impl<D: CaptureDevice> DeviceCoordinator<D> {
    /// Take exclusive ownership of the device.
    #[must_use]
    pub fn new(device: D) -> Self {
        Self {
            device: Mutex::new(device),
        }
    }

    /// Blocking acquisition: wait for the device, then run `op` bracketed by
    /// open/close.
    pub fn with_device<T>(
        &self,
        op: impl FnOnce(&mut D) -> Result<T, PresenciaError>,
    ) -> Result<T, PresenciaError> {
        let mut guard = self.device.lock().unwrap_or_else(PoisonError::into_inner);
        Self::bracketed(&mut guard, op)
    }

    /// Non-blocking acquisition: fail fast with [`PresenciaError::DeviceBusy`]
    /// if another capture holds the guard.
    pub fn try_with_device<T>(
        &self,
        op: impl FnOnce(&mut D) -> Result<T, PresenciaError>,
    ) -> Result<T, PresenciaError> {
        let mut guard = match self.device.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return Err(PresenciaError::DeviceBusy),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };
        Self::bracketed(&mut guard, op)
    }

    /// Enumerate check, open, run, close. `close` runs unconditionally; an
    /// operation error takes precedence over a close error when both occur.
    fn bracketed<T>(
        device: &mut D,
        op: impl FnOnce(&mut D) -> Result<T, PresenciaError>,
    ) -> Result<T, PresenciaError> {
        if !device.is_present() {
            return Err(PresenciaError::HardwareUnavailable);
        }

        device.open()?;
        let result = op(device);
        let closed = device.close();

        let value = result?;
        closed?;
        Ok(value)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::types::{CaptureMatch, PersonId, Template};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Scripted device recording open/close transitions.
    struct ScriptedDevice {
        present: bool,
        opened: bool,
        open_count: Arc<AtomicU32>,
        close_count: Arc<AtomicU32>,
        fail_capture: bool,
    }

    impl ScriptedDevice {
        fn new() -> Self {
            Self {
                present: true,
                opened: false,
                open_count: Arc::new(AtomicU32::new(0)),
                close_count: Arc::new(AtomicU32::new(0)),
                fail_capture: false,
            }
        }
    }

    impl CaptureDevice for ScriptedDevice {
        fn is_present(&self) -> bool {
            self.present
        }

        fn open(&mut self) -> Result<(), PresenciaError> {
            self.opened = true;
            self.open_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn close(&mut self) -> Result<(), PresenciaError> {
            self.opened = false;
            self.close_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn enroll_capture(&mut self) -> Result<Template, PresenciaError> {
            if self.fail_capture {
                return Err(PresenciaError::CaptureFailed("finger removed".to_string()));
            }
            Ok(Template::new(vec![0xAB]))
        }

        fn identify_capture(
            &mut self,
            _candidates: &[(PersonId, Template)],
        ) -> Result<Option<CaptureMatch>, PresenciaError> {
            Ok(None)
        }
    }

    #[test]
    fn operation_runs_between_open_and_close() {
        let device = ScriptedDevice::new();
        let opens = Arc::clone(&device.open_count);
        let closes = Arc::clone(&device.close_count);
        let coordinator = DeviceCoordinator::new(device);

        let template = coordinator
            .with_device(|d| d.enroll_capture())
            .expect("capture");
        assert_eq!(template.as_bytes(), &[0xAB]);
        assert_eq!(opens.load(Ordering::SeqCst), 1);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn device_closed_even_when_operation_fails() {
        let mut device = ScriptedDevice::new();
        device.fail_capture = true;
        let closes = Arc::clone(&device.close_count);
        let coordinator = DeviceCoordinator::new(device);

        let result = coordinator.with_device(|d| d.enroll_capture());
        assert!(matches!(result, Err(PresenciaError::CaptureFailed(_))));
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn missing_hardware_reported_without_open() {
        let mut device = ScriptedDevice::new();
        device.present = false;
        let opens = Arc::clone(&device.open_count);
        let coordinator = DeviceCoordinator::new(device);

        let result = coordinator.with_device(|d| d.enroll_capture());
        assert!(matches!(result, Err(PresenciaError::HardwareUnavailable)));
        assert_eq!(opens.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn try_acquire_fails_fast_while_capture_in_flight() {
        let device = ScriptedDevice::new();
        let opens = Arc::clone(&device.open_count);
        let coordinator = Arc::new(DeviceCoordinator::new(device));

        let (started_tx, started_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();

        let holder = Arc::clone(&coordinator);
        let worker = std::thread::spawn(move || {
            holder.with_device(|d| {
                started_tx.send(()).expect("signal");
                release_rx.recv().expect("release");
                d.enroll_capture()
            })
        });

        started_rx.recv().expect("started");
        let contended = coordinator.try_with_device(|d| d.enroll_capture());
        assert!(matches!(contended, Err(PresenciaError::DeviceBusy)));
        // The second caller must not have re-opened the device.
        assert_eq!(opens.load(Ordering::SeqCst), 1);

        release_tx.send(()).expect("release");
        worker.join().expect("join").expect("capture");
    }

    #[test]
    fn try_acquire_succeeds_when_idle() {
        let coordinator = DeviceCoordinator::new(ScriptedDevice::new());
        let result = coordinator.try_with_device(|d| d.enroll_capture());
        assert!(result.is_ok());
    }
}
