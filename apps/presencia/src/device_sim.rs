//! # Simulated Capture Device
//!
//! A deterministic [`CaptureDevice`] for kiosks without a physical reader:
//! demos, CI, and the CLI one-shot commands. A "finger" is a byte blob
//! placed on a shared feed before triggering an operation; identification
//! matches candidates by exact bytes. This is a stand-in for the opaque
//! matching primitive, not a biometric algorithm.

use presencia_core::{CaptureDevice, CaptureMatch, PersonId, PresenciaError, Template};
use std::sync::{Arc, Mutex, PoisonError};

/// Handle for presenting a capture to the simulated device.
#[derive(Debug, Clone)]
pub struct CaptureFeed {
    slot: Arc<Mutex<Option<Vec<u8>>>>,
}

impl CaptureFeed {
    /// Place finger bytes for the next capture operation.
    pub fn place(&self, bytes: Vec<u8>) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(bytes);
    }

    fn take(&self) -> Option<Vec<u8>> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        slot.take()
    }
}

/// The simulated reader.
#[derive(Debug)]
pub struct SimulatedDevice {
    feed: CaptureFeed,
    opened: bool,
}

impl SimulatedDevice {
    /// Create a device plus the feed used to present captures to it.
    #[must_use]
    pub fn new() -> (Self, CaptureFeed) {
        let feed = CaptureFeed {
            slot: Arc::new(Mutex::new(None)),
        };
        (
            Self {
                feed: feed.clone(),
                opened: false,
            },
            feed,
        )
    }

    fn take_capture(&self) -> Result<Vec<u8>, PresenciaError> {
        if !self.opened {
            return Err(PresenciaError::CaptureFailed(
                "device is not open".to_string(),
            ));
        }
        self.feed
            .take()
            .ok_or_else(|| PresenciaError::CaptureFailed("no finger presented".to_string()))
    }
}

impl CaptureDevice for SimulatedDevice {
    fn is_present(&self) -> bool {
        true
    }

    fn open(&mut self) -> Result<(), PresenciaError> {
        self.opened = true;
        Ok(())
    }

    fn close(&mut self) -> Result<(), PresenciaError> {
        self.opened = false;
        Ok(())
    }

    fn enroll_capture(&mut self) -> Result<Template, PresenciaError> {
        Ok(Template::new(self.take_capture()?))
    }

    fn identify_capture(
        &mut self,
        candidates: &[(PersonId, Template)],
    ) -> Result<Option<CaptureMatch>, PresenciaError> {
        let capture = self.take_capture()?;
        Ok(candidates
            .iter()
            .find(|(_, template)| template.as_bytes() == capture.as_slice())
            .map(|(person, _)| CaptureMatch {
                person: person.clone(),
                score: 100,
            }))
    }
}
