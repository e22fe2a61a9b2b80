//! # Tracing Event Sink
//!
//! Routes engine progress events into the tracing subscriber configured by
//! `main`.

use presencia_core::{EventSink, KioskEvent};

/// Sink that logs every engine event at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn report(&self, event: KioskEvent) {
        tracing::info!(target: "presencia::kiosk", "{}", event);
    }
}
