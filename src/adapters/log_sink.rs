//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing one tagged line per application
//! event to the logger (UART on the board, stderr under `host-sim`).
//! The tags mirror the messages the status display shows.

use log::{error, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink {
    emitted: usize,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events written so far.
    pub fn emitted(&self) -> usize {
        self.emitted
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        self.emitted += 1;
        match event {
            AppEvent::SystemOk { parameters_read, parameters_skipped } => {
                info!("SYSTEM | OK | params read={} skipped={}", parameters_read, parameters_skipped);
            }
            AppEvent::StateChanged { from, to } => {
                info!("STATE | {:?} -> {:?}", from, to);
            }
            AppEvent::DeviceReady(dev) => {
                info!(
                    "DEVICE | fw={} serial={} formats={:?} | {}x{} @ {}dpi",
                    dev.firmware,
                    dev.serial_number,
                    dev.scan_formats.as_slice(),
                    dev.format_info.width,
                    dev.format_info.height,
                    dev.format_info.horizontal_dpi,
                );
            }
            AppEvent::PlaceFinger => {
                info!("SCAN | Put finger on");
            }
            AppEvent::FingerDetected(score) => {
                info!("SCAN | finger detected (score={})", score);
            }
            AppEvent::ImageCaptured { bytes } => {
                info!("SCAN | Image captured ({} bytes)", bytes);
            }
            AppEvent::ScanIncomplete(status) => {
                warn!("SCAN | no image: {:?}", status);
            }
            AppEvent::Failed { step: Some(step), error: e } => {
                error!("FAIL | {}: {}", step.name(), e);
            }
            AppEvent::Failed { step: None, error: e } => {
                error!("FAIL | {}", e);
            }
        }
    }
}
