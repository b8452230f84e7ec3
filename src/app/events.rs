//! Outbound application events.
//!
//! The [`StationService`](super::service::StationService) and the bring-up
//! [`Orchestrator`](super::bringup::Orchestrator) emit these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other side
//! decide what to do with them (log to serial, draw on the status display).

use crate::error::DeviceError;

use super::bringup::{BringUpState, BringUpStep};
use super::device::{DeviceInfo, ScanStatus};

/// Structured events emitted by the station core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Peripherals and parameters are up.
    SystemOk { parameters_read: usize, parameters_skipped: usize },

    /// The bring-up state machine moved.
    StateChanged { from: BringUpState, to: BringUpState },

    /// Bring-up completed; the device is ready to scan.
    DeviceReady(DeviceInfo),

    /// Waiting for the user to place a finger.
    PlaceFinger,

    /// The preview reported a finger-detect score above threshold.
    FingerDetected(i32),

    /// A scan finished with an image in the buffer.
    ImageCaptured { bytes: usize },

    /// A scan finished without an image.
    ScanIncomplete(ScanStatus),

    /// A step failed; the sequence was aborted and torn down.
    Failed { step: Option<BringUpStep>, error: DeviceError },
}
