//! Sensor bring-up orchestrator.
//!
//! Connects the transport to the sensor library, queries the device, and
//! hands back a ready handle.  The handle is held in an `Option` owned by
//! the orchestrator: once connect succeeds, every exit path (a failed
//! query, an explicit [`Orchestrator::destroy`], or drop) releases it
//! exactly once.
//!
//! ```text
//!                 connect ok            queries ok
//!  Disconnected ─────────────▶ Connected ──────────▶ Ready
//!       │                          │                  │
//!       │ connect failed           │ query failed     │
//!       ▼                          ▼ (handle released)│
//!     Failed ◀─────────────────────┘                  │
//!       │                                             │
//!       └──────────── destroy ──▶ Disconnected ◀──────┘
//! ```

use core::fmt;

use heapless::{String, Vec};
use log::{debug, error, info, warn};

use crate::error::DeviceError;

use super::device::{
    DeviceInfo, MAX_SCAN_FORMATS, SERIAL_NUMBER_CAPACITY, ScanFormat, ScanRequest, ScanStatus,
};
use super::events::AppEvent;
use super::ports::{DeviceTransport, EventSink, SensorDriver};

/// Connection state of the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BringUpState {
    Disconnected,
    /// Handle obtained, queries pending.
    Connected,
    Ready,
    /// Bring-up aborted.  No handle is held.
    Failed,
}

/// The bring-up step that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BringUpStep {
    Connect,
    FirmwareVersion,
    SerialNumber,
    ScanFormats,
    ScanFormatInfo,
}

impl BringUpStep {
    pub const ALL: [Self; 5] = [
        Self::Connect,
        Self::FirmwareVersion,
        Self::SerialNumber,
        Self::ScanFormats,
        Self::ScanFormatInfo,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::FirmwareVersion => "firmware version",
            Self::SerialNumber => "serial number",
            Self::ScanFormats => "scan formats",
            Self::ScanFormatInfo => "scan format info",
        }
    }
}

/// Bring-up failure: which step, and the library status it returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BringUpError {
    pub step: BringUpStep,
    pub cause: DeviceError,
}

impl fmt::Display for BringUpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.step.name(), self.cause)
    }
}

impl std::error::Error for BringUpError {}

/// Owns the sensor driver, the transport lent to it, and the device handle.
pub struct Orchestrator<D, T>
where
    D: SensorDriver<T>,
    T: DeviceTransport,
{
    driver: D,
    transport: T,
    handle: Option<D::Handle>,
    info: Option<DeviceInfo>,
    state: BringUpState,
    connect_flags: u32,
}

impl<D, T> Orchestrator<D, T>
where
    D: SensorDriver<T>,
    T: DeviceTransport,
{
    pub fn new(driver: D, transport: T) -> Self {
        Self {
            driver,
            transport,
            handle: None,
            info: None,
            state: BringUpState::Disconnected,
            connect_flags: 0,
        }
    }

    pub fn with_connect_flags(mut self, flags: u32) -> Self {
        self.connect_flags = flags;
        self
    }

    /// Connect and query the device.
    ///
    /// Allowed from `Disconnected` or `Failed`.  On any failure after
    /// connect the handle is destroyed before this returns.
    pub fn bring_up(&mut self, sink: &mut impl EventSink) -> Result<&DeviceInfo, BringUpError> {
        if self.handle.is_some() {
            return Err(BringUpError {
                step: BringUpStep::Connect,
                cause: DeviceError::InvalidOperation,
            });
        }

        info!("Orchestrator: connecting (flags=0x{:08X})", self.connect_flags);
        let handle = match self.driver.connect(&mut self.transport, self.connect_flags) {
            Ok(h) => h,
            Err(cause) => {
                error!("Orchestrator: connect failed: {}", cause);
                set_state(&mut self.state, BringUpState::Failed, sink);
                return Err(BringUpError { step: BringUpStep::Connect, cause });
            }
        };
        let handle = self.handle.insert(handle);
        set_state(&mut self.state, BringUpState::Connected, sink);

        match query_device(&mut self.driver, &mut self.transport, handle) {
            Ok(info) => {
                info!(
                    "Orchestrator: ready (fw {}, serial {}, {}x{})",
                    info.firmware, info.serial_number, info.format_info.width, info.format_info.height
                );
                sink.emit(&AppEvent::DeviceReady(info.clone()));
                set_state(&mut self.state, BringUpState::Ready, sink);
                Ok(self.info.insert(info))
            }
            Err(e) => {
                error!("Orchestrator: {}", e);
                // The query error is what the caller needs; destroy status is logged.
                let _ = self.release_handle();
                set_state(&mut self.state, BringUpState::Failed, sink);
                Err(e)
            }
        }
    }

    /// Destroy the handle if one is held and return to `Disconnected`.
    /// A no-op when nothing is held.
    pub fn destroy(&mut self, sink: &mut impl EventSink) -> Result<(), DeviceError> {
        let result = self.release_handle();
        set_state(&mut self.state, BringUpState::Disconnected, sink);
        result
    }

    /// Run an extended scan on the ready device.
    pub fn scan(&mut self, request: &mut ScanRequest<'_>) -> Result<ScanStatus, DeviceError> {
        let handle = match (self.state, self.handle.as_mut()) {
            (BringUpState::Ready, Some(h)) => h,
            _ => return Err(DeviceError::InvalidOperation),
        };
        self.driver.scan(handle, &mut self.transport, request)
    }

    pub fn state(&self) -> BringUpState {
        self.state
    }

    pub fn info(&self) -> Option<&DeviceInfo> {
        self.info.as_ref()
    }

    pub fn has_handle(&self) -> bool {
        self.handle.is_some()
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn release_handle(&mut self) -> Result<(), DeviceError> {
        self.info = None;
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        let result = self.driver.destroy(handle, &mut self.transport);
        match result {
            Ok(()) => debug!("Orchestrator: handle destroyed"),
            Err(e) => warn!("Orchestrator: destroy reported {}", e),
        }
        result
    }
}

fn set_state(state: &mut BringUpState, to: BringUpState, sink: &mut impl EventSink) {
    let from = *state;
    if from == to {
        return;
    }
    info!("Orchestrator: {:?} -> {:?}", from, to);
    *state = to;
    sink.emit(&AppEvent::StateChanged { from, to });
}

impl<D, T> Drop for Orchestrator<D, T>
where
    D: SensorDriver<T>,
    T: DeviceTransport,
{
    fn drop(&mut self) {
        if self.handle.is_some() {
            warn!("Orchestrator: dropped while connected, destroying handle");
            // Nothing left to report the status to.
            let _ = self.release_handle();
        }
    }
}

/// Firmware, serial, formats, then info for the first format.
fn query_device<D, T>(
    driver: &mut D,
    transport: &mut T,
    handle: &mut D::Handle,
) -> Result<DeviceInfo, BringUpError>
where
    D: SensorDriver<T>,
    T: DeviceTransport,
{
    let at = |step| move |cause| BringUpError { step, cause };

    let firmware = driver
        .firmware_version(handle, transport)
        .map_err(at(BringUpStep::FirmwareVersion))?;

    let mut serial_buf = [0u8; SERIAL_NUMBER_CAPACITY];
    let len = driver
        .serial_number(handle, transport, &mut serial_buf)
        .map_err(at(BringUpStep::SerialNumber))?;
    let serial_number = decode_serial(&serial_buf[..len.min(serial_buf.len())])
        .map_err(at(BringUpStep::SerialNumber))?;

    let mut format_buf = [ScanFormat::Full12x17; MAX_SCAN_FORMATS];
    let count = driver
        .supported_scan_formats(handle, transport, &mut format_buf)
        .map_err(at(BringUpStep::ScanFormats))?;
    let scan_formats: Vec<ScanFormat, MAX_SCAN_FORMATS> =
        format_buf.iter().copied().take(count).collect();

    let first = scan_formats
        .first()
        .copied()
        .ok_or(DeviceError::NotSupported)
        .map_err(at(BringUpStep::ScanFormatInfo))?;
    let format_info = driver
        .scan_format_info(handle, transport, first)
        .map_err(at(BringUpStep::ScanFormatInfo))?;

    Ok(DeviceInfo { firmware, serial_number, scan_formats, format_info })
}

/// NUL-terminated ASCII from the library.
fn decode_serial(raw: &[u8]) -> Result<String<SERIAL_NUMBER_CAPACITY>, DeviceError> {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    let text = core::str::from_utf8(&raw[..end]).map_err(|_| DeviceError::Format)?;
    String::try_from(text).map_err(|_| DeviceError::InsufficientBuffer)
}
