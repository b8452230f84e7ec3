//! Port traits: the hexagonal boundary between station logic and the outside world.
//!
//! ```text
//!   EEPROM emulation ──▶ EepromEmulation ──▶ VariableStore
//!   GPIO / SPI / tick ──▶ DeviceTransport ──▶ SensorDriver ──▶ Orchestrator
//!                                              StationService ──▶ EventSink
//! ```
//!
//! Driven adapters (emulated EEPROM, the SPI transport, the vendor sensor
//! library, log output) implement these traits.  The core consumes them via
//! generics, so nothing above this line touches registers directly.

use crate::config::StationConfig;
use crate::error::{DeviceError, EmulationError};
use crate::storage::VirtAddr;
use crate::transport::PinValue;

use super::device::{FirmwareVersion, ScanFormat, ScanFormatInfo, ScanRequest, ScanStatus};
use super::events::AppEvent;

// ───────────────────────────────────────────────────────────────
// Block-memory emulation (driven adapter: store ↔ flash)
// ───────────────────────────────────────────────────────────────

/// Address-indexed 16-bit variable storage on top of wear-limited flash.
///
/// Implementations own wear levelling and power-loss recovery; callers
/// treat each call as slow but reliable.
pub trait EepromEmulation {
    /// Read the last value written to `address`.
    fn read_variable(&mut self, address: VirtAddr) -> Result<u16, EmulationError>;

    /// Durably write `value` to `address`.
    fn write_variable(&mut self, address: VirtAddr, value: u16) -> Result<(), EmulationError>;
}

impl<E: EepromEmulation + ?Sized> EepromEmulation for &mut E {
    fn read_variable(&mut self, address: VirtAddr) -> Result<u16, EmulationError> {
        (**self).read_variable(address)
    }

    fn write_variable(&mut self, address: VirtAddr, value: u16) -> Result<(), EmulationError> {
        (**self).write_variable(address, value)
    }
}

// ───────────────────────────────────────────────────────────────
// Device transport (driven adapter: sensor library → hardware)
// ───────────────────────────────────────────────────────────────

/// The capability set the sensor library calls for all physical I/O.
///
/// None of these retry; every failure is reported once and the library
/// owns retry/backoff policy.  All calls run to completion on the calling
/// context and never yield.
pub trait DeviceTransport {
    /// Millisecond tick.  Never goes backward between calls.
    fn timestamp_ms(&mut self) -> u32;

    /// Busy-wait at least `us` microseconds.  Safe from interrupt context.
    fn delay_us(&mut self, us: u32);

    /// Awake line, already translated through the configured polarity:
    /// `High` always means "device awake".
    fn awake_pin(&mut self) -> Result<PinValue, DeviceError>;

    /// Drive the reset line.  `PinValue::Unknown` is rejected with
    /// [`DeviceError::InvalidArgument`] and leaves the pin untouched.
    fn set_reset_pin(&mut self, value: PinValue) -> Result<(), DeviceError>;

    /// One framed full-duplex transaction clocking `rx.len()` bytes.
    /// Chip-select is released before returning on every path.
    fn exchange(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<(), DeviceError>;

    /// Same framing as [`exchange`](Self::exchange) with one buffer for
    /// both directions: `buf` holds the outgoing bytes and is overwritten
    /// with the reply.
    fn exchange_in_place(&mut self, buf: &mut [u8]) -> Result<(), DeviceError>;
}

impl<T: DeviceTransport + ?Sized> DeviceTransport for &mut T {
    fn timestamp_ms(&mut self) -> u32 {
        (**self).timestamp_ms()
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us);
    }

    fn awake_pin(&mut self) -> Result<PinValue, DeviceError> {
        (**self).awake_pin()
    }

    fn set_reset_pin(&mut self, value: PinValue) -> Result<(), DeviceError> {
        (**self).set_reset_pin(value)
    }

    fn exchange(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<(), DeviceError> {
        (**self).exchange(tx, rx)
    }

    fn exchange_in_place(&mut self, buf: &mut [u8]) -> Result<(), DeviceError> {
        (**self).exchange_in_place(buf)
    }
}

// ───────────────────────────────────────────────────────────────
// Sensor driver (consumed: the closed vendor library)
// ───────────────────────────────────────────────────────────────

/// Connect/query/scan/destroy contract of the external sensor library.
///
/// The transport is lent to every call rather than stored: the library
/// may only touch it while one of these methods is running, and never
/// after [`destroy`](Self::destroy).
pub trait SensorDriver<T: DeviceTransport> {
    /// Opaque device handle.  Not `Clone`: each handle is destroyed once.
    type Handle;

    /// Library-wide initialisation, once per boot.
    fn initialize(&mut self) -> Result<(), DeviceError>;

    /// Undo [`initialize`](Self::initialize).
    fn terminate(&mut self) -> Result<(), DeviceError>;

    fn connect(&mut self, transport: &mut T, flags: u32) -> Result<Self::Handle, DeviceError>;

    fn destroy(&mut self, handle: Self::Handle, transport: &mut T) -> Result<(), DeviceError>;

    fn firmware_version(
        &mut self,
        handle: &mut Self::Handle,
        transport: &mut T,
    ) -> Result<FirmwareVersion, DeviceError>;

    /// Copy the serial number into `buf` and return its length.
    ///
    /// Query-twice contract: with a too-small (or empty) buffer this fails
    /// with [`DeviceError::InsufficientBuffer`] and nothing is written.
    fn serial_number(
        &mut self,
        handle: &mut Self::Handle,
        transport: &mut T,
        buf: &mut [u8],
    ) -> Result<usize, DeviceError>;

    /// Fill `out` with up to `out.len()` supported formats; returns how many
    /// were written.
    fn supported_scan_formats(
        &mut self,
        handle: &mut Self::Handle,
        transport: &mut T,
        out: &mut [ScanFormat],
    ) -> Result<usize, DeviceError>;

    fn scan_format_info(
        &mut self,
        handle: &mut Self::Handle,
        transport: &mut T,
        format: ScanFormat,
    ) -> Result<ScanFormatInfo, DeviceError>;

    /// Extended scan with optional preview callback.  Blocks until an image
    /// is captured, the timeout elapses, or the preview cancels.
    fn scan(
        &mut self,
        handle: &mut Self::Handle,
        transport: &mut T,
        request: &mut ScanRequest<'_>,
    ) -> Result<ScanStatus, DeviceError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: core → log / display)
// ───────────────────────────────────────────────────────────────

/// The core emits structured [`AppEvent`]s through this port.  Adapters
/// decide where they go (serial log, status display).
pub trait EventSink {
    fn emit(&mut self, event: &AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: core ↔ persisted settings)
// ───────────────────────────────────────────────────────────────

/// Loads and persists station configuration.
///
/// Implementations MUST validate before persisting and reject invalid
/// ranges with [`ConfigError::ValidationFailed`] rather than clamping.
pub trait ConfigPort {
    /// Returns [`StationConfig::default()`] if nothing has been stored.
    fn load(&mut self) -> Result<StationConfig, ConfigError>;

    fn save(&mut self, config: &StationConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored settings failed integrity / deserialization check.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Encoded settings do not fit the reserved words.
    TooLarge,
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::TooLarge => write!(f, "config too large"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for ConfigError {}
