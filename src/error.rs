//! Status taxonomy for the fingerprint station firmware.
//!
//! The vendor sensor library speaks in signed integer status codes where
//! `0` means success and every other value is a distinct failure kind.
//! [`DeviceError`] is that closed set of non-zero codes.  The variable store
//! and the block-memory emulation driver carry their own small enums.
//! All variants are `Copy` so they can be passed back through callback
//! trampolines without allocation.

use core::fmt;

/// Raw status value for a successful vendor call.
pub const STATUS_OK: i32 = 0;

// ---------------------------------------------------------------------------
// Vendor / transport status codes
// ---------------------------------------------------------------------------

/// Every non-success status the sensor library or the transport adapter
/// can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceError {
    /// Catch-all failure, also used for a failed bus transfer.
    Failed,
    /// Argument is invalid (e.g. an unknown pin value).
    InvalidArgument,
    /// A required pointer argument was null.
    ArgumentNull,
    ArgumentOutOfRange,
    InvalidEnumArgument,
    /// Caller buffer too small; call again with the reported size.
    InsufficientBuffer,
    IndexOutOfRange,
    Format,
    Memory,
    OutOfMemory,
    /// Operation unavailable on the current transport kind.
    NotSupported,
    NotImplemented,
    InvalidOperation,
    OperationCanceled,
    /// A bounded operation exceeded its deadline.
    Timeout,
    /// Generic I/O error (pin access, bus ownership).
    Io,
    DeviceBusy,
    DeviceNotActive,
    SensorFailed,
    CommunicationFailed,
    /// A code not known to this firmware revision.  `Unknown(0)` encodes
    /// as [`Failed`](Self::Failed), never as success.
    Unknown(i32),
}

impl DeviceError {
    /// Numeric status code as defined by the vendor library.
    pub const fn code(self) -> i32 {
        match self {
            Self::Failed => -100,
            Self::InvalidArgument => -200,
            Self::ArgumentNull => -201,
            Self::ArgumentOutOfRange => -202,
            Self::InvalidEnumArgument => -203,
            Self::InsufficientBuffer => -204,
            Self::IndexOutOfRange => -205,
            Self::Format => -300,
            Self::Memory => -400,
            Self::OutOfMemory => -401,
            Self::NotSupported => -601,
            Self::NotImplemented => -602,
            Self::InvalidOperation => -603,
            Self::OperationCanceled => -604,
            Self::Timeout => -605,
            Self::Io => -700,
            Self::DeviceBusy => -701,
            Self::DeviceNotActive => -702,
            Self::SensorFailed => -703,
            Self::CommunicationFailed => -709,
            // A zero status would read as success.
            Self::Unknown(STATUS_OK) => Self::Failed.code(),
            Self::Unknown(code) => code,
        }
    }

    /// Decode a raw status.  `0` is success; anything else is an error.
    pub const fn check(code: i32) -> Result<(), Self> {
        let err = match code {
            STATUS_OK => return Ok(()),
            -100 => Self::Failed,
            -200 => Self::InvalidArgument,
            -201 => Self::ArgumentNull,
            -202 => Self::ArgumentOutOfRange,
            -203 => Self::InvalidEnumArgument,
            -204 => Self::InsufficientBuffer,
            -205 => Self::IndexOutOfRange,
            -300 => Self::Format,
            -400 => Self::Memory,
            -401 => Self::OutOfMemory,
            -601 => Self::NotSupported,
            -602 => Self::NotImplemented,
            -603 => Self::InvalidOperation,
            -604 => Self::OperationCanceled,
            -605 => Self::Timeout,
            -700 => Self::Io,
            -701 => Self::DeviceBusy,
            -702 => Self::DeviceNotActive,
            -703 => Self::SensorFailed,
            -709 => Self::CommunicationFailed,
            other => Self::Unknown(other),
        };
        Err(err)
    }

    /// Short human-readable description, shown on the status display.
    pub const fn message(self) -> &'static str {
        match self {
            Self::Failed => "Operation failed",
            Self::InvalidArgument => "Argument is invalid",
            Self::ArgumentNull => "Argument is NULL",
            Self::ArgumentOutOfRange => "Argument is out of range",
            Self::InvalidEnumArgument => "Invalid enumeration value",
            Self::InsufficientBuffer => "Allocated buffer is insufficient",
            Self::IndexOutOfRange => "Index was out of range",
            Self::Format => "Argument format is invalid",
            Self::Memory => "Memory error occurred",
            Self::OutOfMemory => "Out of memory",
            Self::NotSupported => "Operation is not supported",
            Self::NotImplemented => "Operation is not implemented",
            Self::InvalidOperation => "Invalid operation",
            Self::OperationCanceled => "Operation canceled",
            Self::Timeout => "Operation timeout",
            Self::Io => "I/O error occurred",
            Self::DeviceBusy => "Device is busy",
            Self::DeviceNotActive => "Device is not active",
            Self::SensorFailed => "Device sensor failed",
            Self::CommunicationFailed => "Communication failed",
            Self::Unknown(_) => "Unknown error",
        }
    }
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message(), self.code())
    }
}

/// Collapse a `Result` back into a raw vendor status code.
pub const fn status_of(result: Result<(), DeviceError>) -> i32 {
    match result {
        Ok(()) => STATUS_OK,
        Err(e) => e.code(),
    }
}

// ---------------------------------------------------------------------------
// Block-memory emulation driver status
// ---------------------------------------------------------------------------

/// Failure reported by the EEPROM emulation driver for a single variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmulationError {
    /// The virtual address has never been written.
    VariableNotFound,
    /// No valid (active) page was found; the emulation area is unformatted.
    NoValidPage,
    /// The active page is full and the page transfer failed.
    PageFull,
    /// The underlying flash program/erase operation failed.
    Flash,
}

impl fmt::Display for EmulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VariableNotFound => write!(f, "variable not found"),
            Self::NoValidPage => write!(f, "no valid page"),
            Self::PageFull => write!(f, "page full"),
            Self::Flash => write!(f, "flash operation failed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Variable store errors
// ---------------------------------------------------------------------------

/// Errors from [`VariableStore`](crate::storage::VariableStore) operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// More values were requested than the store has slots.
    CountExceedsCapacity { count: usize, capacity: usize },
    /// The source slice holds fewer values than the requested count.
    SourceTooShort { count: usize, available: usize },
    /// Aborting bulk read: a slot could not be read.
    Read { slot: usize, address: u16, cause: EmulationError },
    /// A slot could not be written.  Earlier slots of the same call were.
    Write { slot: usize, address: u16, cause: EmulationError },
    /// The parameter groups do not tile the address space exactly.
    InvalidLayout(&'static str),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CountExceedsCapacity { count, capacity } => {
                write!(f, "count {count} exceeds capacity {capacity}")
            }
            Self::SourceTooShort { count, available } => {
                write!(f, "count {count} but only {available} values supplied")
            }
            Self::Read { slot, address, cause } => {
                write!(f, "read slot {slot} (addr {address}): {cause}")
            }
            Self::Write { slot, address, cause } => {
                write!(f, "write slot {slot} (addr {address}): {cause}")
            }
            Self::InvalidLayout(msg) => write!(f, "invalid layout: {msg}"),
        }
    }
}

impl std::error::Error for DeviceError {}
impl std::error::Error for EmulationError {}
impl std::error::Error for StoreError {}
