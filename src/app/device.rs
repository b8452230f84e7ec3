//! Value types exchanged with the sensor library.

use core::fmt;

use heapless::{String, Vec};

/// Serial numbers are at most 24 characters plus the terminator.
pub const SERIAL_NUMBER_CAPACITY: usize = 25;

/// The station only ever asks for the first two supported formats.
pub const MAX_SCAN_FORMATS: usize = 2;

/// Finger-detect score above which a finger is considered present.
pub const DEFAULT_FINGER_DETECT_THRESHOLD: i32 = 40;

/// Scan timeout meaning "wait forever".
pub const SCAN_TIMEOUT_INFINITE: i32 = -1;

/// Sensor firmware version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FirmwareVersion {
    pub major: i32,
    pub minor: i32,
    pub build: i32,
    pub revision: i32,
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}.{}", self.major, self.minor, self.build, self.revision)
    }
}

/// Image formats the sensor can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ScanFormat {
    Full12x17 = 0,
    Full12x16 = 1,
    Partial = 2,
    Square12x12 = 3,
    Full12x17At500 = 4,
    Full12x16At500 = 5,
    PartialAt500 = 6,
    Square12x12At500 = 7,
    QuarterPartial = 8,
    QuarterPartialAt500 = 9,
}

impl ScanFormat {
    pub const fn from_raw(raw: i32) -> Option<Self> {
        Some(match raw {
            0 => Self::Full12x17,
            1 => Self::Full12x16,
            2 => Self::Partial,
            3 => Self::Square12x12,
            4 => Self::Full12x17At500,
            5 => Self::Full12x16At500,
            6 => Self::PartialAt500,
            7 => Self::Square12x12At500,
            8 => Self::QuarterPartial,
            9 => Self::QuarterPartialAt500,
            _ => return None,
        })
    }
}

/// How the image for a format is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ScanFormatType {
    Native = 0,
    Upscaled = 1,
    OpticalEquivalent = 2,
}

impl ScanFormatType {
    pub const fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(Self::Native),
            1 => Some(Self::Upscaled),
            2 => Some(Self::OpticalEquivalent),
            _ => None,
        }
    }
}

/// Geometry of one scan format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanFormatInfo {
    pub format: ScanFormat,
    pub format_type: ScanFormatType,
    /// Pixels.
    pub width: u32,
    /// Pixels.
    pub height: u32,
    /// Dots per inch.
    pub horizontal_dpi: u32,
    /// Dots per inch.
    pub vertical_dpi: u32,
}

impl ScanFormatInfo {
    /// Bytes needed for one 8-bit grayscale image.
    pub const fn image_len(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Outcome of a scan that the library completed without an error status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ScanStatus {
    None = 0,
    Ok = 1,
    Canceled = 2,
    Timeout = 3,
    NoFinger = 4,
    NotRemoved = 5,
    BadQuality = 6,
    BadSize = 7,
}

impl ScanStatus {
    pub const fn from_raw(raw: i32) -> Self {
        match raw {
            1 => Self::Ok,
            2 => Self::Canceled,
            3 => Self::Timeout,
            4 => Self::NoFinger,
            5 => Self::NotRemoved,
            6 => Self::BadQuality,
            7 => Self::BadSize,
            _ => Self::None,
        }
    }
}

/// Per-frame details delivered to a scan preview callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanPreview {
    pub finger_detect_value: i32,
    pub status: ScanStatus,
}

/// What the preview callback asks the library to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewAction {
    Continue,
    /// Cooperative cancel, honoured between transport calls.
    Cancel,
}

/// Parameters for an extended scan.
pub struct ScanRequest<'a> {
    pub format: ScanFormat,
    /// Milliseconds, or [`SCAN_TIMEOUT_INFINITE`].
    pub timeout_ms: i32,
    pub flags: u32,
    /// Receives the captured image; must hold at least `image_len()` bytes.
    pub image: &'a mut [u8],
    pub preview: Option<&'a mut dyn FnMut(&ScanPreview) -> PreviewAction>,
}

/// Everything learned about the sensor during bring-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub firmware: FirmwareVersion,
    pub serial_number: String<SERIAL_NUMBER_CAPACITY>,
    pub scan_formats: Vec<ScanFormat, MAX_SCAN_FORMATS>,
    /// Geometry of `scan_formats[0]`.
    pub format_info: ScanFormatInfo,
}
