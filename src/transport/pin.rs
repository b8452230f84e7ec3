//! Pin values and awake-line polarity.

use serde::{Deserialize, Serialize};

/// Logic level as exchanged with the sensor library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum PinValue {
    /// Sentinel; never a valid level to drive.
    Unknown = 0,
    Low = 1,
    High = 2,
}

impl PinValue {
    /// Decode a raw library value.  Unrecognised values map to `Unknown`.
    pub const fn from_raw(raw: i32) -> Self {
        match raw {
            1 => Self::Low,
            2 => Self::High,
            _ => Self::Unknown,
        }
    }

    pub const fn from_level(high: bool) -> Self {
        if high { Self::High } else { Self::Low }
    }
}

/// Which electrical level on the awake line means "device awake".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AwakePolarity {
    #[default]
    ActiveHigh,
    ActiveLow,
}

impl AwakePolarity {
    /// Translate a raw electrical level into the polarity-independent
    /// value: `High` means awake regardless of wiring.
    pub const fn normalize(self, level_high: bool) -> PinValue {
        match self {
            Self::ActiveHigh => PinValue::from_level(level_high),
            Self::ActiveLow => PinValue::from_level(!level_high),
        }
    }
}
