//! Station configuration parameters
//!
//! Tunables for the sensor transport and the capture flow.  Values can be
//! overridden from the `SETTINGS` parameter group of the emulated EEPROM.

use serde::{Deserialize, Serialize};

use crate::app::device::{DEFAULT_FINGER_DETECT_THRESHOLD, SCAN_TIMEOUT_INFINITE};
use crate::app::ports::ConfigError;
use crate::storage::ReadPolicy;
use crate::transport::{AwakePolarity, EXCHANGE_TIMEOUT_MS};

/// Core station configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationConfig {
    // --- Parameter store ---
    /// Behaviour of bulk reads when one slot fails
    pub read_policy: ReadPolicy,

    // --- Transport ---
    /// Upper bound for one SPI exchange (milliseconds)
    pub exchange_timeout_ms: u32,
    /// Logic level of the awake line that means "device awake"
    pub awake_polarity: AwakePolarity,
    /// Core clock feeding the cycle counter (Hz)
    pub core_clock_hz: u32,

    // --- Sensor ---
    /// Flags passed to the library's connect call
    pub connect_flags: u32,
    /// Scan timeout (milliseconds), -1 waits forever
    pub scan_timeout_ms: i32,
    /// Finger-detect score treated as "finger present" (0-100)
    pub finger_detect_threshold: i32,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            read_policy: ReadPolicy::BestEffort,

            exchange_timeout_ms: EXCHANGE_TIMEOUT_MS,
            awake_polarity: AwakePolarity::ActiveHigh,
            core_clock_hz: 100_000_000, // PLL from HSI, 100 MHz

            connect_flags: 0,
            scan_timeout_ms: SCAN_TIMEOUT_INFINITE,
            finger_detect_threshold: DEFAULT_FINGER_DETECT_THRESHOLD,
        }
    }
}

/// Range-check every field.  Invalid values are rejected, never clamped.
pub fn validate_config(cfg: &StationConfig) -> Result<(), ConfigError> {
    if !(1..=1000).contains(&cfg.exchange_timeout_ms) {
        return Err(ConfigError::ValidationFailed(
            "exchange_timeout_ms must be 1–1000",
        ));
    }
    if !(1_000_000..=480_000_000).contains(&cfg.core_clock_hz) {
        return Err(ConfigError::ValidationFailed(
            "core_clock_hz must be 1–480 MHz",
        ));
    }
    if cfg.scan_timeout_ms < SCAN_TIMEOUT_INFINITE {
        return Err(ConfigError::ValidationFailed(
            "scan_timeout_ms must be -1 or non-negative",
        ));
    }
    if !(0..=100).contains(&cfg.finger_detect_threshold) {
        return Err(ConfigError::ValidationFailed(
            "finger_detect_threshold must be 0–100",
        ));
    }
    Ok(())
}
