//! Station service: boot, capture, teardown.
//!
//! [`StationService`] runs the station's one-shot flow on top of the
//! ports.  It holds no hardware itself; the store, orchestrator and event
//! sink are passed in, so the whole flow runs against simulated backends
//! in tests.
//!
//! ```text
//!  EEPROM ──▶ boot() ──▶ SystemOk
//!                          │
//!  library init ──▶ bring_up ──▶ PlaceFinger ──▶ scan ──▶ ImageCaptured
//!        │              │                          │
//!        └──────────────┴──── teardown (always) ◀──┘
//! ```

use core::fmt;

use log::{error, info, warn};

use crate::config::StationConfig;
use crate::error::{DeviceError, StoreError};
use crate::storage::{ParameterArray, ReadPolicy, SettingsStore, VariableStore};

use super::bringup::{BringUpError, BringUpStep, Orchestrator};
use super::device::{PreviewAction, ScanPreview, ScanRequest, ScanStatus};
use super::events::AppEvent;
use super::ports::{ConfigPort, DeviceTransport, EepromEmulation, EventSink, SensorDriver};

/// Everything loaded from persistent storage at boot.
pub struct Boot<E, const N: usize> {
    pub store: VariableStore<E, N>,
    pub params: ParameterArray<N>,
    pub config: StationConfig,
}

/// Result of one capture attempt that reached the scan.
#[derive(Debug)]
pub struct Capture {
    pub status: ScanStatus,
    /// `width × height` grayscale bytes; meaningful only when `status` is `Ok`.
    pub image: Vec<u8>,
    /// Preview frames whose finger-detect score exceeded the threshold.
    pub finger_detections: u32,
}

/// Why a capture run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationError {
    Initialize(DeviceError),
    BringUp(BringUpError),
    /// The image buffer could not be allocated.
    Image(DeviceError),
    Scan(DeviceError),
}

impl StationError {
    pub fn device_error(&self) -> DeviceError {
        match *self {
            Self::Initialize(e) | Self::Image(e) | Self::Scan(e) => e,
            Self::BringUp(e) => e.cause,
        }
    }

    pub fn step(&self) -> Option<BringUpStep> {
        match self {
            Self::BringUp(e) => Some(e.step),
            _ => None,
        }
    }
}

impl fmt::Display for StationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initialize(e) => write!(f, "library initialise failed: {}", e),
            Self::BringUp(e) => write!(f, "bring-up: {}", e),
            Self::Image(e) => write!(f, "image buffer: {}", e),
            Self::Scan(e) => write!(f, "scan failed: {}", e),
        }
    }
}

impl std::error::Error for StationError {}

pub struct StationService {
    config: StationConfig,
}

impl StationService {
    pub fn new(config: StationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StationConfig {
        &self.config
    }

    /// Load settings and parameters from the emulated EEPROM.
    ///
    /// Settings are read first so their read policy governs the bulk read.
    /// Unreadable or invalid settings fall back to defaults.
    pub fn boot<E: EepromEmulation, const N: usize>(
        eeprom: E,
        sink: &mut impl EventSink,
    ) -> Result<Boot<E, N>, StoreError> {
        let mut store = VariableStore::new(eeprom, ReadPolicy::default());

        let config = match SettingsStore::new(&mut store).load() {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("StationService: settings unusable ({}), using defaults", e);
                StationConfig::default()
            }
        };
        store.set_policy(config.read_policy);

        let mut params = ParameterArray::zeroed();
        let summary = store.read_all(&mut params)?;
        info!(
            "StationService: {} parameters read, {} unwritten, {} skipped",
            summary.read, summary.unwritten, summary.skipped
        );
        sink.emit(&AppEvent::SystemOk {
            parameters_read: summary.read,
            parameters_skipped: summary.skipped,
        });

        Ok(Boot { store, params, config })
    }

    /// Initialise the library, bring the sensor up, capture one image, and
    /// tear everything down again.
    ///
    /// Teardown always runs: the handle is destroyed if one is held, and
    /// the library is terminated only if it was initialised.
    pub fn run_capture<D, T>(
        &self,
        orch: &mut Orchestrator<D, T>,
        sink: &mut impl EventSink,
    ) -> Result<Capture, StationError>
    where
        D: SensorDriver<T>,
        T: DeviceTransport,
    {
        if let Err(e) = orch.driver_mut().initialize() {
            error!("StationService: library initialise failed: {}", e);
            sink.emit(&AppEvent::Failed { step: None, error: e });
            return Err(StationError::Initialize(e));
        }

        let result = self.capture(orch, sink);

        if let Err(e) = orch.destroy(sink) {
            warn!("StationService: destroy during teardown: {}", e);
        }
        if let Err(e) = orch.driver_mut().terminate() {
            warn!("StationService: terminate during teardown: {}", e);
        }

        if let Err(e) = &result {
            error!("StationService: {}", e);
            sink.emit(&AppEvent::Failed { step: e.step(), error: e.device_error() });
        }
        result
    }

    fn capture<D, T>(
        &self,
        orch: &mut Orchestrator<D, T>,
        sink: &mut impl EventSink,
    ) -> Result<Capture, StationError>
    where
        D: SensorDriver<T>,
        T: DeviceTransport,
    {
        let info = orch.bring_up(sink).map_err(StationError::BringUp)?;
        let format = info.format_info.format;
        let len = info.format_info.image_len();

        let mut image = Vec::new();
        image
            .try_reserve_exact(len)
            .map_err(|_| StationError::Image(DeviceError::OutOfMemory))?;
        image.resize(len, 0);

        sink.emit(&AppEvent::PlaceFinger);

        let threshold = self.config.finger_detect_threshold;
        let mut detections = 0u32;
        let status = {
            let mut preview = |p: &ScanPreview| {
                if p.finger_detect_value > threshold {
                    detections += 1;
                    sink.emit(&AppEvent::FingerDetected(p.finger_detect_value));
                }
                PreviewAction::Continue
            };
            let mut request = ScanRequest {
                format,
                timeout_ms: self.config.scan_timeout_ms,
                flags: 0,
                image: &mut image,
                preview: Some(&mut preview),
            };
            orch.scan(&mut request).map_err(StationError::Scan)?
        };

        if status == ScanStatus::Ok {
            info!("StationService: image captured ({} bytes)", image.len());
            sink.emit(&AppEvent::ImageCaptured { bytes: image.len() });
        } else {
            warn!("StationService: scan finished without image: {:?}", status);
            sink.emit(&AppEvent::ScanIncomplete(status));
        }

        Ok(Capture { status, image, finger_detections: detections })
    }
}
