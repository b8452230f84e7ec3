//! Simulated sensor library.
//!
//! Implements [`SensorDriver`] by driving the lent transport the way the
//! real library does: a reset pulse and an awake wait on connect, one
//! framed exchange per query, and a preview loop during scans.  Any call
//! can be made to fail with a chosen status, and handle bookkeeping is
//! exposed so tests can prove no handle leaks.

use std::collections::HashMap;

use log::debug;

use crate::app::bringup::BringUpStep;
use crate::app::device::{
    FirmwareVersion, PreviewAction, ScanFormat, ScanFormatInfo, ScanFormatType, ScanPreview,
    ScanRequest, ScanStatus,
};
use crate::app::ports::{DeviceTransport, SensorDriver};
use crate::error::DeviceError;
use crate::transport::PinValue;

/// Reset pulse width, microseconds.
const RESET_PULSE_US: u32 = 1_000;
/// Awake-line poll interval, microseconds.
const AWAKE_POLL_US: u32 = 100;
/// Give up waiting for the awake line after this long.
const AWAKE_TIMEOUT_MS: u32 = 200;
/// Bytes per command frame.
const FRAME_LEN: usize = 8;

/// Library entry points that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimCall {
    Initialize,
    Terminate,
    Connect,
    Destroy,
    FirmwareVersion,
    SerialNumber,
    ScanFormats,
    ScanFormatInfo,
    Scan,
}

impl From<BringUpStep> for SimCall {
    fn from(step: BringUpStep) -> Self {
        match step {
            BringUpStep::Connect => Self::Connect,
            BringUpStep::FirmwareVersion => Self::FirmwareVersion,
            BringUpStep::SerialNumber => Self::SerialNumber,
            BringUpStep::ScanFormats => Self::ScanFormats,
            BringUpStep::ScanFormatInfo => Self::ScanFormatInfo,
        }
    }
}

/// Opaque handle issued by [`SimSensor::connect`].
#[derive(Debug, PartialEq, Eq)]
pub struct SimHandle {
    id: u32,
}

impl SimHandle {
    pub fn id(&self) -> u32 {
        self.id
    }
}

pub struct SimSensor {
    faults: HashMap<SimCall, DeviceError>,
    initialized: bool,
    next_id: u32,
    live: Vec<u32>,
    destroyed: Vec<u32>,
    pub firmware: FirmwareVersion,
    pub serial: &'static str,
    pub formats: Vec<ScanFormat>,
    /// Finger-detect score reported by each preview frame, in order.
    pub preview_scores: Vec<i32>,
    /// Simulated time per preview frame, milliseconds.
    pub frame_ms: u32,
}

impl SimSensor {
    pub fn new() -> Self {
        Self {
            faults: HashMap::new(),
            initialized: false,
            next_id: 1,
            live: Vec::new(),
            destroyed: Vec::new(),
            firmware: FirmwareVersion { major: 2, minor: 1, build: 30, revision: 0 },
            serial: "NB2023S0001234",
            formats: vec![ScanFormat::Partial, ScanFormat::Full12x17],
            preview_scores: vec![0, 12, 48, 85],
            frame_ms: 5,
        }
    }

    /// Make `call` return `error` until cleared.
    pub fn fail(&mut self, call: impl Into<SimCall>, error: DeviceError) {
        self.faults.insert(call.into(), error);
    }

    pub fn clear_faults(&mut self) {
        self.faults.clear();
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Handles connected and not yet destroyed.
    pub fn live_handles(&self) -> &[u32] {
        &self.live
    }

    /// Handle ids in destroy order.
    pub fn destroyed_handles(&self) -> &[u32] {
        &self.destroyed
    }

    /// Successful connects so far.
    pub fn connects(&self) -> u32 {
        self.next_id - 1
    }

    fn check(&self, call: SimCall) -> Result<(), DeviceError> {
        match self.faults.get(&call) {
            Some(&e) => {
                debug!("SimSensor: injected {:?} -> {}", call, e);
                Err(e)
            }
            None => Ok(()),
        }
    }

    fn check_live(&self, handle: &SimHandle) -> Result<(), DeviceError> {
        if self.live.contains(&handle.id) {
            Ok(())
        } else {
            Err(DeviceError::InvalidOperation)
        }
    }

    /// One command frame over the bus.
    fn command<T: DeviceTransport>(transport: &mut T, opcode: u8) -> Result<[u8; FRAME_LEN], DeviceError> {
        let mut tx = [0u8; FRAME_LEN];
        tx[0] = opcode;
        let mut rx = [0u8; FRAME_LEN];
        transport.exchange(&tx, &mut rx)?;
        Ok(rx)
    }

    fn format_info(format: ScanFormat) -> ScanFormatInfo {
        let (width, height, dpi) = match format {
            ScanFormat::Full12x17 | ScanFormat::Full12x16 => (180, 256, 385),
            ScanFormat::Partial | ScanFormat::QuarterPartial | ScanFormat::Square12x12 => (180, 180, 385),
            ScanFormat::Full12x17At500 | ScanFormat::Full12x16At500 => (236, 332, 500),
            ScanFormat::PartialAt500
            | ScanFormat::Square12x12At500
            | ScanFormat::QuarterPartialAt500 => (236, 236, 500),
        };
        let format_type = if dpi == 500 { ScanFormatType::Upscaled } else { ScanFormatType::Native };
        ScanFormatInfo {
            format,
            format_type,
            width,
            height,
            horizontal_dpi: dpi,
            vertical_dpi: dpi,
        }
    }
}

impl Default for SimSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DeviceTransport> SensorDriver<T> for SimSensor {
    type Handle = SimHandle;

    fn initialize(&mut self) -> Result<(), DeviceError> {
        self.check(SimCall::Initialize)?;
        self.initialized = true;
        Ok(())
    }

    fn terminate(&mut self) -> Result<(), DeviceError> {
        if !self.initialized {
            return Err(DeviceError::InvalidOperation);
        }
        self.initialized = false;
        self.check(SimCall::Terminate)
    }

    fn connect(&mut self, transport: &mut T, _flags: u32) -> Result<SimHandle, DeviceError> {
        if !self.initialized {
            return Err(DeviceError::InvalidOperation);
        }

        transport.set_reset_pin(PinValue::Low)?;
        transport.delay_us(RESET_PULSE_US);
        transport.set_reset_pin(PinValue::High)?;

        let start = transport.timestamp_ms();
        while transport.awake_pin()? != PinValue::High {
            if transport.timestamp_ms().wrapping_sub(start) > AWAKE_TIMEOUT_MS {
                return Err(DeviceError::DeviceNotActive);
            }
            transport.delay_us(AWAKE_POLL_US);
        }
        Self::command(transport, 0x01)?;
        self.check(SimCall::Connect)?;

        let id = self.next_id;
        self.next_id += 1;
        self.live.push(id);
        debug!("SimSensor: handle {} connected", id);
        Ok(SimHandle { id })
    }

    fn destroy(&mut self, handle: SimHandle, transport: &mut T) -> Result<(), DeviceError> {
        // The handle is gone whatever the device says.
        self.live.retain(|&id| id != handle.id);
        self.destroyed.push(handle.id);
        transport.set_reset_pin(PinValue::Low)?;
        self.check(SimCall::Destroy)
    }

    fn firmware_version(&mut self, handle: &mut SimHandle, transport: &mut T) -> Result<FirmwareVersion, DeviceError> {
        self.check_live(handle)?;
        Self::command(transport, 0x10)?;
        self.check(SimCall::FirmwareVersion)?;
        Ok(self.firmware)
    }

    fn serial_number(&mut self, handle: &mut SimHandle, transport: &mut T, buf: &mut [u8]) -> Result<usize, DeviceError> {
        self.check_live(handle)?;
        Self::command(transport, 0x11)?;
        self.check(SimCall::SerialNumber)?;
        let bytes = self.serial.as_bytes();
        if buf.len() <= bytes.len() {
            return Err(DeviceError::InsufficientBuffer);
        }
        buf[..bytes.len()].copy_from_slice(bytes);
        buf[bytes.len()] = 0;
        Ok(bytes.len())
    }

    fn supported_scan_formats(
        &mut self,
        handle: &mut SimHandle,
        transport: &mut T,
        out: &mut [ScanFormat],
    ) -> Result<usize, DeviceError> {
        self.check_live(handle)?;
        Self::command(transport, 0x12)?;
        self.check(SimCall::ScanFormats)?;
        let n = out.len().min(self.formats.len());
        out[..n].copy_from_slice(&self.formats[..n]);
        Ok(n)
    }

    fn scan_format_info(
        &mut self,
        handle: &mut SimHandle,
        transport: &mut T,
        format: ScanFormat,
    ) -> Result<ScanFormatInfo, DeviceError> {
        self.check_live(handle)?;
        if !self.formats.contains(&format) {
            return Err(DeviceError::NotSupported);
        }
        Self::command(transport, 0x13)?;
        self.check(SimCall::ScanFormatInfo)?;
        Ok(Self::format_info(format))
    }

    fn scan(
        &mut self,
        handle: &mut SimHandle,
        transport: &mut T,
        request: &mut ScanRequest<'_>,
    ) -> Result<ScanStatus, DeviceError> {
        self.check_live(handle)?;
        self.check(SimCall::Scan)?;
        let info = self.scan_format_info(handle, transport, request.format)?;
        if request.image.len() < info.image_len() {
            return Err(DeviceError::InsufficientBuffer);
        }

        let start = transport.timestamp_ms();
        let mut detected = false;
        for &score in &self.preview_scores {
            Self::command(transport, 0x20)?;
            transport.delay_us(self.frame_ms.saturating_mul(1_000));

            let elapsed = transport.timestamp_ms().wrapping_sub(start);
            if request.timeout_ms >= 0 && elapsed > request.timeout_ms as u32 {
                return Ok(ScanStatus::Timeout);
            }

            let preview = ScanPreview { finger_detect_value: score, status: ScanStatus::None };
            if let Some(cb) = request.preview.as_deref_mut() {
                if cb(&preview) == PreviewAction::Cancel {
                    return Ok(ScanStatus::Canceled);
                }
            }
            detected |= score > 0;
        }
        if !detected {
            return Ok(ScanStatus::NoFinger);
        }

        // Read the image out in bus-sized pieces.
        let image = &mut request.image[..info.image_len()];
        let tx = [0u8; 64];
        for chunk in image.chunks_mut(64) {
            transport.exchange(&tx[..chunk.len()], chunk)?;
        }
        Ok(ScanStatus::Ok)
    }
}
