//! [`SensorDriver`] over the vendor NBDevices C library.
//!
//! The raw struct layouts and the scan-preview trampoline are always
//! compiled so they can be tested on the host.  The `extern` block and
//! the driver itself need the `nb-sdk` feature and the static library
//! (see `build.rs`).

use core::ffi::c_void;

use log::warn;

use crate::app::device::{
    FirmwareVersion, PreviewAction, ScanFormat, ScanFormatInfo, ScanFormatType, ScanPreview,
    ScanStatus,
};
use crate::error::{DeviceError, STATUS_OK};
use crate::transport::ffi::NbResult;

/// `NBVersion`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct NbVersion {
    pub major: i32,
    pub minor: i32,
    pub build: i32,
    pub revision: i32,
}

impl From<NbVersion> for FirmwareVersion {
    fn from(v: NbVersion) -> Self {
        Self { major: v.major, minor: v.minor, build: v.build, revision: v.revision }
    }
}

/// `NBDeviceScanFormatInfo`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct NbScanFormatInfo {
    pub scan_format: i32,
    pub scan_format_type: i32,
    pub width: u32,
    pub height: u32,
    pub horizontal_resolution: u32,
    pub vertical_resolution: u32,
}

impl TryFrom<NbScanFormatInfo> for ScanFormatInfo {
    type Error = DeviceError;

    fn try_from(raw: NbScanFormatInfo) -> Result<Self, DeviceError> {
        Ok(Self {
            format: ScanFormat::from_raw(raw.scan_format).ok_or(DeviceError::InvalidEnumArgument)?,
            format_type: ScanFormatType::from_raw(raw.scan_format_type)
                .ok_or(DeviceError::InvalidEnumArgument)?,
            width: raw.width,
            height: raw.height,
            horizontal_dpi: raw.horizontal_resolution,
            vertical_dpi: raw.vertical_resolution,
        })
    }
}

/// `NBDeviceScanPreviewDetails`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct NbScanPreviewDetails {
    pub finger_detect_value: i32,
}

/// Preview callback type as stored behind the `pParam` pointer.
pub type PreviewFn<'a> = &'a mut dyn FnMut(&ScanPreview) -> PreviewAction;

/// `NBDeviceScanPreviewProc` adapter.
///
/// `param` points at a [`PreviewFn`].  A `Cancel` from the callback is
/// passed back by setting `*status` to `Canceled`.
///
/// # Safety
/// `param` must be null or point at a live `PreviewFn`; `status` and
/// `details` must be null or valid for the duration of the call.
pub unsafe extern "C" fn preview_trampoline(
    _device: *mut c_void,
    status: *mut i32,
    _info: *const NbScanFormatInfo,
    _buffer: *const u8,
    _buffer_len: usize,
    details: *const NbScanPreviewDetails,
    param: *mut c_void,
) -> NbResult {
    let Some(callback) = (unsafe { param.cast::<PreviewFn<'_>>().as_mut() }) else {
        return DeviceError::ArgumentNull.code();
    };
    let finger_detect_value = unsafe { details.as_ref() }.map_or(0, |d| d.finger_detect_value);
    let current = unsafe { status.as_ref() }.map_or(ScanStatus::None, |&s| ScanStatus::from_raw(s));

    let preview = ScanPreview { finger_detect_value, status: current };
    if callback(&preview) == PreviewAction::Cancel {
        if status.is_null() {
            return DeviceError::OperationCanceled.code();
        }
        unsafe { status.write(ScanStatus::Canceled as i32) };
    }
    STATUS_OK
}

/// Raw formats from the library, dropping values this firmware does not know.
#[cfg_attr(not(feature = "nb-sdk"), allow(dead_code))]
fn decode_formats(raw: &[i32], out: &mut [ScanFormat]) -> usize {
    let mut n = 0;
    for &value in raw {
        match ScanFormat::from_raw(value) {
            Some(format) if n < out.len() => {
                out[n] = format;
                n += 1;
            }
            Some(_) => break,
            None => warn!("NbSdk: ignoring unknown scan format {}", value),
        }
    }
    n
}

#[cfg(feature = "nb-sdk")]
pub use linked::{NbDevice, NbSdk};

#[cfg(feature = "nb-sdk")]
mod linked {
    use core::ffi::{c_char, c_void};
    use core::ptr::{self, NonNull};

    use log::{debug, info};

    use super::{NbScanFormatInfo, NbVersion, PreviewFn, decode_formats, preview_trampoline};
    use crate::app::device::{FirmwareVersion, ScanFormat, ScanFormatInfo, ScanRequest, ScanStatus};
    use crate::app::ports::{DeviceTransport, SensorDriver};
    use crate::error::DeviceError;
    use crate::transport::ffi::{CapabilitySet, NbDeviceIo, NbResult};

    type RawDevice = *mut c_void;
    type DeviceChangedFn = unsafe extern "C" fn(info: *const c_void, param: *mut c_void) -> NbResult;
    type ScanPreviewFn = unsafe extern "C" fn(
        device: *mut c_void,
        status: *mut i32,
        info: *const NbScanFormatInfo,
        buffer: *const u8,
        buffer_len: usize,
        details: *const super::NbScanPreviewDetails,
        param: *mut c_void,
    ) -> NbResult;

    /// Most formats the library reports for one sensor.
    const FORMAT_QUERY_CAPACITY: usize = 16;

    unsafe extern "C" {
        fn NBDevicesInitializeA(
            added: Option<DeviceChangedFn>,
            removed: Option<DeviceChangedFn>,
            param: *mut c_void,
            flags: u32,
        ) -> NbResult;
        fn NBDevicesTerminate() -> NbResult;
        fn NBDeviceConnectToSpiRaw(io: *const NbDeviceIo, flags: u32, device: *mut RawDevice) -> NbResult;
        fn NBDeviceDestroy(device: RawDevice) -> NbResult;
        fn NBDeviceGetFirmwareVersion(device: RawDevice, version: *mut NbVersion) -> NbResult;
        fn NBDeviceGetSerialNumberA(device: RawDevice, value: *mut c_char, len: u32, actual: *mut u32) -> NbResult;
        fn NBDeviceGetSupportedScanFormats(device: RawDevice, formats: *mut i32, len: u32, count: *mut u32) -> NbResult;
        fn NBDeviceGetScanFormatInfo(device: RawDevice, format: i32, info: *mut NbScanFormatInfo) -> NbResult;
        fn NBDeviceScanEx(
            device: RawDevice,
            format: i32,
            timeout: i32,
            preview: Option<ScanPreviewFn>,
            param: *mut c_void,
            buffer: *mut u8,
            buffer_len: usize,
            flags: u32,
            status: *mut i32,
        ) -> NbResult;
    }

    /// A connected device plus the capability table it was connected with.
    pub struct NbDevice<T> {
        raw: NonNull<c_void>,
        caps: Box<CapabilitySet<T>>,
    }

    impl<T: DeviceTransport> NbDevice<T> {
        /// Run a library call with `transport` reachable from its callbacks.
        fn call(&self, transport: &mut T, f: impl FnOnce(RawDevice) -> NbResult) -> Result<(), DeviceError> {
            let raw = self.raw.as_ptr();
            DeviceError::check(self.caps.lend(transport, |_| f(raw)))
        }
    }

    /// The vendor library.  One per process.
    #[derive(Debug, Default)]
    pub struct NbSdk {
        initialized: bool,
    }

    impl NbSdk {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl<T: DeviceTransport> SensorDriver<T> for NbSdk {
        type Handle = NbDevice<T>;

        fn initialize(&mut self) -> Result<(), DeviceError> {
            DeviceError::check(unsafe { NBDevicesInitializeA(None, None, ptr::null_mut(), 0) })?;
            self.initialized = true;
            info!("NbSdk: library initialised");
            Ok(())
        }

        fn terminate(&mut self) -> Result<(), DeviceError> {
            if !self.initialized {
                return Ok(());
            }
            self.initialized = false;
            DeviceError::check(unsafe { NBDevicesTerminate() })
        }

        fn connect(&mut self, transport: &mut T, flags: u32) -> Result<NbDevice<T>, DeviceError> {
            let caps = CapabilitySet::<T>::new();
            let mut raw: RawDevice = ptr::null_mut();
            let status = caps.lend(transport, |io| unsafe { NBDeviceConnectToSpiRaw(io, flags, &mut raw) });
            DeviceError::check(status)?;
            let raw = NonNull::new(raw).ok_or(DeviceError::Failed)?;
            debug!("NbSdk: connected {:p}", raw);
            Ok(NbDevice { raw, caps })
        }

        fn destroy(&mut self, handle: NbDevice<T>, transport: &mut T) -> Result<(), DeviceError> {
            // The library may still talk to the sensor while shutting down.
            handle.call(transport, |raw| unsafe { NBDeviceDestroy(raw) })
        }

        fn firmware_version(&mut self, handle: &mut NbDevice<T>, transport: &mut T) -> Result<FirmwareVersion, DeviceError> {
            let mut v = NbVersion::default();
            handle.call(transport, |raw| unsafe { NBDeviceGetFirmwareVersion(raw, &mut v) })?;
            Ok(v.into())
        }

        fn serial_number(&mut self, handle: &mut NbDevice<T>, transport: &mut T, buf: &mut [u8]) -> Result<usize, DeviceError> {
            let mut actual = 0u32;
            let len = u32::try_from(buf.len()).map_err(|_| DeviceError::ArgumentOutOfRange)?;
            handle.call(transport, |raw| unsafe {
                NBDeviceGetSerialNumberA(raw, buf.as_mut_ptr().cast(), len, &mut actual)
            })?;
            Ok((actual as usize).min(buf.len()))
        }

        fn supported_scan_formats(
            &mut self,
            handle: &mut NbDevice<T>,
            transport: &mut T,
            out: &mut [ScanFormat],
        ) -> Result<usize, DeviceError> {
            let mut raw_formats = [0i32; FORMAT_QUERY_CAPACITY];
            let cap = out.len().min(FORMAT_QUERY_CAPACITY);
            let mut count = 0u32;
            handle.call(transport, |raw| unsafe {
                NBDeviceGetSupportedScanFormats(raw, raw_formats.as_mut_ptr(), cap as u32, &mut count)
            })?;
            let count = (count as usize).min(cap);
            Ok(decode_formats(&raw_formats[..count], out))
        }

        fn scan_format_info(
            &mut self,
            handle: &mut NbDevice<T>,
            transport: &mut T,
            format: ScanFormat,
        ) -> Result<ScanFormatInfo, DeviceError> {
            let mut info = NbScanFormatInfo::default();
            handle.call(transport, |raw| unsafe { NBDeviceGetScanFormatInfo(raw, format as i32, &mut info) })?;
            info.try_into()
        }

        fn scan(
            &mut self,
            handle: &mut NbDevice<T>,
            transport: &mut T,
            request: &mut ScanRequest<'_>,
        ) -> Result<ScanStatus, DeviceError> {
            let mut status = ScanStatus::None as i32;
            let image = &mut *request.image;
            let (callback, mut param): (Option<ScanPreviewFn>, Option<PreviewFn<'_>>) =
                match request.preview.as_deref_mut() {
                    Some(cb) => (Some(preview_trampoline), Some(cb)),
                    None => (None, None),
                };
            let param_ptr = param
                .as_mut()
                .map_or(ptr::null_mut(), |p| ptr::from_mut(p).cast::<c_void>());

            handle.call(transport, |raw| unsafe {
                NBDeviceScanEx(
                    raw,
                    request.format as i32,
                    request.timeout_ms,
                    callback,
                    param_ptr,
                    image.as_mut_ptr(),
                    image.len(),
                    request.flags,
                    &mut status,
                )
            })?;
            Ok(ScanStatus::from_raw(status))
        }
    }
}
