//! C-ABI capability table handed to the sensor library at connect time.
//!
//! [`NbDeviceIo`] mirrors the library's `NBDeviceIO` struct field for
//! field.  Its context pointer refers to a boxed [`CapabilitySet`], which
//! in turn points at whichever [`DeviceTransport`] is currently lent to
//! it.  The box never moves, so the library may keep the table pointer for
//! the lifetime of the device handle; the transport itself is only
//! reachable while [`CapabilitySet::lend`] is on the stack.
//!
//! ```text
//!   library ──▶ NbDeviceIo.fn(context, ..) ──▶ trampoline::<T>
//!                                                 │
//!                           CapabilitySet.lent ◀──┘ (null outside lend)
//!                                 │
//!                                 ▼
//!                          &mut T: DeviceTransport
//! ```

use core::cell::Cell;
use core::ffi::c_void;
use core::marker::PhantomData;
use core::ptr;

use crate::app::ports::DeviceTransport;
use crate::error::{DeviceError, STATUS_OK, status_of};

use super::pin::PinValue;

/// Padding for the in-place path when `tx_len < rx_len`.
const TX_FILL: u8 = 0x00;

/// Raw vendor status code.
pub type NbResult = i32;
/// 32-bit C boolean.
pub type NbBool = i32;

pub type DestroyContextFn = unsafe extern "C" fn(context: *mut c_void) -> NbResult;
pub type DelayMicrosecondsFn = unsafe extern "C" fn(context: *mut c_void, us: u32) -> NbResult;
pub type GetTimestampFn = unsafe extern "C" fn(context: *mut c_void, out: *mut u32) -> NbResult;
pub type ResetSetValueFn = unsafe extern "C" fn(context: *mut c_void, value: i32) -> NbResult;
pub type AwakeGetValueFn = unsafe extern "C" fn(context: *mut c_void, out: *mut i32) -> NbResult;
pub type SendReceiveDataFn = unsafe extern "C" fn(
    context: *mut c_void,
    tx: *mut u8,
    tx_len: u16,
    rx: *mut u8,
    rx_len: u16,
) -> NbResult;

/// Layout-compatible with the library's `NBDeviceIO`.
#[repr(C)]
pub struct NbDeviceIo {
    /// Non-zero: a `High` awake value means the device is awake.
    pub is_awake_high: NbBool,
    pub context: *mut c_void,
    pub destroy_context: Option<DestroyContextFn>,
    pub delay_microseconds: Option<DelayMicrosecondsFn>,
    pub get_timestamp: Option<GetTimestampFn>,
    pub reset_set_value: Option<ResetSetValueFn>,
    pub awake_get_value: Option<AwakeGetValueFn>,
    pub send_receive_data: Option<SendReceiveDataFn>,
}

/// Owner of one [`NbDeviceIo`] table bound to transports of type `T`.
pub struct CapabilitySet<T> {
    io: NbDeviceIo,
    lent: Cell<*mut T>,
}

impl<T: DeviceTransport> CapabilitySet<T> {
    /// Build a table whose callbacks dispatch into `T`.
    ///
    /// The transport already normalises awake polarity, so the table
    /// always reports active-high.
    pub fn new() -> Box<Self> {
        let mut set = Box::new(Self {
            io: NbDeviceIo {
                is_awake_high: 1,
                context: ptr::null_mut(),
                destroy_context: None,
                delay_microseconds: Some(delay_microseconds::<T>),
                get_timestamp: Some(get_timestamp::<T>),
                reset_set_value: Some(reset_set_value::<T>),
                awake_get_value: Some(awake_get_value::<T>),
                send_receive_data: Some(send_receive_data::<T>),
            },
            lent: Cell::new(ptr::null_mut()),
        });
        let context: *const Self = &*set;
        set.io.context = context.cast_mut().cast();
        set
    }

    /// Pointer to pass to the library's connect call.
    pub fn io(&self) -> *const NbDeviceIo {
        &self.io
    }

    /// Make `transport` reachable through the table for the duration of `f`.
    pub fn lend<R>(&self, transport: &mut T, f: impl FnOnce(*const NbDeviceIo) -> R) -> R {
        let _guard = Lent::new(&self.lent, transport);
        f(self.io())
    }

    /// Whether a transport is currently lent.
    pub fn is_lent(&self) -> bool {
        !self.lent.get().is_null()
    }
}

/// Clears the lent pointer when dropped, including on unwind.
struct Lent<'a, T> {
    slot: &'a Cell<*mut T>,
    _borrow: PhantomData<&'a mut T>,
}

impl<'a, T> Lent<'a, T> {
    fn new(slot: &'a Cell<*mut T>, transport: &'a mut T) -> Self {
        slot.set(transport);
        Self { slot, _borrow: PhantomData }
    }
}

impl<T> Drop for Lent<'_, T> {
    fn drop(&mut self) {
        self.slot.set(ptr::null_mut());
    }
}

/// Resolve a callback context to the lent transport.
///
/// # Safety
/// `context` must be null or the context pointer of a live
/// `CapabilitySet<T>`.
unsafe fn transport<'a, T>(context: *mut c_void) -> Result<&'a mut T, DeviceError> {
    let set = unsafe { context.cast::<CapabilitySet<T>>().as_ref() }.ok_or(DeviceError::ArgumentNull)?;
    let lent = set.lent.get();
    // Called outside a lend window: the handle outlived its transport borrow.
    unsafe { lent.as_mut() }.ok_or(DeviceError::InvalidOperation)
}

unsafe extern "C" fn delay_microseconds<T: DeviceTransport>(context: *mut c_void, us: u32) -> NbResult {
    match unsafe { transport::<T>(context) } {
        Ok(t) => {
            t.delay_us(us);
            STATUS_OK
        }
        Err(e) => e.code(),
    }
}

unsafe extern "C" fn get_timestamp<T: DeviceTransport>(context: *mut c_void, out: *mut u32) -> NbResult {
    if out.is_null() {
        return DeviceError::ArgumentNull.code();
    }
    match unsafe { transport::<T>(context) } {
        Ok(t) => {
            unsafe { out.write(t.timestamp_ms()) };
            STATUS_OK
        }
        Err(e) => e.code(),
    }
}

unsafe extern "C" fn reset_set_value<T: DeviceTransport>(context: *mut c_void, value: i32) -> NbResult {
    let result = unsafe { transport::<T>(context) }
        .and_then(|t| t.set_reset_pin(PinValue::from_raw(value)));
    status_of(result)
}

unsafe extern "C" fn awake_get_value<T: DeviceTransport>(context: *mut c_void, out: *mut i32) -> NbResult {
    if out.is_null() {
        return DeviceError::ArgumentNull.code();
    }
    match unsafe { transport::<T>(context) }.and_then(|t| t.awake_pin()) {
        Ok(value) => {
            unsafe { out.write(value as i32) };
            STATUS_OK
        }
        Err(e) => e.code(),
    }
}

unsafe extern "C" fn send_receive_data<T: DeviceTransport>(
    context: *mut c_void,
    tx: *mut u8,
    tx_len: u16,
    rx: *mut u8,
    rx_len: u16,
) -> NbResult {
    if tx.is_null() || rx.is_null() {
        return DeviceError::ArgumentNull.code();
    }
    let t = match unsafe { transport::<T>(context) } {
        Ok(t) => t,
        Err(e) => return e.code(),
    };

    let (tx_len, rx_len) = (usize::from(tx_len), usize::from(rx_len));
    let overlaps = (tx as usize) < (rx as usize) + rx_len && (rx as usize) < (tx as usize) + tx_len;

    // The library may pass the same buffer for both directions.  Only the
    // first `rx_len` transmit bytes are clocked, so they are moved to the
    // front of `rx` and the exchange runs in place.
    if overlaps {
        let n = tx_len.min(rx_len);
        unsafe { ptr::copy(tx, rx, n) };
        let buf = unsafe { core::slice::from_raw_parts_mut(rx, rx_len) };
        buf[n..].fill(TX_FILL);
        return status_of(t.exchange_in_place(buf));
    }

    let tx_slice = unsafe { core::slice::from_raw_parts(tx, tx_len) };
    let rx_slice = unsafe { core::slice::from_raw_parts_mut(rx, rx_len) };
    status_of(t.exchange(tx_slice, rx_slice))
}
