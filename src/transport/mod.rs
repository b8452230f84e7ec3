//! Sensor transport adapter: the five physical capabilities the sensor
//! library calls back into (timestamp, delay, reset pin, awake pin, duplex
//! exchange), plus the C-ABI table that exposes them.

pub mod clock;
pub mod delay;
pub mod ffi;
pub mod pin;
pub mod spi;

pub use clock::{Clock, GLITCH_WINDOW_MS, MonotonicStamp, SysTickClock, on_systick};
pub use delay::{CycleCounter, CycleDelay};
pub use ffi::{CapabilitySet, NbDeviceIo};
pub use pin::{AwakePolarity, PinValue};
pub use spi::{EXCHANGE_TIMEOUT_MS, SpiTransport};
