//! Host simulation backends.
//!
//! RAM-backed EEPROM emulation, a scriptable sensor library, and host
//! stand-ins for pins, bus and clocks.  Used by the `host-sim` binary and
//! by the test suites.

pub mod eeprom;
pub mod hw;
pub mod sensor;

pub use eeprom::RamEeprom;
pub use hw::{HostClock, HostCycles, SimBus, SimLine};
pub use sensor::{SimCall, SimHandle, SimSensor};
