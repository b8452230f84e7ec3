//! Host stand-ins for the board peripherals.
//!
//! Just enough to run [`SpiTransport`](crate::transport::SpiTransport) on a
//! workstation: shared logic lines, a bus that answers with a fixed
//! pattern, a wall-clock millisecond source and a nanosecond-derived cycle
//! counter.

use std::cell::Cell;
use std::convert::Infallible;
use std::rc::Rc;
use std::time::Instant;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use embedded_hal::spi::{self, SpiBus};

use crate::transport::{Clock, CycleCounter};

/// A logic line.  Clones share the level, so wiring reset to awake is a
/// matter of handing out two clones.
#[derive(Debug, Clone, Default)]
pub struct SimLine {
    level: Rc<Cell<bool>>,
    falls: Rc<Cell<u32>>,
}

impl SimLine {
    pub fn new(high: bool) -> Self {
        Self { level: Rc::new(Cell::new(high)), falls: Rc::default() }
    }

    pub fn is_set(&self) -> bool {
        self.level.get()
    }

    /// High-to-low transitions seen so far.
    pub fn falling_edges(&self) -> u32 {
        self.falls.get()
    }
}

impl ErrorType for SimLine {
    type Error = Infallible;
}

impl OutputPin for SimLine {
    fn set_low(&mut self) -> Result<(), Infallible> {
        if self.level.replace(false) {
            self.falls.set(self.falls.get() + 1);
        }
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.level.set(true);
        Ok(())
    }
}

impl InputPin for SimLine {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.level.get())
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(!self.level.get())
    }
}

/// SPI bus whose device side always answers `fill`.
#[derive(Debug, Default)]
pub struct SimBus {
    fill: u8,
    bytes: usize,
}

impl SimBus {
    pub fn new(fill: u8) -> Self {
        Self { fill, bytes: 0 }
    }

    /// Bytes clocked so far.
    pub fn bytes(&self) -> usize {
        self.bytes
    }
}

impl spi::ErrorType for SimBus {
    type Error = spi::ErrorKind;
}

impl SpiBus<u8> for SimBus {
    fn read(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        words.fill(self.fill);
        self.bytes += words.len();
        Ok(())
    }

    fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
        self.bytes += words.len();
        Ok(())
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
        read.fill(self.fill);
        self.bytes += read.len().max(write.len());
        Ok(())
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        words.fill(self.fill);
        self.bytes += words.len();
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Milliseconds since construction.
#[derive(Debug, Clone, Copy)]
pub struct HostClock {
    epoch: Instant,
}

impl HostClock {
    pub fn new() -> Self {
        Self { epoch: Instant::now() }
    }
}

impl Default for HostClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for HostClock {
    fn now_ms(&self) -> u32 {
        self.epoch.elapsed().as_millis() as u32
    }
}

/// Cycle counter synthesised from the host's monotonic clock at a given
/// core frequency.  Wraps like the hardware counter.
#[derive(Debug, Clone, Copy)]
pub struct HostCycles {
    epoch: Instant,
    core_hz: u32,
}

impl HostCycles {
    pub fn new(core_hz: u32) -> Self {
        Self { epoch: Instant::now(), core_hz }
    }
}

impl CycleCounter for HostCycles {
    fn cycles(&self) -> u32 {
        let ns = self.epoch.elapsed().as_nanos();
        (ns * u128::from(self.core_hz) / 1_000_000_000) as u32
    }
}
