//! Busy-wait delay over a free-running cycle counter.
//!
//! Spins on the counter rather than sleeping, so it is usable from
//! interrupt context and never yields.  Requested durations are converted
//! to cycles rounding up, so a delay is never shorter than asked.

use embedded_hal::delay::DelayNs;

/// A free-running core cycle counter (DWT `CYCCNT` on Cortex-M).  Wraps at
/// `u32::MAX`.
pub trait CycleCounter {
    fn cycles(&self) -> u32;
}

/// Spin at most this many cycles per counter window so a wrap can never be
/// mistaken for elapsed time.
const MAX_SPIN_CHUNK: u64 = (u32::MAX / 2) as u64;

/// [`DelayNs`] implementation over a [`CycleCounter`].
pub struct CycleDelay<C> {
    counter: C,
    core_hz: u32,
}

impl<C: CycleCounter> CycleDelay<C> {
    pub fn new(counter: C, core_hz: u32) -> Self {
        Self { counter, core_hz }
    }

    /// Cycles covering `amount` units of `1 / per_second` seconds, rounded up.
    fn cycles_for(&self, amount: u32, per_second: u64) -> u64 {
        (u64::from(amount) * u64::from(self.core_hz)).div_ceil(per_second)
    }

    fn spin(&mut self, mut cycles: u64) {
        while cycles > 0 {
            let chunk = cycles.min(MAX_SPIN_CHUNK);
            let start = self.counter.cycles();
            while u64::from(self.counter.cycles().wrapping_sub(start)) < chunk {
                core::hint::spin_loop();
            }
            cycles -= chunk;
        }
    }

    pub fn release(self) -> C {
        self.counter
    }
}

impl<C: CycleCounter> DelayNs for CycleDelay<C> {
    fn delay_ns(&mut self, ns: u32) {
        let cycles = self.cycles_for(ns, 1_000_000_000);
        self.spin(cycles);
    }

    fn delay_us(&mut self, us: u32) {
        let cycles = self.cycles_for(us, 1_000_000);
        self.spin(cycles);
    }

    fn delay_ms(&mut self, ms: u32) {
        let cycles = self.cycles_for(ms, 1_000);
        self.spin(cycles);
    }
}
