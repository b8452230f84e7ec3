//! Millisecond tick sources.
//!
//! On the target the SysTick interrupt calls [`on_systick`] once per
//! millisecond; [`SysTickClock`] reads that counter.  The counter is a
//! lock-free atomic so the ISR never contends with the main context.
//!
//! ```text
//! ┌─────────────┐  fetch_add  ┌──────────┐  load  ┌──────────────┐
//! │ SysTick ISR │────────────▶│  TICKS   │───────▶│ SysTickClock │
//! └─────────────┘             └──────────┘        └──────────────┘
//! ```

use core::sync::atomic::{AtomicU32, Ordering};

/// A free-running millisecond counter.  Wraps at `u32::MAX`.
pub trait Clock {
    fn now_ms(&self) -> u32;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}

static TICKS: AtomicU32 = AtomicU32::new(0);

/// Advance the global tick.  Call from the 1 kHz SysTick handler.
pub fn on_systick() {
    TICKS.fetch_add(1, Ordering::Release);
}

/// [`Clock`] over the SysTick-driven counter.
#[derive(Debug, Clone, Copy, Default)]
pub struct SysTickClock;

impl Clock for SysTickClock {
    fn now_ms(&self) -> u32 {
        TICKS.load(Ordering::Acquire)
    }
}

/// Backward steps shorter than this are treated as read glitches.
pub const GLITCH_WINDOW_MS: u32 = 1_000;

/// Guards the timestamp handed to the sensor library against small
/// backward glitches.
///
/// A reading up to [`GLITCH_WINDOW_MS`] behind the last stamp repeats the
/// last stamp.  Every other reading passes through unchanged, so forward
/// progress of any size (a long idle, the `u32` wrap) is never held back.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicStamp {
    last: Option<u32>,
}

impl MonotonicStamp {
    pub const fn new() -> Self {
        Self { last: None }
    }

    pub fn stamp(&mut self, now: u32) -> u32 {
        let next = match self.last {
            Some(last) if (1..=GLITCH_WINDOW_MS).contains(&last.wrapping_sub(now)) => last,
            _ => now,
        };
        self.last = Some(next);
        next
    }
}
