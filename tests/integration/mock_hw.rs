//! Mock hardware for integration tests.
//!
//! Every peripheral records what was done to it and can be told to fail,
//! so tests can assert on line histories (chip-select framing, reset
//! pulses) under injected faults without touching real GPIO/SPI.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, InputPin, OutputPin};
use embedded_hal::spi::{self, SpiBus};

use fpstation::app::bringup::BringUpState;
use fpstation::app::events::AppEvent;
use fpstation::app::ports::EventSink;
use fpstation::transport::{Clock, SpiTransport};

// ── MockClock ─────────────────────────────────────────────────

/// Shared millisecond counter.  Clones observe the same time.
#[derive(Clone, Default)]
pub struct MockClock(Rc<Cell<u32>>);

#[allow(dead_code)]
impl MockClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, ms: u32) {
        self.0.set(ms);
    }

    pub fn advance(&self, ms: u32) {
        self.0.set(self.0.get().wrapping_add(ms));
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u32 {
        self.0.get()
    }
}

// ── MockDelay ─────────────────────────────────────────────────

/// Delay that advances a [`MockClock`] instead of spinning.
pub struct MockDelay {
    clock: MockClock,
    carry_ns: u64,
}

impl MockDelay {
    pub fn new(clock: MockClock) -> Self {
        Self { clock, carry_ns: 0 }
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.carry_ns += u64::from(ns);
        let whole_ms = self.carry_ns / 1_000_000;
        self.carry_ns %= 1_000_000;
        self.clock.advance(whole_ms as u32);
    }
}

// ── MockPin ───────────────────────────────────────────────────

#[derive(Default)]
struct PinState {
    level: Cell<bool>,
    history: RefCell<Vec<bool>>,
    fail_low: Cell<bool>,
    fail_read: Cell<bool>,
}

/// GPIO recording every level driven onto it.  Clones share the line.
#[derive(Clone)]
pub struct MockPin(Rc<PinState>);

#[allow(dead_code)]
impl MockPin {
    pub fn new(high: bool) -> Self {
        let pin = Self(Rc::default());
        pin.0.level.set(high);
        pin
    }

    pub fn is_set(&self) -> bool {
        self.0.level.get()
    }

    /// Levels driven so far, oldest first.
    pub fn history(&self) -> Vec<bool> {
        self.0.history.borrow().clone()
    }

    /// Set the level from outside, as the device would.
    pub fn drive(&self, high: bool) {
        self.0.level.set(high);
    }

    /// Make `set_low` fail without moving the line.
    pub fn fail_low(&self, fail: bool) {
        self.0.fail_low.set(fail);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.0.fail_read.set(fail);
    }
}

impl digital::ErrorType for MockPin {
    type Error = digital::ErrorKind;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        if self.0.fail_low.get() {
            return Err(digital::ErrorKind::Other);
        }
        self.0.level.set(false);
        self.0.history.borrow_mut().push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.level.set(true);
        self.0.history.borrow_mut().push(true);
        Ok(())
    }
}

impl InputPin for MockPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        if self.0.fail_read.get() {
            return Err(digital::ErrorKind::Other);
        }
        Ok(self.0.level.get())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

// ── MockBus ───────────────────────────────────────────────────

/// Fault mode of a [`MockBus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BusFault {
    #[default]
    None,
    /// Every transfer returns a bus error.
    Error,
    /// Fail only the transfer with this zero-based index.
    ErrorAt(usize),
    /// Every transfer takes this many milliseconds.
    Stall(u32),
}

#[derive(Default)]
struct BusState {
    fault: Cell<BusFault>,
    transfers: Cell<usize>,
    sent: RefCell<Vec<u8>>,
    unframed: Cell<usize>,
}

/// Loopback SPI bus: every received byte is the byte sent, inverted.
///
/// Counts transfers made while chip-select was not asserted.
#[derive(Clone)]
pub struct MockBus {
    state: Rc<BusState>,
    cs: MockPin,
    clock: MockClock,
}

#[allow(dead_code)]
impl MockBus {
    pub fn new(cs: MockPin, clock: MockClock) -> Self {
        Self { state: Rc::default(), cs, clock }
    }

    pub fn set_fault(&self, fault: BusFault) {
        self.state.fault.set(fault);
    }

    pub fn transfers(&self) -> usize {
        self.state.transfers.get()
    }

    pub fn sent(&self) -> Vec<u8> {
        self.state.sent.borrow().clone()
    }

    /// Transfers clocked with CS high.
    pub fn unframed(&self) -> usize {
        self.state.unframed.get()
    }
}

impl spi::ErrorType for MockBus {
    type Error = spi::ErrorKind;
}

impl SpiBus<u8> for MockBus {
    fn read(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        let tx = vec![0u8; words.len()];
        self.transfer(words, &tx)
    }

    fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
        let mut rx = vec![0u8; words.len()];
        self.transfer(&mut rx, words)
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
        let index = self.state.transfers.get();
        self.state.transfers.set(index + 1);
        if self.cs.is_set() {
            self.state.unframed.set(self.state.unframed.get() + 1);
        }

        match self.state.fault.get() {
            BusFault::Error => return Err(spi::ErrorKind::Other),
            BusFault::ErrorAt(at) if at == index => return Err(spi::ErrorKind::Other),
            BusFault::Stall(ms) => self.clock.advance(ms),
            _ => {}
        }

        self.state.sent.borrow_mut().extend_from_slice(write);
        for (i, byte) in read.iter_mut().enumerate() {
            *byte = !write.get(i).copied().unwrap_or(0);
        }
        Ok(())
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        let tx = words.to_vec();
        self.transfer(words, &tx)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

// ── Rig ───────────────────────────────────────────────────────

pub type MockTransport = SpiTransport<MockBus, MockPin, MockPin, MockPin, MockDelay, MockClock>;

/// One set of mock peripherals plus handles for inspecting them after the
/// transport has taken ownership.
pub struct Rig {
    pub clock: MockClock,
    pub cs: MockPin,
    pub reset: MockPin,
    pub awake: MockPin,
    pub bus: MockBus,
}

#[allow(dead_code)]
impl Rig {
    /// Awake line tied to reset: the device is awake whenever it is out of
    /// reset.
    pub fn new() -> Self {
        let reset = MockPin::new(false);
        let awake = reset.clone();
        Self::with_lines(reset, awake)
    }

    /// Awake line independent of reset, initially low.
    pub fn with_separate_awake() -> Self {
        Self::with_lines(MockPin::new(false), MockPin::new(false))
    }

    fn with_lines(reset: MockPin, awake: MockPin) -> Self {
        let clock = MockClock::new();
        let cs = MockPin::new(true);
        let bus = MockBus::new(cs.clone(), clock.clone());
        Self { clock, cs, reset, awake, bus }
    }

    pub fn transport(&self) -> MockTransport {
        SpiTransport::new(
            self.bus.clone(),
            self.cs.clone(),
            self.reset.clone(),
            self.awake.clone(),
            MockDelay::new(self.clock.clone()),
            self.clock.clone(),
        )
    }
}

// ── RecordingSink ─────────────────────────────────────────────

/// Event sink that keeps every event for later assertions.
#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Target states of every `StateChanged`, in order.
    pub fn states(&self) -> Vec<BringUpState> {
        self.events
            .iter()
            .filter_map(|e| match e {
                AppEvent::StateChanged { to, .. } => Some(*to),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn last(&self) -> Option<&AppEvent> {
        self.events.last()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
