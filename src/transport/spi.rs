//! [`DeviceTransport`] over embedded-hal 1.0 peripherals.
//!
//! Wiring:
//!   SPI bus   → sensor MOSI/MISO/SCK (mode 0)
//!   CS        → active-low chip select, driven manually per exchange
//!   RESET     → active-low reset line
//!   AWAKE     → status output of the sensor, polarity per board
//!
//! Every exchange is framed: CS low, bounded transfer of `rx.len()` bytes,
//! CS high.  The release happens on every path, including a failed
//! assert, a bus error, and a deadline overrun.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiBus;
use log::debug;

use crate::app::ports::DeviceTransport;
use crate::config::StationConfig;
use crate::error::DeviceError;

use super::clock::{Clock, MonotonicStamp};
use super::pin::{AwakePolarity, PinValue};

/// Upper bound for one exchange, in milliseconds.
pub const EXCHANGE_TIMEOUT_MS: u32 = 50;

/// Bytes clocked between deadline checks.
const CHUNK: usize = 64;

/// Filler clocked out when the transmit buffer is shorter than the receive.
const TX_FILL: u8 = 0x00;

/// Sensor transport built from an SPI bus, three GPIOs, a delay and a
/// millisecond clock.
pub struct SpiTransport<SPI, CS, RST, AWAKE, D, C> {
    spi: SPI,
    cs: CS,
    reset: RST,
    awake: AWAKE,
    delay: D,
    clock: C,
    polarity: AwakePolarity,
    timeout_ms: u32,
    stamp: MonotonicStamp,
}

impl<SPI, CS, RST, AWAKE, D, C> SpiTransport<SPI, CS, RST, AWAKE, D, C>
where
    SPI: SpiBus<u8>,
    CS: OutputPin,
    RST: OutputPin,
    AWAKE: InputPin,
    D: DelayNs,
    C: Clock,
{
    pub fn new(spi: SPI, cs: CS, reset: RST, awake: AWAKE, delay: D, clock: C) -> Self {
        Self {
            spi,
            cs,
            reset,
            awake,
            delay,
            clock,
            polarity: AwakePolarity::default(),
            timeout_ms: EXCHANGE_TIMEOUT_MS,
            stamp: MonotonicStamp::new(),
        }
    }

    pub fn with_polarity(mut self, polarity: AwakePolarity) -> Self {
        self.polarity = polarity;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Apply the transport-related fields of a station config.
    pub fn configure(&mut self, cfg: &StationConfig) {
        self.polarity = cfg.awake_polarity;
        self.timeout_ms = cfg.exchange_timeout_ms;
    }

    pub fn polarity(&self) -> AwakePolarity {
        self.polarity
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    /// Give the peripherals back.
    pub fn release(self) -> (SPI, CS, RST, AWAKE, D, C) {
        (self.spi, self.cs, self.reset, self.awake, self.delay, self.clock)
    }

    /// Clock `rx.len()` bytes in chunks, checking the deadline after each.
    /// Caller owns chip-select.
    fn transfer_bounded(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<(), DeviceError> {
        let start = self.clock.now_ms();
        let mut fill = [TX_FILL; CHUNK];

        for (i, rx_chunk) in rx.chunks_mut(CHUNK).enumerate() {
            let n = rx_chunk.len();
            let tx_rest = tx.get(i * CHUNK..).unwrap_or(&[]);
            let tx_chunk: &[u8] = if tx_rest.len() >= n {
                &tx_rest[..n]
            } else {
                fill[..tx_rest.len()].copy_from_slice(tx_rest);
                fill[tx_rest.len()..n].fill(TX_FILL);
                &fill[..n]
            };

            self.spi.transfer(rx_chunk, tx_chunk).map_err(|_| {
                debug!("SpiTransport: bus error at chunk {}", i);
                DeviceError::Failed
            })?;

            if self.clock.now_ms().wrapping_sub(start) > self.timeout_ms {
                debug!("SpiTransport: exchange exceeded {} ms", self.timeout_ms);
                return Err(DeviceError::Timeout);
            }
        }

        self.spi.flush().map_err(|_| DeviceError::Failed)
    }

    /// [`transfer_bounded`](Self::transfer_bounded) over a single buffer.
    fn transfer_in_place_bounded(&mut self, buf: &mut [u8]) -> Result<(), DeviceError> {
        let start = self.clock.now_ms();

        for (i, chunk) in buf.chunks_mut(CHUNK).enumerate() {
            self.spi.transfer_in_place(chunk).map_err(|_| {
                debug!("SpiTransport: bus error at chunk {}", i);
                DeviceError::Failed
            })?;

            if self.clock.now_ms().wrapping_sub(start) > self.timeout_ms {
                debug!("SpiTransport: exchange exceeded {} ms", self.timeout_ms);
                return Err(DeviceError::Timeout);
            }
        }

        self.spi.flush().map_err(|_| DeviceError::Failed)
    }

    /// Run `transfer` with chip-select asserted, releasing it on every path.
    fn framed(
        &mut self,
        transfer: impl FnOnce(&mut Self) -> Result<(), DeviceError>,
    ) -> Result<(), DeviceError> {
        let result = match self.cs.set_low() {
            Ok(()) => transfer(self),
            Err(_) => Err(DeviceError::Io),
        };
        let released = self.cs.set_high().map_err(|_| DeviceError::Io);
        result.and(released)
    }
}

impl<SPI, CS, RST, AWAKE, D, C> DeviceTransport for SpiTransport<SPI, CS, RST, AWAKE, D, C>
where
    SPI: SpiBus<u8>,
    CS: OutputPin,
    RST: OutputPin,
    AWAKE: InputPin,
    D: DelayNs,
    C: Clock,
{
    fn timestamp_ms(&mut self) -> u32 {
        let now = self.clock.now_ms();
        self.stamp.stamp(now)
    }

    fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }

    fn awake_pin(&mut self) -> Result<PinValue, DeviceError> {
        let high = self.awake.is_high().map_err(|_| DeviceError::Io)?;
        Ok(self.polarity.normalize(high))
    }

    fn set_reset_pin(&mut self, value: PinValue) -> Result<(), DeviceError> {
        let driven = match value {
            PinValue::High => self.reset.set_high(),
            PinValue::Low => self.reset.set_low(),
            PinValue::Unknown => return Err(DeviceError::InvalidArgument),
        };
        driven.map_err(|_| DeviceError::Io)
    }

    fn exchange(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<(), DeviceError> {
        self.framed(|t| t.transfer_bounded(tx, rx))
    }

    fn exchange_in_place(&mut self, buf: &mut [u8]) -> Result<(), DeviceError> {
        self.framed(|t| t.transfer_in_place_bounded(buf))
    }
}
