//! SpiTransport against recording mocks: chip-select framing under every
//! fault path, pin handling, and timestamp monotonicity.

use fpstation::app::ports::DeviceTransport;
use fpstation::config::StationConfig;
use fpstation::error::DeviceError;
use fpstation::transport::{AwakePolarity, Clock, PinValue};

use crate::mock_hw::{BusFault, Rig};

#[test]
fn exchange_frames_transfer_with_cs() {
    let rig = Rig::new();
    let mut t = rig.transport();

    let mut rx = [0u8; 4];
    t.exchange(&[0x01, 0x02, 0x03, 0x04], &mut rx).unwrap();

    assert_eq!(rx, [0xFE, 0xFD, 0xFC, 0xFB]);
    assert_eq!(rig.cs.history(), vec![false, true]);
    assert_eq!(rig.bus.unframed(), 0);
}

#[test]
fn short_tx_is_padded_with_zeros() {
    let rig = Rig::new();
    let mut t = rig.transport();

    let mut rx = [0u8; 5];
    t.exchange(&[0xAA], &mut rx).unwrap();

    assert_eq!(rig.bus.sent(), vec![0xAA, 0, 0, 0, 0]);
    assert_eq!(rx, [0x55, 0xFF, 0xFF, 0xFF, 0xFF]);
}

#[test]
fn large_exchange_is_chunked() {
    let rig = Rig::new();
    let mut t = rig.transport();

    let tx = vec![0x11u8; 200];
    let mut rx = vec![0u8; 200];
    t.exchange(&tx, &mut rx).unwrap();

    assert_eq!(rig.bus.transfers(), 4);
    assert!(rx.iter().all(|&b| b == 0xEE));
    assert_eq!(rig.cs.history(), vec![false, true]);
}

#[test]
fn bus_error_reports_failed_and_releases_cs() {
    let rig = Rig::new();
    rig.bus.set_fault(BusFault::Error);
    let mut t = rig.transport();

    let mut rx = [0u8; 8];
    assert_eq!(t.exchange(&[0; 8], &mut rx), Err(DeviceError::Failed));
    assert!(rig.cs.is_set());
    assert_eq!(rig.cs.history(), vec![false, true]);
}

#[test]
fn in_place_exchange_is_framed_and_chunked() {
    let rig = Rig::new();
    let mut t = rig.transport();

    let mut buf = vec![0x33u8; 130];
    t.exchange_in_place(&mut buf).unwrap();

    assert_eq!(rig.bus.transfers(), 3);
    assert!(buf.iter().all(|&b| b == 0xCC));
    assert_eq!(rig.cs.history(), vec![false, true]);
    assert_eq!(rig.bus.unframed(), 0);
}

#[test]
fn in_place_exchange_times_out_and_releases_cs() {
    let rig = Rig::new();
    rig.bus.set_fault(BusFault::Stall(30));
    let mut t = rig.transport().with_timeout_ms(50);

    let mut buf = vec![0u8; 200];
    assert_eq!(t.exchange_in_place(&mut buf), Err(DeviceError::Timeout));
    assert_eq!(rig.bus.transfers(), 2);
    assert!(rig.cs.is_set());
}

#[test]
fn mid_exchange_bus_error_releases_cs() {
    let rig = Rig::new();
    rig.bus.set_fault(BusFault::ErrorAt(2));
    let mut t = rig.transport();

    let mut rx = vec![0u8; 256];
    assert_eq!(t.exchange(&[], &mut rx), Err(DeviceError::Failed));
    assert_eq!(rig.bus.transfers(), 3);
    assert!(rig.cs.is_set());
}

#[test]
fn stalled_bus_times_out_and_releases_cs() {
    let rig = Rig::new();
    rig.bus.set_fault(BusFault::Stall(30));
    let mut t = rig.transport().with_timeout_ms(50);

    let mut rx = vec![0u8; 256];
    assert_eq!(t.exchange(&[], &mut rx), Err(DeviceError::Timeout));
    // 30 ms, then 60 ms: the deadline check after the second chunk trips.
    assert_eq!(rig.bus.transfers(), 2);
    assert!(rig.cs.is_set());
}

#[test]
fn stall_within_deadline_succeeds() {
    let rig = Rig::new();
    rig.bus.set_fault(BusFault::Stall(10));
    let mut t = rig.transport().with_timeout_ms(50);

    let mut rx = vec![0u8; 128];
    t.exchange(&[], &mut rx).unwrap();
    assert_eq!(rig.bus.transfers(), 2);
}

#[test]
fn failed_cs_assert_skips_transfer_and_still_releases() {
    let rig = Rig::new();
    rig.cs.fail_low(true);
    let mut t = rig.transport();

    let mut rx = [0u8; 4];
    assert_eq!(t.exchange(&[1, 2, 3, 4], &mut rx), Err(DeviceError::Io));
    assert_eq!(rig.bus.transfers(), 0);
    assert_eq!(rig.cs.history(), vec![true]);
}

#[test]
fn consecutive_exchanges_each_framed() {
    let rig = Rig::new();
    let mut t = rig.transport();

    let mut rx = [0u8; 2];
    for _ in 0..3 {
        t.exchange(&[0, 0], &mut rx).unwrap();
    }
    assert_eq!(rig.cs.history(), vec![false, true, false, true, false, true]);
}

#[test]
fn reset_levels_drive_line() {
    let rig = Rig::with_separate_awake();
    let mut t = rig.transport();

    t.set_reset_pin(PinValue::Low).unwrap();
    t.set_reset_pin(PinValue::High).unwrap();
    assert_eq!(rig.reset.history(), vec![false, true]);
}

#[test]
fn unknown_reset_value_does_not_touch_line() {
    let rig = Rig::with_separate_awake();
    let mut t = rig.transport();

    assert_eq!(t.set_reset_pin(PinValue::Unknown), Err(DeviceError::InvalidArgument));
    assert!(rig.reset.history().is_empty());
    assert!(!rig.reset.is_set());
}

#[test]
fn awake_active_high_passes_level_through() {
    let rig = Rig::with_separate_awake();
    let mut t = rig.transport();

    assert_eq!(t.awake_pin(), Ok(PinValue::Low));
    rig.awake.drive(true);
    assert_eq!(t.awake_pin(), Ok(PinValue::High));
}

#[test]
fn awake_active_low_is_inverted() {
    let rig = Rig::with_separate_awake();
    let mut t = rig.transport().with_polarity(AwakePolarity::ActiveLow);

    assert_eq!(t.awake_pin(), Ok(PinValue::High));
    rig.awake.drive(true);
    assert_eq!(t.awake_pin(), Ok(PinValue::Low));
}

#[test]
fn awake_read_failure_is_io() {
    let rig = Rig::with_separate_awake();
    rig.awake.fail_reads(true);
    let mut t = rig.transport();

    assert_eq!(t.awake_pin(), Err(DeviceError::Io));
}

#[test]
fn configure_applies_polarity_and_timeout() {
    let rig = Rig::with_separate_awake();
    let mut t = rig.transport();
    let cfg = StationConfig {
        awake_polarity: AwakePolarity::ActiveLow,
        exchange_timeout_ms: 20,
        ..Default::default()
    };
    t.configure(&cfg);

    assert_eq!(t.polarity(), AwakePolarity::ActiveLow);
    assert_eq!(t.timeout_ms(), 20);
}

#[test]
fn delay_advances_timestamp() {
    let rig = Rig::new();
    let mut t = rig.transport();

    let before = t.timestamp_ms();
    t.delay_us(5_000);
    assert_eq!(t.timestamp_ms(), before + 5);
}

#[test]
fn timestamp_holds_when_clock_steps_back() {
    let rig = Rig::new();
    let mut t = rig.transport();

    rig.clock.set(1_000);
    assert_eq!(t.timestamp_ms(), 1_000);
    rig.clock.set(900);
    assert_eq!(t.timestamp_ms(), 1_000);
    rig.clock.set(1_010);
    assert_eq!(t.timestamp_ms(), 1_010);
}

#[test]
fn timestamp_follows_counter_across_wrap() {
    let rig = Rig::new();
    let mut t = rig.transport();

    rig.clock.set(u32::MAX - 1);
    assert_eq!(t.timestamp_ms(), u32::MAX - 1);
    rig.clock.advance(3);
    assert_eq!(t.timestamp_ms(), 1);
}

#[test]
fn timestamp_advances_after_long_idle() {
    let rig = Rig::new();
    let mut t = rig.transport();

    rig.clock.set(1_000);
    assert_eq!(t.timestamp_ms(), 1_000);
    // Station left idle for just over 24.8 days.
    rig.clock.set(1_000u32.wrapping_add(0x8000_0000));
    let after_idle = t.timestamp_ms();
    assert_eq!(after_idle, rig.clock.now_ms());
    rig.clock.advance(60_000);
    assert_eq!(t.timestamp_ms(), after_idle + 60_000);
}
