//! Fingerprint station, host simulation entry point.
//!
//! Runs the same boot → bring-up → capture → teardown flow as the board,
//! with simulated peripherals behind the same port traits.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Adapters (outer ring)                    │
//! │                                                              │
//! │  RamEeprom        SpiTransport<SimBus, SimLine…>  SimSensor  │
//! │  (EepromEmulation) (DeviceTransport)         (SensorDriver)  │
//! │  LogEventSink (EventSink)                                    │
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ─────────────────      │
//! │                                                              │
//! │  VariableStore · SettingsStore · Orchestrator · Service      │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use anyhow::{Context, Result};
use log::info;

use fpstation::adapters::LogEventSink;
use fpstation::app::bringup::Orchestrator;
use fpstation::app::ports::ConfigPort;
use fpstation::app::service::StationService;
use fpstation::sim::{HostClock, HostCycles, RamEeprom, SimBus, SimLine, SimSensor};
use fpstation::storage::{FINGERPRINT, NB_OF_VAR, SettingsStore};
use fpstation::transport::{CycleDelay, SpiTransport};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("fpstation {} (host simulation)", env!("CARGO_PKG_VERSION"));

    let mut sink = LogEventSink::new();

    // ── Parameters ────────────────────────────────────────────
    let mut boot = StationService::boot::<_, NB_OF_VAR>(RamEeprom::new(), &mut sink)
        .context("loading parameters")?;
    let config = boot.config;

    // Seed a fingerprint template slot so the next boot has data to read.
    let template: Vec<u16> = (0..FINGERPRINT.len as u16).collect();
    boot.store
        .write_group(&FINGERPRINT, &template)
        .context("writing fingerprint group")?;
    SettingsStore::new(&mut boot.store)
        .save(&config)
        .context("saving settings")?;
    boot.store
        .read_all(&mut boot.params)
        .context("re-reading parameters")?;

    // ── Transport ─────────────────────────────────────────────
    // Reset drives the awake line directly: the sensor is awake whenever
    // it is out of reset.
    let reset = SimLine::new(false);
    let awake = reset.clone();
    let cs = SimLine::new(true);
    let delay = CycleDelay::new(HostCycles::new(config.core_clock_hz), config.core_clock_hz);
    let mut transport = SpiTransport::new(SimBus::new(0xA5), cs.clone(), reset, awake, delay, HostClock::new());
    transport.configure(&config);

    // ── Capture ───────────────────────────────────────────────
    let mut orch = Orchestrator::new(SimSensor::new(), transport).with_connect_flags(config.connect_flags);
    let service = StationService::new(config);
    let capture = service.run_capture(&mut orch, &mut sink).context("capture")?;

    info!(
        "done: status={:?} image={} bytes, {} finger detections, {} CS frames, {} events",
        capture.status,
        capture.image.len(),
        capture.finger_detections,
        cs.falling_edges(),
        sink.emitted()
    );
    Ok(())
}
