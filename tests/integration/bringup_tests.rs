//! Orchestrator bring-up against the simulated sensor over a mocked SPI
//! transport.  The central property: whatever fails, no handle survives.

use fpstation::app::bringup::{BringUpState, BringUpStep, Orchestrator};
use fpstation::app::device::{FirmwareVersion, ScanFormat, ScanRequest, ScanStatus};
use fpstation::app::events::AppEvent;
use fpstation::app::ports::SensorDriver;
use fpstation::error::DeviceError;
use fpstation::sim::{SimCall, SimSensor};

use crate::mock_hw::{MockTransport, RecordingSink, Rig};

fn orchestrator(rig: &Rig, sensor: SimSensor) -> Orchestrator<SimSensor, MockTransport> {
    let mut sensor = sensor;
    SensorDriver::<MockTransport>::initialize(&mut sensor).unwrap();
    Orchestrator::new(sensor, rig.transport())
}

#[test]
fn bring_up_reaches_ready_with_device_info() {
    let rig = Rig::new();
    let mut orch = orchestrator(&rig, SimSensor::new());
    let mut sink = RecordingSink::new();

    let info = orch.bring_up(&mut sink).unwrap().clone();

    assert_eq!(info.firmware, FirmwareVersion { major: 2, minor: 1, build: 30, revision: 0 });
    assert_eq!(info.serial_number.as_str(), "NB2023S0001234");
    assert_eq!(info.scan_formats.as_slice(), &[ScanFormat::Partial, ScanFormat::Full12x17]);
    assert_eq!(info.format_info.format, ScanFormat::Partial);
    assert_eq!((info.format_info.width, info.format_info.height), (180, 180));

    assert_eq!(orch.state(), BringUpState::Ready);
    assert_eq!(sink.states(), vec![BringUpState::Connected, BringUpState::Ready]);
    assert_eq!(sink.count(|e| matches!(e, AppEvent::DeviceReady(_))), 1);
    assert_eq!(orch.driver().live_handles(), &[1]);
    assert_eq!(rig.bus.unframed(), 0);
}

#[test]
fn connect_pulses_reset() {
    let rig = Rig::new();
    let mut orch = orchestrator(&rig, SimSensor::new());
    orch.bring_up(&mut RecordingSink::new()).unwrap();

    assert_eq!(rig.reset.history(), vec![false, true]);
}

#[test]
fn fault_at_any_step_leaves_no_handle() {
    for step in BringUpStep::ALL {
        let rig = Rig::new();
        let mut sensor = SimSensor::new();
        sensor.fail(step, DeviceError::CommunicationFailed);
        let mut orch = orchestrator(&rig, sensor);
        let mut sink = RecordingSink::new();

        let err = orch.bring_up(&mut sink).unwrap_err();

        assert_eq!(err.step, step, "wrong step reported");
        assert_eq!(err.cause, DeviceError::CommunicationFailed);
        assert_eq!(orch.state(), BringUpState::Failed, "{}", step.name());
        assert!(!orch.has_handle(), "{}: handle still held", step.name());
        assert!(orch.info().is_none());
        assert!(orch.driver().live_handles().is_empty(), "{}: handle leaked", step.name());

        if step == BringUpStep::Connect {
            assert_eq!(orch.driver().connects(), 0);
            assert!(orch.driver().destroyed_handles().is_empty());
        } else {
            assert_eq!(orch.driver().destroyed_handles(), &[1], "{}", step.name());
        }
        assert_eq!(sink.states().last(), Some(&BringUpState::Failed));
    }
}

#[test]
fn empty_format_list_fails_at_format_info() {
    let rig = Rig::new();
    let mut sensor = SimSensor::new();
    sensor.formats.clear();
    let mut orch = orchestrator(&rig, sensor);

    let err = orch.bring_up(&mut RecordingSink::new()).unwrap_err();

    assert_eq!(err.step, BringUpStep::ScanFormatInfo);
    assert_eq!(err.cause, DeviceError::NotSupported);
    assert!(orch.driver().live_handles().is_empty());
    assert_eq!(orch.driver().destroyed_handles(), &[1]);
}

#[test]
fn sensor_that_never_wakes_fails_connect() {
    let rig = Rig::with_separate_awake();
    let mut orch = orchestrator(&rig, SimSensor::new());

    let err = orch.bring_up(&mut RecordingSink::new()).unwrap_err();

    assert_eq!(err.step, BringUpStep::Connect);
    assert_eq!(err.cause, DeviceError::DeviceNotActive);
    assert!(!orch.has_handle());
    assert_eq!(orch.driver().connects(), 0);
}

#[test]
fn bus_failure_during_query_destroys_handle() {
    let rig = Rig::new();
    let mut orch = orchestrator(&rig, SimSensor::new());
    // Transfer 0 is the connect frame; the firmware query is next.
    rig.bus.set_fault(crate::mock_hw::BusFault::ErrorAt(1));

    let err = orch.bring_up(&mut RecordingSink::new()).unwrap_err();

    assert_eq!(err.step, BringUpStep::FirmwareVersion);
    assert_eq!(err.cause, DeviceError::Failed);
    assert!(orch.driver().live_handles().is_empty());
    assert!(rig.cs.is_set());
}

#[test]
fn destroy_is_idempotent() {
    let rig = Rig::new();
    let mut orch = orchestrator(&rig, SimSensor::new());
    let mut sink = RecordingSink::new();
    orch.bring_up(&mut sink).unwrap();

    orch.destroy(&mut sink).unwrap();
    orch.destroy(&mut sink).unwrap();

    assert_eq!(orch.state(), BringUpState::Disconnected);
    assert_eq!(orch.driver().destroyed_handles(), &[1]);
    assert_eq!(
        sink.states(),
        vec![BringUpState::Connected, BringUpState::Ready, BringUpState::Disconnected]
    );
}

#[test]
fn destroy_on_fresh_orchestrator_is_noop() {
    let rig = Rig::new();
    let mut orch = orchestrator(&rig, SimSensor::new());
    let mut sink = RecordingSink::new();

    orch.destroy(&mut sink).unwrap();

    assert!(sink.events.is_empty());
    assert!(orch.driver().destroyed_handles().is_empty());
}

#[test]
fn destroy_error_still_releases_handle() {
    let rig = Rig::new();
    let mut orch = orchestrator(&rig, SimSensor::new());
    let mut sink = RecordingSink::new();
    orch.bring_up(&mut sink).unwrap();
    orch.driver_mut().fail(SimCall::Destroy, DeviceError::Failed);

    assert_eq!(orch.destroy(&mut sink), Err(DeviceError::Failed));
    assert!(!orch.has_handle());
    assert!(orch.driver().live_handles().is_empty());
    assert_eq!(orch.destroy(&mut sink), Ok(()));
}

#[test]
fn second_bring_up_while_held_is_rejected() {
    let rig = Rig::new();
    let mut orch = orchestrator(&rig, SimSensor::new());
    let mut sink = RecordingSink::new();
    orch.bring_up(&mut sink).unwrap();

    let err = orch.bring_up(&mut sink).unwrap_err();

    assert_eq!(err.cause, DeviceError::InvalidOperation);
    assert_eq!(orch.state(), BringUpState::Ready);
    assert_eq!(orch.driver().live_handles(), &[1]);
    assert_eq!(orch.driver().connects(), 1);
}

#[test]
fn retry_after_failure_gets_fresh_handle() {
    let rig = Rig::new();
    let mut sensor = SimSensor::new();
    sensor.fail(BringUpStep::SerialNumber, DeviceError::Timeout);
    let mut orch = orchestrator(&rig, sensor);
    let mut sink = RecordingSink::new();

    assert!(orch.bring_up(&mut sink).is_err());
    orch.driver_mut().clear_faults();
    orch.bring_up(&mut sink).unwrap();

    assert_eq!(orch.state(), BringUpState::Ready);
    assert_eq!(orch.driver().live_handles(), &[2]);
    assert_eq!(orch.driver().destroyed_handles(), &[1]);
}

#[test]
fn drop_destroys_held_handle() {
    let rig = Rig::new();
    {
        let mut orch = orchestrator(&rig, SimSensor::new());
        orch.bring_up(&mut RecordingSink::new()).unwrap();
    }
    // Connect pulses reset low then high; destroy drives it low again.
    assert_eq!(rig.reset.history(), vec![false, true, false]);
}

#[test]
fn scan_requires_ready() {
    let rig = Rig::new();
    let mut orch = orchestrator(&rig, SimSensor::new());
    let mut image = vec![0u8; 180 * 180];
    let mut request = ScanRequest {
        format: ScanFormat::Partial,
        timeout_ms: -1,
        flags: 0,
        image: &mut image,
        preview: None,
    };

    assert_eq!(orch.scan(&mut request), Err(DeviceError::InvalidOperation));
}

#[test]
fn scan_when_ready_fills_image() {
    let rig = Rig::new();
    let mut orch = orchestrator(&rig, SimSensor::new());
    orch.bring_up(&mut RecordingSink::new()).unwrap();

    let mut image = vec![0u8; 180 * 180];
    let mut request = ScanRequest {
        format: ScanFormat::Partial,
        timeout_ms: -1,
        flags: 0,
        image: &mut image,
        preview: None,
    };

    assert_eq!(orch.scan(&mut request), Ok(ScanStatus::Ok));
    // Loopback inverts the zero filler.
    assert!(image.iter().all(|&b| b == 0xFF));
    assert!(rig.cs.is_set());
    assert_eq!(rig.bus.unframed(), 0);
}
