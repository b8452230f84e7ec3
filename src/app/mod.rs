//! Application core: station logic with all I/O behind ports.
//!
//! This module contains the rules for bringing up the fingerprint sensor
//! and running a capture: connect, query, scan, and guaranteed teardown.
//! All interaction with hardware happens through **port traits** defined
//! in [`ports`], keeping this layer fully testable without real peripherals.

pub mod bringup;
pub mod device;
pub mod events;
pub mod ports;
pub mod service;
