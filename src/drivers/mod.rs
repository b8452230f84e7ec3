//! Sensor library drivers.
//!
//! `nb_sdk` binds the vendor NBDevices library; its FFI entry points are
//! only linked with the `nb-sdk` feature.  The host simulation uses
//! [`crate::sim::SimSensor`] instead.

pub mod nb_sdk;
