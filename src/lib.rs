//! Fingerprint station firmware library.
//!
//! Three load-bearing pieces sit under a thin application layer:
//!
//! - [`storage`]: a persistent variable store over EEPROM emulation
//! - [`transport`]: the capability set the sensor library calls for pin,
//!   timing and SPI access, plus its C-ABI table
//! - [`app::bringup`]: connect, query and guaranteed teardown of the sensor
//!
//! Host simulation backends live in [`sim`]; the vendor library binding in
//! [`drivers::nb_sdk`] links only with the `nb-sdk` feature.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod sim;
pub mod storage;
pub mod transport;
