//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to              |
//! |----------------|--------------------|--------------------------|
//! | `log_sink`     | EventSink          | Serial log output        |
//!
//! The transport, storage and sensor-library adapters live in
//! [`crate::transport`], [`crate::storage`] and [`crate::drivers`].

pub mod log_sink;

pub use log_sink::LogEventSink;
