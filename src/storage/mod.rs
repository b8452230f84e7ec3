//! Durable parameter storage on top of the EEPROM emulation driver.

pub mod address;
pub mod settings;
pub mod store;

pub use address::{AddressTable, FINGERPRINT, FINGERPRINT_PIECES, NB_OF_VAR, ParameterGroup, SETTINGS, VirtAddr};
pub use settings::SettingsStore;
pub use store::{ParameterArray, ReadPolicy, ReadSummary, VariableStore};
