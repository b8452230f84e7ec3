//! Fuzz target: `SettingsStore::load`
//!
//! Writes arbitrary words into the settings group and loads them.  The
//! loader must never panic, and anything it accepts must pass validation
//! and survive a save/load cycle unchanged.
//!
//! cargo fuzz run fuzz_settings_decode

#![no_main]

use fpstation::app::ports::ConfigPort;
use fpstation::config::validate_config;
use fpstation::sim::RamEeprom;
use fpstation::storage::{NB_OF_VAR, ReadPolicy, SETTINGS, SettingsStore, VariableStore};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let words: Vec<u16> = data
        .chunks_exact(2)
        .take(SETTINGS.len)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();

    let mut store = VariableStore::<_, NB_OF_VAR>::new(RamEeprom::new(), ReadPolicy::Abort);
    store.write_group(&SETTINGS, &words).expect("write settings group");

    if let Ok(cfg) = SettingsStore::new(&mut store).load() {
        assert!(validate_config(&cfg).is_ok());
        SettingsStore::new(&mut store).save(&cfg).expect("re-save");
        assert_eq!(SettingsStore::new(&mut store).load(), Ok(cfg));
    }
});
