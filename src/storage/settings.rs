//! Station settings persisted in the `SETTINGS` parameter group.
//!
//! The config is postcard-encoded and packed two bytes per word:
//!
//! ```text
//!  word 0      : 0x5A00 | byte_len
//!  word 1..=15 : payload bytes, little-endian pairs
//! ```
//!
//! An all-zero group (never written) loads as [`StationConfig::default()`].

use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigPort, EepromEmulation};
use crate::config::{StationConfig, validate_config};

use super::address::{SETTINGS, SETTINGS_WORDS};
use super::store::{ParameterArray, VariableStore};

const HEADER_MAGIC: u16 = 0x5A00;
const HEADER_MAGIC_MASK: u16 = 0xFF00;
const MAX_PAYLOAD: usize = (SETTINGS_WORDS - 1) * 2;

/// [`ConfigPort`] backed by a [`VariableStore`].
pub struct SettingsStore<'a, E, const N: usize> {
    store: &'a mut VariableStore<E, N>,
}

impl<'a, E: EepromEmulation, const N: usize> SettingsStore<'a, E, N> {
    pub fn new(store: &'a mut VariableStore<E, N>) -> Self {
        Self { store }
    }
}

impl<E: EepromEmulation, const N: usize> ConfigPort for SettingsStore<'_, E, N> {
    fn load(&mut self) -> Result<StationConfig, ConfigError> {
        let mut params = ParameterArray::<N>::zeroed();
        self.store
            .read_group(&SETTINGS, &mut params)
            .map_err(|_| ConfigError::IoError)?;
        let words = params.group(&SETTINGS).ok_or(ConfigError::IoError)?;

        match decode(words)? {
            Some(cfg) => {
                info!("SettingsStore: loaded config from store");
                Ok(cfg)
            }
            None => {
                info!("SettingsStore: no stored config, using defaults");
                Ok(StationConfig::default())
            }
        }
    }

    fn save(&mut self, config: &StationConfig) -> Result<(), ConfigError> {
        validate_config(config)?;
        let words = encode(config)?;
        self.store.write_group(&SETTINGS, &words).map_err(|e| {
            warn!("SettingsStore: write failed: {}", e);
            ConfigError::IoError
        })?;
        info!("SettingsStore: config saved ({} bytes)", words[0] & !HEADER_MAGIC_MASK);
        Ok(())
    }
}

fn encode(config: &StationConfig) -> Result<[u16; SETTINGS_WORDS], ConfigError> {
    let mut bytes = [0u8; MAX_PAYLOAD];
    let used = postcard::to_slice(config, &mut bytes)
        .map_err(|_| ConfigError::TooLarge)?
        .len();

    let mut words = [0u16; SETTINGS_WORDS];
    words[0] = HEADER_MAGIC | used as u16;
    for (word, pair) in words[1..].iter_mut().zip(bytes.chunks(2)) {
        *word = u16::from_le_bytes([pair[0], pair[1]]);
    }
    Ok(words)
}

fn decode(words: &[u16]) -> Result<Option<StationConfig>, ConfigError> {
    let Some((&header, payload)) = words.split_first() else {
        return Err(ConfigError::IoError);
    };
    if header == 0 {
        return Ok(None);
    }
    if header & HEADER_MAGIC_MASK != HEADER_MAGIC {
        return Err(ConfigError::Corrupted);
    }
    let len = (header & !HEADER_MAGIC_MASK) as usize;
    if len > MAX_PAYLOAD {
        return Err(ConfigError::Corrupted);
    }

    let mut bytes = [0u8; MAX_PAYLOAD];
    for (pair, word) in bytes.chunks_mut(2).zip(payload) {
        pair.copy_from_slice(&word.to_le_bytes());
    }
    let cfg: StationConfig =
        postcard::from_bytes(&bytes[..len]).map_err(|_| ConfigError::Corrupted)?;
    validate_config(&cfg).map_err(|_| ConfigError::Corrupted)?;
    Ok(Some(cfg))
}
