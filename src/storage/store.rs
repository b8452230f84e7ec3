//! Persistent key-indexed variable store.
//!
//! Maps a fixed-size [`ParameterArray`] onto the EEPROM emulation driver
//! through an [`AddressTable`].  The store keeps no copy of the values:
//! every read goes back to the driver, so callers always observe durable
//! state.  Slots are visited in ascending address order to keep the
//! driver's page-transfer locality predictable.

use core::ops::{Deref, DerefMut, Range};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::EepromEmulation;
use crate::error::{EmulationError, StoreError};

use super::address::{AddressTable, ParameterGroup, VirtAddr};

/// What a bulk read does when a single slot fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReadPolicy {
    /// Leave the slot's prior value in place, log, and continue.
    #[default]
    BestEffort,
    /// Stop at the first failing slot and report it.
    Abort,
}

/// Outcome of a bulk read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadSummary {
    /// Slots refreshed from the driver.
    pub read: usize,
    /// Slots the driver has never seen written; prior value kept.
    pub unwritten: usize,
    /// Slots that failed under [`ReadPolicy::BestEffort`]; prior value kept.
    pub skipped: usize,
}

// ---------------------------------------------------------------------------
// Parameter array
// ---------------------------------------------------------------------------

/// Caller-owned working copy of the durable parameters, one word per slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterArray<const N: usize> {
    values: [u16; N],
}

impl<const N: usize> ParameterArray<N> {
    pub const fn zeroed() -> Self {
        Self { values: [0; N] }
    }

    pub const fn from_array(values: [u16; N]) -> Self {
        Self { values }
    }

    pub fn into_array(self) -> [u16; N] {
        self.values
    }

    /// Values belonging to `group`, or `None` if it lies outside the array.
    pub fn group(&self, group: &ParameterGroup) -> Option<&[u16]> {
        self.values.get(group.slots())
    }
}

impl<const N: usize> Default for ParameterArray<N> {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl<const N: usize> Deref for ParameterArray<N> {
    type Target = [u16];

    fn deref(&self) -> &[u16] {
        &self.values
    }
}

impl<const N: usize> DerefMut for ParameterArray<N> {
    fn deref_mut(&mut self) -> &mut [u16] {
        &mut self.values
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Bulk read/write of `N` 16-bit parameters over an emulation driver.
pub struct VariableStore<E, const N: usize> {
    eeprom: E,
    table: AddressTable<N>,
    policy: ReadPolicy,
}

impl<E: EepromEmulation, const N: usize> VariableStore<E, N> {
    pub fn new(eeprom: E, policy: ReadPolicy) -> Self {
        Self {
            eeprom,
            table: AddressTable::new(),
            policy,
        }
    }

    /// Build the address table, zero-fill a working array and load it from
    /// the driver.
    pub fn init(eeprom: E, policy: ReadPolicy) -> Result<(Self, ParameterArray<N>), StoreError> {
        let mut store = Self::new(eeprom, policy);
        let mut params = ParameterArray::zeroed();
        let summary = store.read_all(&mut params)?;
        info!(
            "VariableStore: init {} slots ({} read, {} unwritten, {} skipped)",
            N, summary.read, summary.unwritten, summary.skipped
        );
        Ok((store, params))
    }

    /// Refresh every slot of `params` from the driver.
    pub fn read_all(&mut self, params: &mut ParameterArray<N>) -> Result<ReadSummary, StoreError> {
        self.read_range(0..N, params)
    }

    /// Refresh only the slots of `group`.
    pub fn read_group(
        &mut self,
        group: &ParameterGroup,
        params: &mut ParameterArray<N>,
    ) -> Result<ReadSummary, StoreError> {
        if group.end() > N {
            return Err(StoreError::CountExceedsCapacity {
                count: group.end(),
                capacity: N,
            });
        }
        self.read_range(group.slots(), params)
    }

    /// Write `values[..count]` to slots `0..count`.
    ///
    /// Stops at the first failing slot; slots before it stay written.
    pub fn write_some(&mut self, values: &[u16], count: usize) -> Result<(), StoreError> {
        if count > N {
            return Err(StoreError::CountExceedsCapacity { count, capacity: N });
        }
        if values.len() < count {
            return Err(StoreError::SourceTooShort {
                count,
                available: values.len(),
            });
        }
        self.write_from(0, &values[..count])
    }

    /// Write `values` into `group`, starting at its first slot.
    pub fn write_group(&mut self, group: &ParameterGroup, values: &[u16]) -> Result<(), StoreError> {
        if values.len() > group.len || group.end() > N {
            return Err(StoreError::CountExceedsCapacity {
                count: group.index + values.len(),
                capacity: group.end().min(N),
            });
        }
        self.write_from(group.index, values)
    }

    pub fn table(&self) -> &AddressTable<N> {
        &self.table
    }

    pub fn policy(&self) -> ReadPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: ReadPolicy) {
        self.policy = policy;
    }

    pub fn eeprom(&self) -> &E {
        &self.eeprom
    }

    pub fn eeprom_mut(&mut self) -> &mut E {
        &mut self.eeprom
    }

    pub fn into_inner(self) -> E {
        self.eeprom
    }

    fn read_range(
        &mut self,
        slots: Range<usize>,
        params: &mut ParameterArray<N>,
    ) -> Result<ReadSummary, StoreError> {
        let mut summary = ReadSummary::default();

        for slot in slots {
            let address = self.address(slot);
            match self.eeprom.read_variable(address) {
                Ok(value) => {
                    params[slot] = value;
                    summary.read += 1;
                }
                Err(EmulationError::VariableNotFound) => summary.unwritten += 1,
                Err(cause) => match self.policy {
                    ReadPolicy::BestEffort => {
                        warn!(
                            "VariableStore: slot {} (addr {}) read failed: {}, keeping prior value",
                            slot, address, cause
                        );
                        summary.skipped += 1;
                    }
                    ReadPolicy::Abort => {
                        warn!("VariableStore: slot {} (addr {}) read failed: {}", slot, address, cause);
                        return Err(StoreError::Read { slot, address, cause });
                    }
                },
            }
        }

        debug!(
            "VariableStore: read {} / unwritten {} / skipped {}",
            summary.read, summary.unwritten, summary.skipped
        );
        Ok(summary)
    }

    fn write_from(&mut self, first_slot: usize, values: &[u16]) -> Result<(), StoreError> {
        for (offset, &value) in values.iter().enumerate() {
            let slot = first_slot + offset;
            let address = self.address(slot);
            self.eeprom
                .write_variable(address, value)
                .map_err(|cause| {
                    warn!("VariableStore: slot {} (addr {}) write failed: {}", slot, address, cause);
                    StoreError::Write { slot, address, cause }
                })?;
        }
        debug!("VariableStore: wrote {} slots from {}", values.len(), first_slot);
        Ok(())
    }

    /// Callers have already bounds-checked `slot` against `N`.
    fn address(&self, slot: usize) -> VirtAddr {
        self.table.as_slice()[slot]
    }
}
