//! Virtual address table and parameter-group layout.
//!
//! The EEPROM emulation driver is keyed by 16-bit virtual addresses.  Slot
//! `i` of the parameter array lives at address `i + 1`; address `0` is never
//! used and `0xFFFF` is the erased-flash pattern, so at most `0xFFFE` slots
//! can be mapped.
//!
//! ```text
//!  slot:     0      1      2    ...  199  | 200 ... 215
//!  address:  1      2      3    ...  200  | 201 ... 216
//!            └──────── fingerprint ──────┘ └─ settings ─┘
//! ```

use core::ops::Range;

use crate::error::StoreError;

/// Key into the emulation driver's address space.
pub type VirtAddr = u16;

/// Number of 16-bit words holding fingerprint configuration.
pub const FINGERPRINT_PIECES: usize = 200;

/// Number of 16-bit words reserved for the encoded station settings.
pub const SETTINGS_WORDS: usize = 16;

/// A named, contiguous run of slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterGroup {
    pub name: &'static str,
    /// First slot of the group.
    pub index: usize,
    /// Number of slots.
    pub len: usize,
}

impl ParameterGroup {
    pub const fn new(name: &'static str, index: usize, len: usize) -> Self {
        Self { name, index, len }
    }

    /// One past the last slot.
    pub const fn end(&self) -> usize {
        self.index + self.len
    }

    pub fn slots(&self) -> Range<usize> {
        self.index..self.end()
    }
}

pub const FINGERPRINT: ParameterGroup = ParameterGroup::new("fingerprint", 0, FINGERPRINT_PIECES);
pub const SETTINGS: ParameterGroup =
    ParameterGroup::new("settings", FINGERPRINT.end(), SETTINGS_WORDS);

/// Every group stored in the emulated EEPROM, in address order.
pub const LAYOUT: [ParameterGroup; 2] = [FINGERPRINT, SETTINGS];

/// Total number of variables.  The emulation driver must be configured for
/// exactly this many virtual addresses.
pub const NB_OF_VAR: usize = layout_len(&LAYOUT);

/// Sum of the group lengths.
pub const fn layout_len(groups: &[ParameterGroup]) -> usize {
    let mut total = 0;
    let mut i = 0;
    while i < groups.len() {
        total += groups[i].len;
        i += 1;
    }
    total
}

/// Check that `groups` tile `0..capacity` with no gaps, overlaps or empty
/// groups.
pub fn validate_layout(groups: &[ParameterGroup], capacity: usize) -> Result<(), StoreError> {
    let mut next = 0;
    for group in groups {
        if group.len == 0 {
            return Err(StoreError::InvalidLayout("empty parameter group"));
        }
        if group.index != next {
            return Err(StoreError::InvalidLayout("parameter groups are not contiguous"));
        }
        next = group.end();
    }
    if next != capacity {
        return Err(StoreError::InvalidLayout("layout does not match store capacity"));
    }
    Ok(())
}

const _: () = assert!(NB_OF_VAR == FINGERPRINT_PIECES + SETTINGS_WORDS);

// ---------------------------------------------------------------------------
// Address table
// ---------------------------------------------------------------------------

/// Fixed mapping from slot index to virtual address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressTable<const N: usize> {
    addrs: [VirtAddr; N],
}

impl<const N: usize> AddressTable<N> {
    /// Build the table: slot `i` ↦ address `i + 1`.
    pub fn new() -> Self {
        const { assert!(N < VirtAddr::MAX as usize, "address table exceeds 16-bit address space") };

        let mut addrs = [0; N];
        for (slot, addr) in addrs.iter_mut().enumerate() {
            *addr = (slot + 1) as VirtAddr;
        }
        Self { addrs }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Virtual address of `slot`, or `None` past the end of the table.
    pub fn address(&self, slot: usize) -> Option<VirtAddr> {
        self.addrs.get(slot).copied()
    }

    pub fn as_slice(&self) -> &[VirtAddr] {
        &self.addrs
    }

    /// `(slot, address)` pairs in ascending address order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, VirtAddr)> + '_ {
        self.addrs.iter().copied().enumerate()
    }
}

impl<const N: usize> Default for AddressTable<N> {
    fn default() -> Self {
        Self::new()
    }
}
