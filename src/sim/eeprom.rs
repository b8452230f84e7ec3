//! RAM-backed two-page EEPROM emulation.
//!
//! Models the usual flash EEPROM-emulation scheme: each page is an
//! append-only log of `(address, value)` records.  A read returns the most
//! recent record for the address.  When the active page fills, the latest
//! value of every address is copied to the other page, which then becomes
//! active and the old page is erased.
//!
//! Reads and writes can be made to fail per address for fault-injection
//! tests.

use std::collections::HashMap;

use crate::app::ports::EepromEmulation;
use crate::error::EmulationError;
use crate::storage::VirtAddr;

/// Records per page.  A 16 KiB sector holds 4096 four-byte records less
/// the page header.
pub const DEFAULT_PAGE_RECORDS: usize = 4095;

#[derive(Debug, Clone, Copy)]
struct Record {
    address: VirtAddr,
    value: u16,
}

#[derive(Debug, Default)]
struct Page {
    records: Vec<Record>,
    erase_count: u32,
}

pub struct RamEeprom {
    pages: [Page; 2],
    active: usize,
    page_records: usize,
    read_faults: HashMap<VirtAddr, EmulationError>,
    write_faults: HashMap<VirtAddr, EmulationError>,
    write_log: Vec<VirtAddr>,
}

impl RamEeprom {
    pub fn new() -> Self {
        Self::with_page_records(DEFAULT_PAGE_RECORDS)
    }

    pub fn with_page_records(page_records: usize) -> Self {
        Self {
            pages: [Page::default(), Page::default()],
            active: 0,
            page_records,
            read_faults: HashMap::new(),
            write_faults: HashMap::new(),
            write_log: Vec::new(),
        }
    }

    /// Make every read of `address` fail with `error`.
    pub fn fail_reads_at(&mut self, address: VirtAddr, error: EmulationError) {
        self.read_faults.insert(address, error);
    }

    /// Make every write of `address` fail with `error`.
    pub fn fail_writes_at(&mut self, address: VirtAddr, error: EmulationError) {
        self.write_faults.insert(address, error);
    }

    pub fn clear_faults(&mut self) {
        self.read_faults.clear();
        self.write_faults.clear();
    }

    /// Addresses of successful writes, in call order.
    pub fn write_log(&self) -> &[VirtAddr] {
        &self.write_log
    }

    /// Total page erases so far, a proxy for flash wear.
    pub fn erase_count(&self) -> u32 {
        self.pages.iter().map(|p| p.erase_count).sum()
    }

    /// Erase both pages, as after a fresh flash of the part.
    pub fn format(&mut self) {
        for page in &mut self.pages {
            page.records.clear();
            page.erase_count += 1;
        }
        self.active = 0;
    }

    fn latest(&self, address: VirtAddr) -> Option<u16> {
        self.pages[self.active]
            .records
            .iter()
            .rev()
            .find(|r| r.address == address)
            .map(|r| r.value)
    }

    /// Copy the latest value of every address except `skip` to the spare
    /// page and switch to it.
    fn transfer(&mut self, skip: VirtAddr) -> Result<(), EmulationError> {
        let spare = 1 - self.active;
        let mut live: Vec<Record> = Vec::new();
        for record in self.pages[self.active].records.iter().rev() {
            if record.address != skip && !live.iter().any(|r| r.address == record.address) {
                live.push(*record);
            }
        }
        // One slot is needed for the record that triggered the transfer.
        if live.len() >= self.page_records {
            return Err(EmulationError::PageFull);
        }
        live.reverse();

        self.pages[spare].records = live;
        self.pages[self.active].records.clear();
        self.pages[self.active].erase_count += 1;
        self.active = spare;
        Ok(())
    }
}

impl Default for RamEeprom {
    fn default() -> Self {
        Self::new()
    }
}

impl EepromEmulation for RamEeprom {
    fn read_variable(&mut self, address: VirtAddr) -> Result<u16, EmulationError> {
        if let Some(&error) = self.read_faults.get(&address) {
            return Err(error);
        }
        self.latest(address).ok_or(EmulationError::VariableNotFound)
    }

    fn write_variable(&mut self, address: VirtAddr, value: u16) -> Result<(), EmulationError> {
        if let Some(&error) = self.write_faults.get(&address) {
            return Err(error);
        }
        // 0xFFFF is the erased-flash pattern and can never be a valid address.
        if address == VirtAddr::MAX {
            return Err(EmulationError::Flash);
        }
        if self.pages[self.active].records.len() >= self.page_records {
            self.transfer(address)?;
        }
        self.pages[self.active].records.push(Record { address, value });
        self.write_log.push(address);
        Ok(())
    }
}
