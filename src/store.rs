// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Active-slot config store.
//!
//! One flash sector holds an append-only log of slot selections, indexed at
//! two levels:
//!
//! ```text
//! sector = 16 pages x 256 bytes
//! page   = pages_bitmap:u32 | tuples_bitmap:u32 | 31 x { slot:u32, reserved:u32 }
//! ```
//!
//! The active page is the lowest still-set bit of page 0's pages bitmap; the
//! active tuple is the lowest still-set bit of that page's tuples bitmap.
//! Advancing only clears bits, so 16 x 31 = 496 selections fit between two
//! erases of the sector.

use byteorder::{ByteOrder, LittleEndian};

use crate::config::{CONFIG_SECTOR_OFFSET, DEFAULT_SLOT, FLASH_PAGE_SIZE, PAGES_PER_SECTOR};
use crate::error::FlashResult;
use crate::flash::Flash;
use crate::protocol::Slot;

pub const LOG_PAGES: usize = PAGES_PER_SECTOR;
pub const TUPLES_PER_PAGE: usize = 31;

/// Selections recorded between two erases of the config sector.
pub const ENTRIES_PER_ERASE: usize = LOG_PAGES * TUPLES_PER_PAGE;

/// Allocation bitmap. Set bits are free-or-active, cleared bits are used.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AllocationBitmap(u32);

impl AllocationBitmap {
    pub const ERASED: Self = AllocationBitmap(u32::MAX);

    pub fn from_bits(bits: u32) -> Self {
        AllocationBitmap(bits)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    /// Index of the lowest still-set bit, i.e. the active entry.
    pub fn lowest_set(self) -> Option<usize> {
        if self.0 == 0 {
            None
        } else {
            Some(self.0.trailing_zeros() as usize)
        }
    }

    /// Clear every bit below `index`, making `index` the lowest set bit.
    pub fn clear_below(self, index: usize) -> Self {
        let below = (1u32 << index) - 1;
        AllocationBitmap(self.0 & !below)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConfigTuple {
    pub slot: u32,
    pub reserved: u32,
}

impl ConfigTuple {
    pub const SIZE: usize = 8;
}

/// In-memory copy of one 256-byte log page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigPage {
    pub pages: AllocationBitmap,
    pub tuples: AllocationBitmap,
    pub entries: [ConfigTuple; TUPLES_PER_PAGE],
}

impl ConfigPage {
    pub const SIZE: usize = 4 + 4 + TUPLES_PER_PAGE * ConfigTuple::SIZE;

    pub fn from_bytes(buf: &[u8; Self::SIZE]) -> Self {
        let mut entries = [ConfigTuple { slot: u32::MAX, reserved: u32::MAX }; TUPLES_PER_PAGE];
        for (i, entry) in entries.iter_mut().enumerate() {
            let at = 8 + i * ConfigTuple::SIZE;
            entry.slot = LittleEndian::read_u32(&buf[at..at + 4]);
            entry.reserved = LittleEndian::read_u32(&buf[at + 4..at + 8]);
        }
        Self {
            pages: AllocationBitmap(LittleEndian::read_u32(&buf[0..4])),
            tuples: AllocationBitmap(LittleEndian::read_u32(&buf[4..8])),
            entries,
        }
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        LittleEndian::write_u32(&mut buf[0..4], self.pages.0);
        LittleEndian::write_u32(&mut buf[4..8], self.tuples.0);
        for (i, entry) in self.entries.iter().enumerate() {
            let at = 8 + i * ConfigTuple::SIZE;
            LittleEndian::write_u32(&mut buf[at..at + 4], entry.slot);
            LittleEndian::write_u32(&mut buf[at + 4..at + 8], entry.reserved);
        }
        buf
    }
}

/// Position of an entry in the two-level log.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LogPosition {
    pub page: usize,
    pub tuple: usize,
}

impl LogPosition {
    pub const START: Self = LogPosition { page: 0, tuple: 0 };

    /// The following position, and whether the log wrapped (sector must be
    /// erased before writing there).
    pub fn next(self) -> (Self, bool) {
        if self.tuple + 1 < TUPLES_PER_PAGE {
            return (LogPosition { page: self.page, tuple: self.tuple + 1 }, false);
        }
        if self.page + 1 < LOG_PAGES {
            return (LogPosition { page: self.page + 1, tuple: 0 }, false);
        }
        (Self::START, true)
    }
}

/// Locates and appends slot selections in the config sector. Holds no state
/// besides the sector offset; callers serialise access.
#[derive(Clone, Copy, Debug)]
pub struct ConfigStore {
    offset: usize,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(CONFIG_SECTOR_OFFSET)
    }
}

impl ConfigStore {
    pub fn new(offset: usize) -> Self {
        Self { offset }
    }

    pub fn sector_offset(&self) -> usize {
        self.offset
    }

    fn page_offset(&self, page: usize) -> usize {
        self.offset + page * FLASH_PAGE_SIZE
    }

    pub fn read_page<F: Flash + ?Sized>(&self, flash: &F, page: usize) -> FlashResult<ConfigPage> {
        let mut buf = [0u8; ConfigPage::SIZE];
        flash.read(self.page_offset(page), &mut buf)?;
        Ok(ConfigPage::from_bytes(&buf))
    }

    /// Active entry and the page holding it. `None` when a bitmap points
    /// outside the log, which only happens on corrupt flash.
    pub fn locate<F: Flash + ?Sized>(&self, flash: &F) -> FlashResult<Option<(LogPosition, ConfigPage)>> {
        let first = self.read_page(flash, 0)?;
        let page = match first.pages.lowest_set() {
            Some(page) if page < LOG_PAGES => page,
            _ => return Ok(None),
        };
        let current = if page == 0 { first } else { self.read_page(flash, page)? };
        match current.tuples.lowest_set() {
            Some(tuple) if tuple < TUPLES_PER_PAGE => Ok(Some((LogPosition { page, tuple }, current))),
            _ => Ok(None),
        }
    }

    /// Slot recorded as active. Virgin, corrupt or unreadable records
    /// resolve to the default slot.
    pub fn get_active_slot<F: Flash + ?Sized>(&self, flash: &F) -> Slot {
        let recorded = match self.locate(flash) {
            Ok(Some((pos, page))) => Slot::new(page.entries[pos.tuple].slot),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("config sector unreadable: {}", e);
                None
            }
        };
        recorded.unwrap_or_else(default_slot)
    }

    /// Append `slot` as the new active selection.
    pub fn set_active_slot<F: Flash + ?Sized>(&self, flash: &mut F, slot: Slot) -> FlashResult<()> {
        let current = self.locate(flash)?.map(|(pos, _)| pos);
        let (next, wrapped) = match current {
            Some(pos) => pos.next(),
            None => (LogPosition::START, true),
        };

        if wrapped {
            tracing::debug!("config log exhausted, erasing sector at {:#x}", self.offset);
            flash.erase_sector(self.offset)?;
        }

        let page_changed = current.map_or(true, |pos| pos.page != next.page);

        let mut page = self.read_page(flash, next.page)?;
        if page_changed {
            page.pages = page.pages.clear_below(next.page);
        }
        page.tuples = page.tuples.clear_below(next.tuple);
        page.entries[next.tuple].slot = slot.get() as u32;
        flash.program(self.page_offset(next.page), &page.to_bytes())?;

        if page_changed && next.page != 0 {
            let mut first = self.read_page(flash, 0)?;
            first.pages = first.pages.clear_below(next.page);
            flash.program(self.page_offset(0), &first.to_bytes())?;
        }

        tracing::debug!(page = next.page, tuple = next.tuple, slot = slot.get(), "active slot recorded");
        Ok(())
    }
}

fn default_slot() -> Slot {
    match Slot::new(DEFAULT_SLOT as u32) {
        Some(slot) => slot,
        None => unreachable!("default slot is in range"),
    }
}

const _: () = assert!(ConfigPage::SIZE == FLASH_PAGE_SIZE);
