// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! NOR flash abstraction.
//!
//! Offsets are bytes from the start of the flash. Programming can only move
//! bits from 1 to 0; only an erase brings them back to 1.

use crate::config::{FLASH_PAGE_SIZE, FLASH_SECTOR_SIZE};
use crate::error::{FlashError, FlashResult};

/// Value of an erased flash byte.
pub const ERASED_BYTE: u8 = 0xFF;

pub trait Flash {
    /// Total size in bytes.
    fn capacity(&self) -> usize;

    fn read(&self, offset: usize, buf: &mut [u8]) -> FlashResult<()>;

    /// Program whole pages starting at a page-aligned offset.
    fn program(&mut self, offset: usize, data: &[u8]) -> FlashResult<()>;

    /// Erase the sector starting at a sector-aligned offset.
    fn erase_sector(&mut self, offset: usize) -> FlashResult<()>;
}

impl<F: Flash + ?Sized> Flash for &mut F {
    fn capacity(&self) -> usize {
        (**self).capacity()
    }

    fn read(&self, offset: usize, buf: &mut [u8]) -> FlashResult<()> {
        (**self).read(offset, buf)
    }

    fn program(&mut self, offset: usize, data: &[u8]) -> FlashResult<()> {
        (**self).program(offset, data)
    }

    fn erase_sector(&mut self, offset: usize) -> FlashResult<()> {
        (**self).erase_sector(offset)
    }
}

pub(crate) fn check_range(capacity: usize, offset: usize, len: usize) -> FlashResult<()> {
    match offset.checked_add(len) {
        Some(end) if end <= capacity => Ok(()),
        _ => Err(FlashError::OutOfRange),
    }
}

pub(crate) fn check_program(capacity: usize, offset: usize, len: usize) -> FlashResult<()> {
    if offset % FLASH_PAGE_SIZE != 0 || len % FLASH_PAGE_SIZE != 0 {
        return Err(FlashError::Misaligned);
    }
    check_range(capacity, offset, len)
}

pub(crate) fn check_erase(capacity: usize, offset: usize) -> FlashResult<()> {
    if offset % FLASH_SECTOR_SIZE != 0 {
        return Err(FlashError::Misaligned);
    }
    check_range(capacity, offset, FLASH_SECTOR_SIZE)
}

/// Flash simulated on top of a plain byte buffer (RAM or a memory-mapped
/// file). Behaves like NOR: programming ANDs data into the cells.
pub struct SimFlash<S> {
    storage: S,
    erase_count: usize,
    program_count: usize,
}

impl<S: AsRef<[u8]> + AsMut<[u8]>> SimFlash<S> {
    /// Wrap storage as-is (e.g. an existing flash dump).
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            erase_count: 0,
            program_count: 0,
        }
    }

    /// Wrap storage and bring it to the erased state.
    pub fn erased(mut storage: S) -> Self {
        storage.as_mut().fill(ERASED_BYTE);
        Self::new(storage)
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.storage.as_ref()
    }

    pub fn into_inner(self) -> S {
        self.storage
    }

    /// Sector erases performed since construction.
    pub fn erase_count(&self) -> usize {
        self.erase_count
    }

    /// Program calls performed since construction.
    pub fn program_count(&self) -> usize {
        self.program_count
    }
}

impl<S: AsRef<[u8]> + AsMut<[u8]>> Flash for SimFlash<S> {
    fn capacity(&self) -> usize {
        self.storage.as_ref().len()
    }

    fn read(&self, offset: usize, buf: &mut [u8]) -> FlashResult<()> {
        check_range(self.capacity(), offset, buf.len())?;
        buf.copy_from_slice(&self.storage.as_ref()[offset..offset + buf.len()]);
        Ok(())
    }

    fn program(&mut self, offset: usize, data: &[u8]) -> FlashResult<()> {
        check_program(self.capacity(), offset, data.len())?;
        let cells = &mut self.storage.as_mut()[offset..offset + data.len()];
        for (cell, &byte) in cells.iter_mut().zip(data) {
            *cell &= byte;
        }
        self.program_count += 1;
        Ok(())
    }

    fn erase_sector(&mut self, offset: usize) -> FlashResult<()> {
        check_erase(self.capacity(), offset)?;
        self.storage.as_mut()[offset..offset + FLASH_SECTOR_SIZE].fill(ERASED_BYTE);
        self.erase_count += 1;
        Ok(())
    }
}
