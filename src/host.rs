// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Host-side protocol driver.
//!
//! Everything the host does is a word read from the ROM window. Commands are
//! magic reads followed by the command address; page uploads are reads whose
//! addresses are the data; results are read back from the image. Word
//! addresses here are host byte offsets shifted right by one.

use crate::config::{FLASH_PAGE_SIZE, FLASH_SECTOR_SIZE, PAGES_PER_SECTOR, SECTORS_PER_SLOT, SENTINEL_WORD, SLOT_SIZE};
use crate::error::{HostError, HostResult};
use crate::protocol::{Command, Slot, MAGIC_SEQUENCE};
use crate::status::StatusRecord;

/// One host read cycle on the ROM window.
pub trait RomBus {
    fn read_word(&mut self, word_address: u32) -> u16;
}

impl<B: RomBus + ?Sized> RomBus for &mut B {
    fn read_word(&mut self, word_address: u32) -> u16 {
        (**self).read_word(word_address)
    }
}

pub fn validate_slot(slot: u32) -> HostResult<Slot> {
    Slot::new(slot).ok_or(HostError::InvalidSlot(slot))
}

fn validate_image_len(len: usize) -> HostResult<()> {
    if len != SLOT_SIZE {
        return Err(HostError::ImageSize { expected: SLOT_SIZE, found: len });
    }
    Ok(())
}

pub struct HostSession<B> {
    bus: B,
}

impl<B: RomBus> HostSession<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn into_inner(self) -> B {
        self.bus
    }

    pub fn send_command(&mut self, command: Command) {
        for word in MAGIC_SEQUENCE {
            self.bus.read_word(word);
        }
        self.bus.read_word(command.encode());
    }

    /// Poll the sentinel word until the pending flash operation is done.
    /// There is no timeout: a device that never finishes hangs the host.
    pub fn wait_operation_complete(&mut self) {
        while self.bus.read_word(SENTINEL_WORD as u32) != 0 {
            core::hint::spin_loop();
        }
    }

    /// Read image words 0..128 into `buf` in host byte order.
    fn read_page_into(&mut self, buf: &mut [u8]) {
        for (i, pair) in buf[..FLASH_PAGE_SIZE].chunks_exact_mut(2).enumerate() {
            pair.copy_from_slice(&self.bus.read_word(i as u32).to_be_bytes());
        }
    }

    /// Upload one page through the address lines.
    fn push_page(&mut self, page: &[u8]) {
        self.send_command(Command::CopyPageHostToSram);
        for pair in page[..FLASH_PAGE_SIZE].chunks_exact(2) {
            self.bus.read_word(u16::from_be_bytes([pair[0], pair[1]]) as u32);
        }
    }

    fn restore(&mut self) {
        self.send_command(Command::RestorePageToSram);
    }

    pub fn status(&mut self) -> StatusRecord {
        self.send_command(Command::WriteStatusToSram);
        let mut page = [0u8; FLASH_PAGE_SIZE];
        self.read_page_into(&mut page);
        self.restore();

        let status = match StatusRecord::from_bytes(&page) {
            Some(status) => status,
            None => unreachable!("page holds a full status record"),
        };
        if status.status_length as usize != StatusRecord::SIZE {
            tracing::warn!(
                "unexpected status length, read {}, expected {}",
                status.status_length,
                StatusRecord::SIZE
            );
        }
        status
    }

    /// Select the slot to boot from. The new image is live immediately; the
    /// host is expected to reset.
    pub fn switch(&mut self, slot: u32) -> HostResult<Slot> {
        let slot = validate_slot(slot)?;
        self.send_command(Command::UpdateActiveSlot { slot: slot.get() as u16 });
        Ok(slot)
    }

    /// Erase all sectors of `slot`. `progress` gets the sector index within
    /// the slot after each erase.
    pub fn erase_slot(&mut self, slot: u32, mut progress: impl FnMut(usize)) -> HostResult<()> {
        let slot = validate_slot(slot)?;
        self.erase_sectors(slot, &mut progress);
        self.restore();
        Ok(())
    }

    fn erase_sectors(&mut self, slot: Slot, progress: &mut impl FnMut(usize)) {
        for sector_offset in 0..SECTORS_PER_SLOT {
            let sector = slot.first_sector() + sector_offset;
            self.send_command(Command::EraseFlashSector { sector: sector as u16 });
            self.wait_operation_complete();
            progress(sector_offset);
        }
    }

    /// Erase `slot` and program it with `image`, which must be exactly one
    /// slot long.
    pub fn write_slot(
        &mut self,
        slot: u32,
        image: &[u8],
        mut erase_progress: impl FnMut(usize),
        mut write_progress: impl FnMut(usize),
    ) -> HostResult<()> {
        let slot = validate_slot(slot)?;
        validate_image_len(image.len())?;

        self.erase_sectors(slot, &mut erase_progress);

        for (sector_offset, sector_data) in image.chunks_exact(FLASH_SECTOR_SIZE).enumerate() {
            let sector = slot.first_sector() + sector_offset;
            for (page_offset, page_data) in sector_data.chunks_exact(FLASH_PAGE_SIZE).enumerate() {
                let page = sector * PAGES_PER_SECTOR + page_offset;
                self.push_page(page_data);
                self.send_command(Command::CopyPageSramToFlash { page: page as u16 });
                self.wait_operation_complete();
            }
            write_progress(sector_offset);
        }

        self.restore();
        Ok(())
    }

    /// Read the whole of `slot` into `buf`, which must be exactly one slot
    /// long.
    pub fn read_slot(&mut self, slot: u32, buf: &mut [u8], mut progress: impl FnMut(usize)) -> HostResult<()> {
        let slot = validate_slot(slot)?;
        validate_image_len(buf.len())?;

        for (sector_offset, sector_data) in buf.chunks_exact_mut(FLASH_SECTOR_SIZE).enumerate() {
            let sector = slot.first_sector() + sector_offset;
            for (page_offset, page_data) in sector_data.chunks_exact_mut(FLASH_PAGE_SIZE).enumerate() {
                let page = sector * PAGES_PER_SECTOR + page_offset;
                self.send_command(Command::CopyPageFlashToSram { page: page as u16 });
                self.wait_operation_complete();
                self.read_page_into(page_data);
            }
            progress(sector_offset);
        }

        self.restore();
        Ok(())
    }
}
