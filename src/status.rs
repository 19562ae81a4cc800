// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Status record published into the ROM image on request.

use crate::config::{FLASH_SIZE_MB, MAJOR_VERSION, MINOR_VERSION, PATCH_VERSION};

pub const STATUS_MAGIC: [u8; 4] = *b"RPRM";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatusRecord {
    pub magic: [u8; 4],
    pub status_length: u8,
    pub major_version: u8,
    pub minor_version: u8,
    pub patch_version: u8,
    pub flash_size_mb: u8,
    pub active_slot: u8,
}

impl StatusRecord {
    pub const SIZE: usize = 10;

    /// Record describing this firmware build with the given active slot.
    pub fn current(active_slot: u8) -> Self {
        Self {
            magic: STATUS_MAGIC,
            status_length: Self::SIZE as u8,
            major_version: MAJOR_VERSION,
            minor_version: MINOR_VERSION,
            patch_version: PATCH_VERSION,
            flash_size_mb: FLASH_SIZE_MB,
            active_slot,
        }
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..4].copy_from_slice(&self.magic);
        buf[4] = self.status_length;
        buf[5] = self.major_version;
        buf[6] = self.minor_version;
        buf[7] = self.patch_version;
        buf[8] = self.flash_size_mb;
        buf[9] = self.active_slot;
        buf
    }

    /// Parse a record from the first bytes of `buf`. The length field is not
    /// checked here; a mismatch is only meaningful to the host.
    pub fn from_bytes(buf: &[u8]) -> Option<Self> {
        let buf: &[u8; Self::SIZE] = buf.get(..Self::SIZE)?.try_into().ok()?;
        Some(Self {
            magic: [buf[0], buf[1], buf[2], buf[3]],
            status_length: buf[4],
            major_version: buf[5],
            minor_version: buf[6],
            patch_version: buf[7],
            flash_size_mb: buf[8],
            active_slot: buf[9],
        })
    }

    pub fn has_valid_magic(&self) -> bool {
        self.magic == STATUS_MAGIC
    }
}
