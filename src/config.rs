// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Fixed geometry and protocol constants.
//!
//! Geometry is not negotiated with the host: every size below is baked into
//! both the firmware and the host tooling.

/// Smallest programmable unit of the flash.
pub const FLASH_PAGE_SIZE: usize = 256;

/// Smallest erasable unit of the flash.
pub const FLASH_SECTOR_SIZE: usize = 4096;

pub const PAGES_PER_SECTOR: usize = FLASH_SECTOR_SIZE / FLASH_PAGE_SIZE;

/// One ROM slot (512 KiB).
pub const SLOT_SIZE: usize = 512 * 1024;

pub const SECTORS_PER_SLOT: usize = SLOT_SIZE / FLASH_SECTOR_SIZE;

pub const PAGES_PER_SLOT: usize = SLOT_SIZE / FLASH_PAGE_SIZE;

/// Slot regions in flash. Region 0 holds the firmware and the config sector.
pub const SLOT_REGIONS: usize = 8;

pub const FLASH_SIZE: usize = SLOT_REGIONS * SLOT_SIZE;

/// Flash size as reported in the status record.
pub const FLASH_SIZE_MB: u8 = (FLASH_SIZE / (1024 * 1024)) as u8;

/// Lowest selectable slot.
pub const MIN_SLOT: u8 = 1;

/// Highest selectable slot.
pub const MAX_SLOT: u8 = 7;

/// Slot used when the config sector holds no valid record.
pub const DEFAULT_SLOT: u8 = 1;

/// The config sector is the last sector of slot region 0.
pub const CONFIG_SECTOR_OFFSET: usize = SLOT_SIZE - FLASH_SECTOR_SIZE;

/// 16-bit words in the ROM image.
pub const ROM_IMAGE_WORDS: usize = SLOT_SIZE / 2;

/// 16-bit words in one flash page.
pub const PAGE_WORDS: usize = FLASH_PAGE_SIZE / 2;

/// Image word the host polls while a flash operation is pending.
pub const SENTINEL_WORD: usize = PAGE_WORDS;

/// Value of the sentinel while an operation is in progress.
pub const SENTINEL_BUSY: u16 = 0xFFFF;

pub const MAJOR_VERSION: u8 = parse_version(env!("CARGO_PKG_VERSION_MAJOR"));
pub const MINOR_VERSION: u8 = parse_version(env!("CARGO_PKG_VERSION_MINOR"));
pub const PATCH_VERSION: u8 = parse_version(env!("CARGO_PKG_VERSION_PATCH"));

const fn parse_version(s: &str) -> u8 {
    let bytes = s.as_bytes();
    let mut value: u8 = 0;
    let mut i = 0;
    while i < bytes.len() {
        value = value * 10 + (bytes[i] - b'0');
        i += 1;
    }
    value
}

const _: () = assert!(PAGES_PER_SECTOR == 16);
const _: () = assert!(SECTORS_PER_SLOT == 128);
const _: () = assert!(FLASH_SIZE_MB == 4);
