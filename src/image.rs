// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! The ROM image presented on the bus.
//!
//! The image is shared by the bus responder (reader) and the dispatcher
//! (writer) without any lock. Each word is a relaxed atomic, which on the
//! target compiles to plain half-word loads and stores, so a single word can
//! never tear. Multi-word updates are *not* atomic: a host read that races a
//! page copy may observe a mix of old and new words. The protocol forbids
//! ordinary reads while a command is in flight and uses the sentinel word to
//! signal completion of flash operations; that convention is the only
//! synchronisation.

use core::sync::atomic::{AtomicU16, Ordering};

use crate::config::{FLASH_PAGE_SIZE, PAGE_WORDS, ROM_IMAGE_WORDS};
use crate::error::FlashResult;
use crate::flash::Flash;

/// Backing storage for one ROM image.
pub type ImageWords = [AtomicU16; ROM_IMAGE_WORDS];

/// Handle to the shared ROM image. Cheap to copy; every copy aliases the
/// same words.
#[derive(Clone, Copy)]
pub struct RomImage<'a> {
    words: &'a ImageWords,
}

impl<'a> RomImage<'a> {
    pub fn new(words: &'a ImageWords) -> Self {
        Self { words }
    }

    #[inline(always)]
    pub fn word(&self, index: usize) -> u16 {
        self.words[index % ROM_IMAGE_WORDS].load(Ordering::Relaxed)
    }

    #[inline(always)]
    pub fn set_word(&self, index: usize, value: u16) {
        self.words[index % ROM_IMAGE_WORDS].store(value, Ordering::Relaxed);
    }

    /// Word as it appears on the data lines. The image holds flash byte
    /// order (little-endian); the host bus is big-endian.
    #[inline(always)]
    pub fn bus_word(&self, address: u32) -> u16 {
        self.word(address as usize).swap_bytes()
    }

    /// Store little-endian byte pairs starting at `word_offset`.
    pub fn store_bytes(&self, word_offset: usize, bytes: &[u8]) {
        for (i, pair) in bytes.chunks_exact(2).enumerate() {
            self.set_word(word_offset + i, u16::from_le_bytes([pair[0], pair[1]]));
        }
    }

    /// Read `buf.len()` bytes of image content starting at `word_offset`.
    pub fn read_bytes(&self, word_offset: usize, buf: &mut [u8]) {
        for (i, pair) in buf.chunks_exact_mut(2).enumerate() {
            pair.copy_from_slice(&self.word(word_offset + i).to_le_bytes());
        }
    }

    /// The first page of the image (words 0..128) in flash byte order.
    pub fn first_page(&self) -> [u8; FLASH_PAGE_SIZE] {
        let mut page = [0u8; FLASH_PAGE_SIZE];
        self.read_bytes(0, &mut page);
        page
    }

    /// Copy `len` bytes of flash starting at `offset` into the start of the
    /// image. `len` must be even.
    pub fn load_from_flash<F: Flash + ?Sized>(&self, flash: &F, offset: usize, len: usize) -> FlashResult<()> {
        let mut chunk = [0u8; FLASH_PAGE_SIZE];
        let mut done = 0;
        while done < len {
            let n = (len - done).min(FLASH_PAGE_SIZE);
            flash.read(offset + done, &mut chunk[..n])?;
            self.store_bytes(done / 2, &chunk[..n]);
            done += n;
        }
        Ok(())
    }
}

/// Heap-allocated image storage for host-side use.
#[cfg(any(test, feature = "std"))]
pub fn boxed_image() -> std::boxed::Box<ImageWords> {
    use std::boxed::Box;
    use std::vec::Vec;

    let words: Box<[AtomicU16]> = (0..ROM_IMAGE_WORDS).map(|_| AtomicU16::new(0)).collect::<Vec<_>>().into_boxed_slice();
    match words.try_into() {
        Ok(words) => words,
        Err(_) => unreachable!("image length is ROM_IMAGE_WORDS"),
    }
}

const _: () = assert!(PAGE_WORDS * 2 == FLASH_PAGE_SIZE);
const _: () = assert!(ROM_IMAGE_WORDS.is_power_of_two());
