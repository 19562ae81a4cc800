// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Host session against an emulated cartridge, end to end over the bus.

use std::vec::Vec;

use crate::config::{FLASH_PAGE_SIZE, SECTORS_PER_SLOT, SENTINEL_WORD, SLOT_SIZE};
use crate::error::HostError;
use crate::host::{HostSession, RomBus};
use crate::image::{boxed_image, RomImage};
use crate::protocol::Slot;
use crate::responder::Split;
use crate::sim::Cartridge;
use crate::status::STATUS_MAGIC;
use crate::tests::fixtures::{erased_flash, populated_flash, slot_pattern, TestFlash};

/// Counts host read cycles.
struct CountingBus<B> {
    inner: B,
    reads: usize,
}

impl<B: RomBus> RomBus for CountingBus<B> {
    fn read_word(&mut self, word_address: u32) -> u16 {
        self.reads += 1;
        self.inner.read_word(word_address)
    }
}

fn slot_bytes(flash: &TestFlash, slot: u32) -> &[u8] {
    let offset = Slot::new(slot).unwrap().flash_offset();
    &flash.as_bytes()[offset..offset + SLOT_SIZE]
}

#[test]
fn test_status_on_virgin_cartridge() {
    let words = boxed_image();
    let cartridge: Cartridge<'_, _> = Cartridge::power_on(RomImage::new(&words), erased_flash()).unwrap();
    let mut session = HostSession::new(cartridge);

    let status = session.status();
    assert_eq!(status.magic, STATUS_MAGIC);
    assert_eq!(status.status_length, 10);
    assert_eq!(status.flash_size_mb, 4);
    assert_eq!(status.active_slot, 1);
}

#[test]
fn test_status_read_leaves_image_intact() {
    let words = boxed_image();
    let image = RomImage::new(&words);
    let cartridge: Cartridge<'_, _> = Cartridge::power_on(image, populated_flash()).unwrap();
    let mut session = HostSession::new(cartridge);
    session.status();

    let mut head = [0u8; FLASH_PAGE_SIZE + 2];
    image.read_bytes(0, &mut head);
    assert_eq!(&head[..], &slot_pattern(1)[..FLASH_PAGE_SIZE + 2]);
    assert_eq!(image.word(SENTINEL_WORD), u16::from_le_bytes([slot_pattern(1)[256], slot_pattern(1)[257]]));
}

#[test]
fn test_write_then_read_slot() {
    let words = boxed_image();
    let cartridge: Cartridge<'_, _> = Cartridge::power_on(RomImage::new(&words), populated_flash()).unwrap();
    let mut session = HostSession::new(cartridge);

    let content: Vec<u8> = (0..SLOT_SIZE).map(|i| (i * 7 + i / 256) as u8).collect();
    let mut erased = Vec::new();
    let mut written = Vec::new();
    session
        .write_slot(3, &content, |s| erased.push(s), |s| written.push(s))
        .unwrap();
    assert_eq!(erased, (0..SECTORS_PER_SLOT).collect::<Vec<_>>());
    assert_eq!(written, (0..SECTORS_PER_SLOT).collect::<Vec<_>>());

    let mut readback = vec![0u8; SLOT_SIZE];
    session.read_slot(3, &mut readback, |_| {}).unwrap();
    assert!(readback == content, "slot 3 read back differs");

    let cartridge = session.into_inner();
    let flash = cartridge.flash();
    assert!(slot_bytes(flash, 3) == &content[..]);
    for other in [1u32, 2, 4, 5, 6, 7] {
        assert!(slot_bytes(flash, other) == &slot_pattern(other as u8)[..], "slot {} modified", other);
    }
    // Active slot untouched, image restored.
    assert_eq!(cartridge.active_slot(), Slot::new(1).unwrap());
    assert_eq!(cartridge.image().bus_word(0), u16::from_be_bytes([slot_pattern(1)[0], slot_pattern(1)[1]]));
}

#[test]
fn test_erase_slot_reads_back_blank() {
    let words = boxed_image();
    let cartridge: Cartridge<'_, _> = Cartridge::power_on(RomImage::new(&words), populated_flash()).unwrap();
    let mut session = HostSession::new(cartridge);

    let mut sectors = 0;
    session.erase_slot(2, |_| sectors += 1).unwrap();
    assert_eq!(sectors, SECTORS_PER_SLOT);

    let mut readback = vec![0u8; SLOT_SIZE];
    session.read_slot(2, &mut readback, |_| {}).unwrap();
    assert!(readback.iter().all(|&b| b == 0xFF));
    assert!(slot_bytes(session.into_inner().flash(), 5) == &slot_pattern(5)[..]);
}

#[test]
fn test_switch_survives_power_cycle() {
    let words = boxed_image();
    let cartridge: Cartridge<'_, _> = Cartridge::power_on(RomImage::new(&words), populated_flash()).unwrap();
    let mut session = HostSession::new(cartridge);
    assert_eq!(session.switch(4).unwrap(), Slot::new(4).unwrap());

    // New slot is served immediately.
    let expected = slot_pattern(4);
    for word in [0u32, 1, 1000, (SLOT_SIZE / 2 - 1) as u32] {
        let i = word as usize * 2;
        assert_eq!(session.bus_mut().read_word(word), u16::from_be_bytes([expected[i], expected[i + 1]]));
    }

    let flash = session.into_inner().into_flash();
    let words = boxed_image();
    let cartridge: Cartridge<'_, _> = Cartridge::power_on(RomImage::new(&words), flash).unwrap();
    assert_eq!(cartridge.active_slot(), Slot::new(4).unwrap());
    let mut session = HostSession::new(cartridge);
    assert_eq!(session.status().active_slot, 4);
}

#[test]
fn test_invalid_requests_never_touch_the_bus() {
    let words = boxed_image();
    let cartridge: Cartridge<'_, _> = Cartridge::power_on(RomImage::new(&words), erased_flash()).unwrap();
    let mut session = HostSession::new(CountingBus { inner: cartridge, reads: 0 });

    assert!(matches!(session.switch(0), Err(HostError::InvalidSlot(0))));
    assert!(matches!(session.switch(8), Err(HostError::InvalidSlot(8))));
    assert!(matches!(session.erase_slot(9, |_| {}), Err(HostError::InvalidSlot(9))));
    assert!(matches!(
        session.write_slot(1, &[0u8; 1024], |_| {}, |_| {}),
        Err(HostError::ImageSize { expected: SLOT_SIZE, found: 1024 })
    ));
    let mut short = vec![0u8; SLOT_SIZE - 2];
    assert!(matches!(session.read_slot(1, &mut short, |_| {}), Err(HostError::ImageSize { .. })));

    let bus = session.into_inner();
    assert_eq!(bus.reads, 0);
    assert_eq!(bus.inner.flash().program_count(), 0);
}

#[test]
fn test_split_layout_cartridge() {
    let words = boxed_image();
    let cartridge: Cartridge<'_, _, Split> = Cartridge::power_on(RomImage::new(&words), populated_flash()).unwrap();
    let mut session = HostSession::new(cartridge);

    // A17 travels on the BYTE pin.
    let expected = slot_pattern(1);
    let word = 0x2_0123u32;
    let i = word as usize * 2;
    assert_eq!(session.bus_mut().read_word(word), u16::from_be_bytes([expected[i], expected[i + 1]]));

    session.switch(7).unwrap();
    assert_eq!(session.status().active_slot, 7);
}
