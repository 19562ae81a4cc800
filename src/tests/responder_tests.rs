// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::channel::{AddressQueue, AddressReceiver, FIFO_DEPTH};
use crate::image::{boxed_image, RomImage};
use crate::responder::{
    pins, AddressDecoder, BusAction, BusLayout, BusResponder, BusSnapshot, Contiguous, DataBus, Split,
};

#[test]
fn test_drives_swapped_word_while_output_enabled() {
    let words = boxed_image();
    let image = RomImage::new(&words);
    image.set_word(0x1234, 0xBEEF);
    let queue = AddressQueue::<FIFO_DEPTH>::new();
    let mut responder = BusResponder::<Contiguous>::new(image);

    assert_eq!(responder.step(BusSnapshot::read_cycle::<Contiguous>(0x1234), &queue), BusAction::Drive(0xEFBE));
    assert_eq!(responder.step(BusSnapshot::idle(), &queue), BusAction::Release);
}

#[test]
fn test_forwards_one_address_per_assertion() {
    let words = boxed_image();
    let queue = AddressQueue::<FIFO_DEPTH>::new();
    let mut responder = BusResponder::<Contiguous>::new(RomImage::new(&words));

    let read = BusSnapshot::read_cycle::<Contiguous>(0x82);
    for _ in 0..5 {
        responder.step(read, &queue);
    }
    assert_eq!(queue.len(), 1);

    responder.step(BusSnapshot::idle(), &queue);
    responder.step(BusSnapshot::read_cycle::<Contiguous>(0x44A), &queue);
    assert_eq!(queue.try_recv(), Some(0x82));
    assert_eq!(queue.try_recv(), Some(0x44A));
    assert_eq!(queue.try_recv(), None);
}

#[test]
fn test_full_channel_never_stalls_the_bus() {
    let words = boxed_image();
    let image = RomImage::new(&words);
    for i in 0..16 {
        image.set_word(i, i as u16);
    }
    let queue = AddressQueue::<FIFO_DEPTH>::new();
    let mut responder = BusResponder::<Contiguous>::new(image);

    for address in 0..(FIFO_DEPTH as u32 + 3) {
        let action = responder.step(BusSnapshot::read_cycle::<Contiguous>(address), &queue);
        assert_eq!(action, BusAction::Drive((address as u16).swap_bytes()));
        responder.step(BusSnapshot::idle(), &queue);
    }

    // Addresses past the queue depth are gone.
    let received: std::vec::Vec<u32> = core::iter::from_fn(|| queue.try_recv()).collect();
    assert_eq!(received, (0..FIFO_DEPTH as u32).collect::<std::vec::Vec<_>>());
}

#[test]
fn test_contiguous_layout_ignores_byte_pin() {
    let snapshot = BusSnapshot::from_pins((0x3FA7Fu64 << 16) | (1 << pins::BYTE_PIN));
    assert_eq!(Contiguous::decode(snapshot), 0x3FA7F);
    assert!(snapshot.output_enabled());
}

#[test]
fn test_split_layout_takes_a17_from_byte_pin() {
    let snapshot = BusSnapshot::from_pins((0x0FA7Fu64 << 16) | (1 << pins::BYTE_PIN));
    assert_eq!(Split::decode(snapshot), 0x2FA7F);

    // GPIO 33 is not an address line on this layout.
    let snapshot = BusSnapshot::from_pins(0x2_0000u64 << 16);
    assert_eq!(Split::decode(snapshot), 0);

    for address in [0u32, 0x82, 0x44A, 0x3FA7F, 0x1_FFFF, 0x2_0000] {
        assert_eq!(Split::decode(BusSnapshot::from_pins(Split::address_pins(address))), address);
        assert_eq!(Contiguous::decode(BusSnapshot::from_pins(Contiguous::address_pins(address))), address);
    }
}

#[test]
fn test_strap_selects_layout() {
    assert_eq!(BusLayout::from_strap(true), BusLayout::Contiguous);
    assert_eq!(BusLayout::from_strap(false), BusLayout::Split);
}

#[test]
fn test_idle_bus_is_not_a_read() {
    let idle = BusSnapshot::idle();
    assert!(!idle.output_enabled());
    assert!(!idle.chip_enabled());
    let read = BusSnapshot::read_cycle::<Split>(0x3FFFF);
    assert!(read.output_enabled());
    assert!(read.chip_enabled());
}

/// Scripted bus: replays snapshots, records what was driven.
struct ScriptedBus {
    script: std::vec::Vec<BusSnapshot>,
    driven: std::vec::Vec<Option<u16>>,
}

impl DataBus for ScriptedBus {
    fn sample(&mut self) -> BusSnapshot {
        if self.script.is_empty() {
            // End of script: stop the test thread's loop.
            panic!("script exhausted");
        }
        self.script.remove(0)
    }

    fn drive(&mut self, value: u16) {
        self.driven.push(Some(value));
    }

    fn release(&mut self) {
        self.driven.push(None);
    }
}

#[test]
fn test_run_loop_follows_the_bus() {
    let words = boxed_image();
    let image = RomImage::new(&words);
    image.set_word(7, 0x1122);
    let queue = AddressQueue::<FIFO_DEPTH>::new();

    let mut bus = ScriptedBus {
        script: vec![
            BusSnapshot::idle(),
            BusSnapshot::read_cycle::<Contiguous>(7),
            BusSnapshot::read_cycle::<Contiguous>(7),
            BusSnapshot::idle(),
        ],
        driven: vec![],
    };

    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        BusResponder::<Contiguous>::new(image).run(&mut bus, &queue);
    }));
    assert!(outcome.is_err());
    assert_eq!(bus.driven, vec![None, Some(0x2211), Some(0x2211), None]);
    assert_eq!(queue.try_recv(), Some(7));
    assert_eq!(queue.try_recv(), None);
}
