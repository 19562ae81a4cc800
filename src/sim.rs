// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Emulated cartridge.
//!
//! Wires the real responder, channel and dispatcher together in one thread.
//! A host read asserts output-enable for one sample, releases it, and then
//! lets the dispatcher drain the channel, i.e. a dispatcher core that is
//! always done before the host's next cycle.

use crate::channel::{AddressQueue, AddressReceiver, FIFO_DEPTH};
use crate::dispatcher::Dispatcher;
use crate::error::FlashResult;
use crate::flash::Flash;
use crate::host::RomBus;
use crate::image::RomImage;
use crate::protocol::Slot;
use crate::responder::{AddressDecoder, BusAction, BusResponder, BusSnapshot, Contiguous};
use crate::store::ConfigStore;

pub struct Cartridge<'a, F, D = Contiguous> {
    image: RomImage<'a>,
    responder: BusResponder<'a, D>,
    queue: AddressQueue<FIFO_DEPTH>,
    dispatcher: Dispatcher<'a, F>,
}

impl<'a, F: Flash, D: AddressDecoder> Cartridge<'a, F, D> {
    /// Power on: load the active slot into the image.
    pub fn power_on(image: RomImage<'a>, flash: F) -> FlashResult<Self> {
        let mut dispatcher = Dispatcher::new(image, flash, ConfigStore::default());
        dispatcher.boot()?;
        Ok(Self {
            image,
            responder: BusResponder::new(image),
            queue: AddressQueue::new(),
            dispatcher,
        })
    }

    pub fn image(&self) -> RomImage<'a> {
        self.image
    }

    pub fn dispatcher(&self) -> &Dispatcher<'a, F> {
        &self.dispatcher
    }

    pub fn active_slot(&self) -> Slot {
        self.dispatcher.active_slot()
    }

    pub fn flash(&self) -> &F {
        self.dispatcher.flash()
    }

    pub fn into_flash(self) -> F {
        self.dispatcher.into_flash()
    }

    /// One full host read cycle. Returns what the data lines carried.
    pub fn bus_cycle(&mut self, address: u32) -> u16 {
        let value = match self.responder.step(BusSnapshot::read_cycle::<D>(address), &self.queue) {
            BusAction::Drive(value) => value,
            // Floating data lines.
            BusAction::Release => 0xFFFF,
        };
        self.responder.step(BusSnapshot::idle(), &self.queue);
        self.drain();
        value
    }

    fn drain(&mut self) {
        while let Some(address) = self.queue.try_recv() {
            self.dispatcher.on_address(address);
        }
    }
}

impl<'a, F: Flash, D: AddressDecoder> RomBus for Cartridge<'a, F, D> {
    fn read_word(&mut self, word_address: u32) -> u16 {
        self.bus_cycle(word_address)
    }
}
