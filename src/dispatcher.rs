// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Command dispatcher.
//!
//! Consumes every address the bus responder forwards, watches for the magic
//! sequence and executes the command that follows it against the ROM
//! image, the flash and the config store. Runs on its own core and may block
//! for milliseconds inside flash operations; the responder keeps serving the
//! image meanwhile.

use crate::channel::AddressReceiver;
use crate::config::{FLASH_PAGE_SIZE, FLASH_SECTOR_SIZE, PAGE_WORDS, SENTINEL_BUSY, SENTINEL_WORD, SLOT_SIZE};
use crate::error::FlashResult;
use crate::flash::Flash;
use crate::image::RomImage;
use crate::protocol::{Command, Slot, MAGIC_SEQUENCE};
use crate::status::StatusRecord;
use crate::store::ConfigStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchState {
    /// Waiting for the first magic word.
    Idle,
    /// First magic word seen.
    First,
    /// Second magic word seen.
    Second,
    /// Full prefix seen; the next address is a command.
    Armed,
}

/// Recogniser for the three-address magic prefix.
#[derive(Clone, Copy, Debug)]
pub struct MagicMatcher {
    state: MatchState,
}

impl Default for MagicMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MagicMatcher {
    pub const fn new() -> Self {
        Self { state: MatchState::Idle }
    }

    pub fn state(&self) -> MatchState {
        self.state
    }

    /// Feed one address. Returns the command address once the matcher was
    /// armed; the matcher is idle again afterwards.
    pub fn feed(&mut self, address: u32) -> Option<u32> {
        let [first, second, third] = MAGIC_SEQUENCE;
        if self.state == MatchState::Armed {
            self.state = MatchState::Idle;
            return Some(address);
        }
        self.state = match self.state {
            MatchState::Idle if address == first => MatchState::First,
            MatchState::Idle => MatchState::Idle,
            MatchState::First if address == second => MatchState::Second,
            MatchState::Second if address == third => MatchState::Armed,
            // A repeated first word may start a new sequence.
            MatchState::First | MatchState::Second if address == first => MatchState::First,
            MatchState::First | MatchState::Second | MatchState::Armed => MatchState::Idle,
        };
        None
    }
}

pub struct Dispatcher<'a, F> {
    image: RomImage<'a>,
    flash: F,
    store: ConfigStore,
    matcher: MagicMatcher,
    /// Next image word to fill while a host page transfer is running.
    inbound: Option<usize>,
}

impl<'a, F: Flash> Dispatcher<'a, F> {
    pub fn new(image: RomImage<'a>, flash: F, store: ConfigStore) -> Self {
        Self {
            image,
            flash,
            store,
            matcher: MagicMatcher::new(),
            inbound: None,
        }
    }

    /// Fill the whole image from the active slot.
    pub fn boot(&mut self) -> FlashResult<Slot> {
        let slot = self.active_slot();
        self.image.load_from_flash(&self.flash, slot.flash_offset(), SLOT_SIZE)?;
        tracing::info!(slot = slot.get(), "rom image loaded");
        Ok(slot)
    }

    pub fn active_slot(&self) -> Slot {
        self.store.get_active_slot(&self.flash)
    }

    pub fn matcher_state(&self) -> MatchState {
        self.matcher.state()
    }

    /// True while the payload of a host page transfer is being received.
    pub fn receiving_page(&self) -> bool {
        self.inbound.is_some()
    }

    pub fn flash(&self) -> &F {
        &self.flash
    }

    pub fn into_flash(self) -> F {
        self.flash
    }

    /// Consume addresses forever.
    pub fn run<R: AddressReceiver>(&mut self, rx: &R) -> ! {
        loop {
            let address = rx.recv();
            self.on_address(address);
        }
    }

    /// Handle one forwarded address. Returns the command it completed, if
    /// any.
    pub fn on_address(&mut self, address: u32) -> Option<Command> {
        if let Some(index) = self.inbound {
            // Payload travels on the address lines in host byte order.
            self.image.set_word(index, (address as u16).swap_bytes());
            self.inbound = if index + 1 < PAGE_WORDS { Some(index + 1) } else { None };
            return None;
        }

        let command_address = self.matcher.feed(address)?;
        let command = match Command::decode(command_address) {
            Some(command) => command,
            None => {
                tracing::debug!("ignoring unknown command address {:#x}", command_address);
                return None;
            }
        };

        if let Err(e) = self.execute(command) {
            tracing::error!("{:?} failed: {}", command, e);
        }
        Some(command)
    }

    pub fn execute(&mut self, command: Command) -> FlashResult<()> {
        tracing::debug!("dispatching {:?}", command);
        match command {
            Command::UpdateActiveSlot { slot } => {
                let slot = match Slot::new(slot as u32) {
                    Some(slot) => slot,
                    None => {
                        tracing::debug!("ignoring switch to invalid slot {}", slot);
                        return Ok(());
                    }
                };
                self.store.set_active_slot(&mut self.flash, slot)?;
                self.image.load_from_flash(&self.flash, slot.flash_offset(), SLOT_SIZE)
            }
            Command::WriteStatusToSram => {
                let status = StatusRecord::current(self.active_slot().get());
                self.image.store_bytes(0, &status.to_bytes());
                Ok(())
            }
            Command::RestorePageToSram => {
                let slot = self.active_slot();
                // The page plus the sentinel word.
                self.image.load_from_flash(&self.flash, slot.flash_offset(), FLASH_PAGE_SIZE + 2)
            }
            Command::CopyPageHostToSram => {
                self.inbound = Some(0);
                Ok(())
            }
            Command::CopyPageFlashToSram { page } => {
                let offset = page as usize * FLASH_PAGE_SIZE;
                self.with_sentinel(|image, flash| image.load_from_flash(&*flash, offset, FLASH_PAGE_SIZE))
            }
            Command::CopyPageSramToFlash { page } => {
                let offset = page as usize * FLASH_PAGE_SIZE;
                self.with_sentinel(|image, flash| flash.program(offset, &image.first_page()))
            }
            Command::EraseFlashSector { sector } => {
                let offset = sector as usize * FLASH_SECTOR_SIZE;
                self.with_sentinel(|_, flash| flash.erase_sector(offset))
            }
        }
    }

    /// Run a flash operation with the sentinel word raised. The sentinel is
    /// lowered once the attempt is over, whatever its outcome.
    fn with_sentinel<T>(&mut self, op: impl FnOnce(RomImage<'a>, &mut F) -> FlashResult<T>) -> FlashResult<T> {
        self.image.set_word(SENTINEL_WORD, SENTINEL_BUSY);
        let result = op(self.image, &mut self.flash);
        self.image.set_word(SENTINEL_WORD, 0);
        result
    }
}
