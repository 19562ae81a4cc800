// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Address/command codec for the covert command channel.
//!
//! The host has no way to write to the cartridge: every bus cycle is a read.
//! Commands are therefore carried in the *address* of a read. A command is
//! armed by three fixed addresses ([`MAGIC_SEQUENCE`]) and the fourth address
//! encodes `opcode << 14 | argument`.

use crate::config::{FLASH_PAGE_SIZE, FLASH_SECTOR_SIZE, MAX_SLOT, MIN_SLOT, SLOT_SIZE};

/// Width of the word address bus.
pub const ADDRESS_BITS: u32 = 18;
pub const ADDRESS_MASK: u32 = (1 << ADDRESS_BITS) - 1;

pub const ARGUMENT_BITS: u32 = 14;
pub const ARGUMENT_MASK: u32 = (1 << ARGUMENT_BITS) - 1;

/// Word addresses that must be read back to back to arm the dispatcher.
pub const MAGIC_SEQUENCE: [u32; 3] = [0x82, 0x44A, 0x3FA7F];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    UpdateActiveSlot = 0,
    WriteStatusToSram = 1,
    RestorePageToSram = 2,
    CopyPageHostToSram = 3,
    CopyPageFlashToSram = 4,
    CopyPageSramToFlash = 5,
    EraseFlashSector = 6,
}

impl Opcode {
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            0 => Some(Opcode::UpdateActiveSlot),
            1 => Some(Opcode::WriteStatusToSram),
            2 => Some(Opcode::RestorePageToSram),
            3 => Some(Opcode::CopyPageHostToSram),
            4 => Some(Opcode::CopyPageFlashToSram),
            5 => Some(Opcode::CopyPageSramToFlash),
            6 => Some(Opcode::EraseFlashSector),
            _ => None,
        }
    }
}

/// A decoded command. Arguments are raw 14-bit values; range checks belong
/// to the handlers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    UpdateActiveSlot { slot: u16 },
    WriteStatusToSram,
    RestorePageToSram,
    CopyPageHostToSram,
    CopyPageFlashToSram { page: u16 },
    CopyPageSramToFlash { page: u16 },
    EraseFlashSector { sector: u16 },
}

impl Command {
    pub fn opcode(&self) -> Opcode {
        match self {
            Command::UpdateActiveSlot { .. } => Opcode::UpdateActiveSlot,
            Command::WriteStatusToSram => Opcode::WriteStatusToSram,
            Command::RestorePageToSram => Opcode::RestorePageToSram,
            Command::CopyPageHostToSram => Opcode::CopyPageHostToSram,
            Command::CopyPageFlashToSram { .. } => Opcode::CopyPageFlashToSram,
            Command::CopyPageSramToFlash { .. } => Opcode::CopyPageSramToFlash,
            Command::EraseFlashSector { .. } => Opcode::EraseFlashSector,
        }
    }

    pub fn argument(&self) -> u16 {
        match *self {
            Command::UpdateActiveSlot { slot } => slot,
            Command::CopyPageFlashToSram { page } | Command::CopyPageSramToFlash { page } => page,
            Command::EraseFlashSector { sector } => sector,
            _ => 0,
        }
    }

    /// Bus address that carries this command.
    pub fn encode(&self) -> u32 {
        encode_address(self.opcode(), self.argument() as u32)
    }

    /// Decode the address that follows the magic sequence. Opcodes 7..15
    /// carry no command.
    pub fn decode(address: u32) -> Option<Self> {
        let (opcode, argument) = split_address(address);
        let argument = argument as u16;
        let command = match Opcode::from_bits(opcode)? {
            Opcode::UpdateActiveSlot => Command::UpdateActiveSlot { slot: argument },
            Opcode::WriteStatusToSram => Command::WriteStatusToSram,
            Opcode::RestorePageToSram => Command::RestorePageToSram,
            Opcode::CopyPageHostToSram => Command::CopyPageHostToSram,
            Opcode::CopyPageFlashToSram => Command::CopyPageFlashToSram { page: argument },
            Opcode::CopyPageSramToFlash => Command::CopyPageSramToFlash { page: argument },
            Opcode::EraseFlashSector => Command::EraseFlashSector { sector: argument },
        };
        Some(command)
    }
}

pub fn encode_address(opcode: Opcode, argument: u32) -> u32 {
    ((opcode as u32) << ARGUMENT_BITS) | (argument & ARGUMENT_MASK)
}

/// Split an address into (opcode bits, argument).
pub fn split_address(address: u32) -> (u32, u32) {
    let address = address & ADDRESS_MASK;
    (address >> ARGUMENT_BITS, address & ARGUMENT_MASK)
}

/// A selectable ROM slot, always within `MIN_SLOT..=MAX_SLOT`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Slot(u8);

impl Slot {
    pub fn new(value: u32) -> Option<Self> {
        if (MIN_SLOT as u32..=MAX_SLOT as u32).contains(&value) {
            Some(Slot(value as u8))
        } else {
            None
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Byte offset of the slot's region in flash.
    pub fn flash_offset(self) -> usize {
        self.0 as usize * SLOT_SIZE
    }

    /// Index of the slot's first flash sector.
    pub fn first_sector(self) -> usize {
        self.flash_offset() / FLASH_SECTOR_SIZE
    }

    /// Index of the slot's first flash page.
    pub fn first_page(self) -> usize {
        self.flash_offset() / FLASH_PAGE_SIZE
    }

    pub fn all() -> impl Iterator<Item = Slot> {
        (MIN_SLOT..=MAX_SLOT).map(Slot)
    }
}

impl core::fmt::Display for Slot {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}
