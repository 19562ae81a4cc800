// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Bus responder: the ROM impersonation loop.
//!
//! Every iteration samples all bus lines at once. While output-enable is
//! asserted the addressed image word is driven onto the data lines; otherwise
//! the lines are released. The first sample of each assertion forwards the
//! address to the dispatcher. Nothing in here may block: the host's read
//! cycle does not wait.

use core::marker::PhantomData;

use crate::channel::AddressSender;
use crate::image::RomImage;
use crate::protocol::ADDRESS_MASK;

/// GPIO assignment on the cartridge board.
pub mod pins {
    /// Data lines D0..D15 are GPIO 0..15.
    pub const DATA_MASK: u64 = 0xFFFF;
    /// First address line.
    pub const ADDRESS_SHIFT: u32 = 16;
    /// Byte-mode pin; doubles as the board revision strap and, on the split
    /// layout, as address bit 17.
    pub const BYTE_PIN: u32 = 34;
    /// Chip enable, active low.
    pub const CE_PIN: u32 = 35;
    /// Output enable, active low.
    pub const OE_PIN: u32 = 36;
    pub const RESET_PIN: u32 = 37;
    /// Pins routed to SIO at boot.
    pub const BUS_PIN_COUNT: u32 = 40;
}

/// Simultaneous sample of every GPIO level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BusSnapshot(u64);

impl BusSnapshot {
    pub fn from_pins(levels: u64) -> Self {
        BusSnapshot(levels)
    }

    /// Bus at rest: enables deasserted.
    pub fn idle() -> Self {
        BusSnapshot((1 << pins::OE_PIN) | (1 << pins::CE_PIN))
    }

    /// Host read of `address` as seen through layout `D`.
    pub fn read_cycle<D: AddressDecoder>(address: u32) -> Self {
        BusSnapshot(D::address_pins(address))
    }

    pub fn pins(self) -> u64 {
        self.0
    }

    #[inline(always)]
    pub fn output_enabled(self) -> bool {
        self.0 & (1 << pins::OE_PIN) == 0
    }

    #[inline(always)]
    pub fn chip_enabled(self) -> bool {
        self.0 & (1 << pins::CE_PIN) == 0
    }
}

/// How address bits are wired to GPIOs.
pub trait AddressDecoder {
    fn decode(snapshot: BusSnapshot) -> u32;

    /// Pin levels carrying `address`, with both enables asserted.
    fn address_pins(address: u32) -> u64;
}

/// Board revision 6: A0..A17 on GPIO 16..33.
pub struct Contiguous;

impl AddressDecoder for Contiguous {
    #[inline(always)]
    fn decode(snapshot: BusSnapshot) -> u32 {
        (snapshot.0 >> pins::ADDRESS_SHIFT) as u32 & ADDRESS_MASK
    }

    fn address_pins(address: u32) -> u64 {
        ((address & ADDRESS_MASK) as u64) << pins::ADDRESS_SHIFT
    }
}

/// Board revision 5: A0..A16 on GPIO 16..32, A17 on the BYTE pin.
pub struct Split;

const SPLIT_LOW_MASK: u32 = (1 << 17) - 1;

impl AddressDecoder for Split {
    #[inline(always)]
    fn decode(snapshot: BusSnapshot) -> u32 {
        let low = (snapshot.0 >> pins::ADDRESS_SHIFT) as u32 & SPLIT_LOW_MASK;
        let high = (snapshot.0 >> (pins::BYTE_PIN - 17)) as u32 & (1 << 17);
        low | high
    }

    fn address_pins(address: u32) -> u64 {
        let low = ((address & SPLIT_LOW_MASK) as u64) << pins::ADDRESS_SHIFT;
        let high = (((address >> 17) & 1) as u64) << pins::BYTE_PIN;
        low | high
    }
}

/// Address wiring, chosen once at boot from the strap pin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BusLayout {
    Contiguous,
    Split,
}

impl BusLayout {
    /// The BYTE pin is pulled down during sampling; revision 6 boards tie it
    /// high.
    pub fn from_strap(byte_pin_high: bool) -> Self {
        if byte_pin_high {
            BusLayout::Contiguous
        } else {
            BusLayout::Split
        }
    }
}

/// Physical bus access used by [`BusResponder::run`].
pub trait DataBus {
    fn sample(&mut self) -> BusSnapshot;

    /// Put `value` on the data lines and turn them to outputs.
    fn drive(&mut self, value: u16);

    /// Turn the data lines back to inputs.
    fn release(&mut self);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BusAction {
    Drive(u16),
    Release,
}

pub struct BusResponder<'a, D> {
    image: RomImage<'a>,
    /// Address of the current assertion already forwarded.
    triggered: bool,
    _layout: PhantomData<D>,
}

impl<'a, D: AddressDecoder> BusResponder<'a, D> {
    pub fn new(image: RomImage<'a>) -> Self {
        Self {
            image,
            triggered: false,
            _layout: PhantomData,
        }
    }

    /// One loop iteration.
    #[inline(always)]
    pub fn step<S: AddressSender>(&mut self, snapshot: BusSnapshot, tx: &S) -> BusAction {
        if snapshot.output_enabled() {
            let address = D::decode(snapshot);
            let value = self.image.bus_word(address);
            if !self.triggered {
                // Dropped when the dispatcher is behind.
                let _ = tx.try_send(address);
                self.triggered = true;
            }
            BusAction::Drive(value)
        } else {
            self.triggered = false;
            BusAction::Release
        }
    }

    pub fn run<B: DataBus, S: AddressSender>(&mut self, bus: &mut B, tx: &S) -> ! {
        loop {
            let snapshot = bus.sample();
            match self.step(snapshot, tx) {
                BusAction::Drive(value) => bus.drive(value),
                BusAction::Release => bus.release(),
            }
        }
    }
}
