//! Cartridge bus pins through SIO.

use rprom::responder::{pins, BusSnapshot, DataBus};

const SIO_BASE: usize = 0xd000_0000;
const GPIO_IN: *const u32 = (SIO_BASE + 0x004) as *const u32;
const GPIO_HI_IN: *const u32 = (SIO_BASE + 0x008) as *const u32;
const GPIO_OUT: *mut u32 = (SIO_BASE + 0x010) as *mut u32;
const GPIO_OE_SET: *mut u32 = (SIO_BASE + 0x038) as *mut u32;
const GPIO_OE_CLR: *mut u32 = (SIO_BASE + 0x040) as *mut u32;
const GPIO_HI_OE_CLR: *mut u32 = (SIO_BASE + 0x044) as *mut u32;

const IO_BANK0_BASE: usize = 0x4002_8000;
const PADS_BANK0_BASE: usize = 0x4003_8000;

const FUNCSEL_SIO: u32 = 5;
const PAD_PDE: u32 = 1 << 2;
const PAD_PUE: u32 = 1 << 3;
const PAD_IE: u32 = 1 << 6;
const PAD_ISO: u32 = 1 << 8;

const DATA_MASK: u32 = pins::DATA_MASK as u32;

fn ctrl(pin: u32) -> *mut u32 {
    (IO_BANK0_BASE + 8 * pin as usize + 4) as *mut u32
}

fn pad(pin: u32) -> *mut u32 {
    (PADS_BANK0_BASE + 4 + 4 * pin as usize) as *mut u32
}

fn modify_pad(pin: u32, set: u32, clear: u32) {
    unsafe {
        let value = core::ptr::read_volatile(pad(pin));
        core::ptr::write_volatile(pad(pin), (value & !clear) | set);
    }
}

pub struct CartridgeBus;

impl CartridgeBus {
    /// Route every bus pin to SIO as an input. IO_BANK0 and PADS_BANK0 must
    /// be out of reset.
    pub fn take() -> Self {
        unsafe {
            core::ptr::write_volatile(GPIO_OE_CLR, u32::MAX);
            core::ptr::write_volatile(GPIO_HI_OE_CLR, (1 << (pins::BUS_PIN_COUNT - 32)) - 1);
        }
        for pin in 0..pins::BUS_PIN_COUNT {
            unsafe { core::ptr::write_volatile(ctrl(pin), FUNCSEL_SIO) };
            modify_pad(pin, PAD_IE, PAD_ISO | PAD_PUE | PAD_PDE);
        }
        CartridgeBus
    }

    /// Sample the BYTE strap with a pull-down, then leave the pin floating.
    pub fn read_strap(&mut self) -> bool {
        modify_pad(pins::BYTE_PIN, PAD_PDE, 0);
        cortex_m::asm::delay(1_000);
        let high = self.sample().pins() & (1 << pins::BYTE_PIN) != 0;
        modify_pad(pins::BYTE_PIN, 0, PAD_PDE);
        high
    }
}

impl DataBus for CartridgeBus {
    #[inline(always)]
    fn sample(&mut self) -> BusSnapshot {
        let (low, high) = unsafe { (core::ptr::read_volatile(GPIO_IN), core::ptr::read_volatile(GPIO_HI_IN)) };
        BusSnapshot::from_pins(((high as u64) << 32) | low as u64)
    }

    #[inline(always)]
    fn drive(&mut self, value: u16) {
        unsafe {
            // Only the data pins are ever outputs.
            core::ptr::write_volatile(GPIO_OUT, value as u32);
            core::ptr::write_volatile(GPIO_OE_SET, DATA_MASK);
        }
    }

    #[inline(always)]
    fn release(&mut self) {
        unsafe { core::ptr::write_volatile(GPIO_OE_CLR, DATA_MASK) };
    }
}
