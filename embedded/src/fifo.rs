//! Inter-core channel on the SIO mailbox FIFOs.
//!
//! Each core sees its outbound FIFO through FIFO_WR and its inbound FIFO
//! through FIFO_RD at the same addresses, so one zero-sized handle serves
//! both ends.

use rprom::channel::{AddressReceiver, AddressSender, ChannelFull};

const SIO_BASE: usize = 0xd000_0000;
const FIFO_ST: *const u32 = (SIO_BASE + 0x050) as *const u32;
const FIFO_WR: *mut u32 = (SIO_BASE + 0x054) as *mut u32;
const FIFO_RD: *const u32 = (SIO_BASE + 0x058) as *const u32;

/// FIFO_ST: inbound holds data.
const ST_VLD: u32 = 1 << 0;
/// FIFO_ST: outbound has room.
const ST_RDY: u32 = 1 << 1;

pub struct SioFifo;

impl SioFifo {
    #[inline(always)]
    fn status() -> u32 {
        unsafe { core::ptr::read_volatile(FIFO_ST) }
    }
}

impl AddressSender for SioFifo {
    #[inline(always)]
    fn try_send(&self, address: u32) -> Result<(), ChannelFull> {
        if Self::status() & ST_RDY == 0 {
            return Err(ChannelFull);
        }
        unsafe { core::ptr::write_volatile(FIFO_WR, address) };
        // Wake the other core if it sleeps in `recv`.
        cortex_m::asm::sev();
        Ok(())
    }
}

impl AddressReceiver for SioFifo {
    fn recv(&self) -> u32 {
        loop {
            if let Some(address) = self.try_recv() {
                return address;
            }
            cortex_m::asm::wfe();
        }
    }

    #[inline(always)]
    fn try_recv(&self) -> Option<u32> {
        if Self::status() & ST_VLD == 0 {
            return None;
        }
        Some(unsafe { core::ptr::read_volatile(FIFO_RD) })
    }
}
