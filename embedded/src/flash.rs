// -----------------------------------------------------------------------
// QSPI flash through the boot ROM
// -----------------------------------------------------------------------
// Reads go through the XIP window. Program and erase leave XIP mode for
// the duration of the call, so the code doing it lives in RAM and the
// responder core must not touch flash meanwhile (it never does).

use rp235x_hal::rom_data;
use rprom::config::{FLASH_PAGE_SIZE, FLASH_SECTOR_SIZE, FLASH_SIZE};
use rprom::error::{FlashError, FlashResult};
use rprom::flash::Flash;

const XIP_BASE: usize = 0x1000_0000;
/// 4 KiB sector erase.
const SECTOR_ERASE_CMD: u8 = 0x20;

pub struct RomFlash;

impl RomFlash {
    fn check(offset: usize, len: usize, align: usize) -> FlashResult<()> {
        if offset.checked_add(len).map_or(true, |end| end > FLASH_SIZE) {
            return Err(FlashError::OutOfRange);
        }
        if offset % align != 0 || len % align != 0 {
            return Err(FlashError::Misaligned);
        }
        Ok(())
    }

    #[inline(never)]
    #[link_section = ".data.ram_func"]
    fn with_xip_disabled<R>(f: impl FnOnce() -> R) -> R {
        cortex_m::interrupt::free(|_| unsafe {
            rom_data::connect_internal_flash();
            rom_data::flash_exit_xip();
            let result = f();
            rom_data::flash_flush_cache();
            rom_data::flash_enter_cmd_xip();
            result
        })
    }
}

impl Flash for RomFlash {
    fn capacity(&self) -> usize {
        FLASH_SIZE
    }

    fn read(&self, offset: usize, buf: &mut [u8]) -> FlashResult<()> {
        Self::check(offset, buf.len(), 1)?;
        unsafe {
            core::ptr::copy_nonoverlapping((XIP_BASE + offset) as *const u8, buf.as_mut_ptr(), buf.len());
        }
        Ok(())
    }

    fn program(&mut self, offset: usize, data: &[u8]) -> FlashResult<()> {
        Self::check(offset, data.len(), FLASH_PAGE_SIZE)?;
        Self::with_xip_disabled(|| unsafe {
            rom_data::flash_range_program(offset as u32, data.as_ptr(), data.len());
        });
        Ok(())
    }

    fn erase_sector(&mut self, offset: usize) -> FlashResult<()> {
        Self::check(offset, FLASH_SECTOR_SIZE, FLASH_SECTOR_SIZE)?;
        Self::with_xip_disabled(|| unsafe {
            rom_data::flash_range_erase(offset as u32, FLASH_SECTOR_SIZE, FLASH_SECTOR_SIZE as u32, SECTOR_ERASE_CMD);
        });
        Ok(())
    }
}
