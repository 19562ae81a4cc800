//! Emulated cartridge backed by a flash dump file.
//!
//! The dump is memory-mapped and used as the cartridge's flash, so every
//! program and erase the firmware logic performs lands in the file.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use memmap2::MmapMut;
use rprom::config::FLASH_SIZE;
use rprom::flash::{SimFlash, ERASED_BYTE};
use rprom::host::{HostSession, RomBus};
use rprom::image::{boxed_image, RomImage};
use rprom::responder::{AddressDecoder, BusLayout, Contiguous, Split};
use rprom::sim::Cartridge;

use crate::error::{CliError, Result};

/// Address wiring of the emulated board.
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Layout {
    /// A0..A17 on consecutive pins (board revision 6).
    #[default]
    Contiguous,
    /// A17 on the BYTE pin (board revision 5).
    Split,
}

impl From<Layout> for BusLayout {
    fn from(layout: Layout) -> Self {
        match layout {
            Layout::Contiguous => BusLayout::Contiguous,
            Layout::Split => BusLayout::Split,
        }
    }
}

/// Host session over the emulated bus.
pub type Session<'s> = HostSession<&'s mut dyn RomBus>;

pub struct Device {
    path: PathBuf,
    flash: SimFlash<MmapMut>,
    layout: BusLayout,
}

impl Device {
    /// Write a blank (all `0xFF`) flash dump.
    pub fn create(path: &Path, overwrite: bool) -> Result<()> {
        if path.exists() && !overwrite {
            return Err(CliError::FlashExists(path.to_path_buf()));
        }
        let mut file = File::create(path)?;
        file.write_all(&vec![ERASED_BYTE; FLASH_SIZE])?;
        file.sync_all()?;
        tracing::info!("Created blank {} MiB flash dump at {:?}", FLASH_SIZE >> 20, path);
        Ok(())
    }

    pub fn open(path: &Path, layout: impl Into<BusLayout>) -> Result<Self> {
        if !path.exists() {
            return Err(CliError::MissingFlash(path.to_path_buf()));
        }
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let len = file.metadata()?.len() as usize;
        if len != FLASH_SIZE {
            return Err(CliError::FlashSize {
                path: path.to_path_buf(),
                expected: FLASH_SIZE,
                found: len,
            });
        }
        // The file is ours for the duration of the command.
        let map = unsafe { MmapMut::map_mut(&file)? };
        Ok(Self {
            path: path.to_path_buf(),
            flash: SimFlash::new(map),
            layout: layout.into(),
        })
    }

    /// Power the cartridge on, run `f` against it, then flush the dump.
    pub fn session<R>(self, f: impl FnOnce(&mut Session<'_>) -> R) -> Result<R> {
        let words = boxed_image();
        let image = RomImage::new(&words);
        let (result, flash) = match self.layout {
            BusLayout::Contiguous => drive::<Contiguous, R>(image, self.flash, f)?,
            BusLayout::Split => drive::<Split, R>(image, self.flash, f)?,
        };
        let map = flash.into_inner();
        map.flush()?;
        tracing::debug!("Flushed {:?}", self.path);
        Ok(result)
    }
}

fn drive<D: AddressDecoder, R>(
    image: RomImage<'_>,
    flash: SimFlash<MmapMut>,
    f: impl FnOnce(&mut Session<'_>) -> R,
) -> Result<(R, SimFlash<MmapMut>)> {
    let mut cartridge = Cartridge::<_, D>::power_on(image, flash)?;
    tracing::debug!("Cartridge powered on, active slot {}", cartridge.active_slot());
    let mut session: Session<'_> = HostSession::new(&mut cartridge as &mut dyn RomBus);
    let result = f(&mut session);
    drop(session);
    Ok((result, cartridge.into_flash()))
}
