use std::fs;
use std::path::Path;

use anyhow::Context;
use rprom::config::SLOT_SIZE;
use rprom::host::validate_slot;

use crate::commands::progress_bar;
use crate::device::Device;
use crate::error::CliError;

/// Read a whole slot through the bus protocol.
pub fn read_image(device: Device, slot: u32) -> anyhow::Result<Vec<u8>> {
    let slot = validate_slot(slot).map_err(CliError::from)?;
    let mut image = vec![0u8; SLOT_SIZE];
    device
        .session(|session| session.read_slot(slot.get() as u32, &mut image, progress_bar("Reading")))?
        .map_err(CliError::from)?;
    Ok(image)
}

pub fn run(device: Device, slot: u32, file: &Path) -> anyhow::Result<()> {
    let image = read_image(device, slot)?;
    fs::write(file, &image).with_context(|| format!("Failed to write {}", file.display()))?;
    println!("Read slot {} to file {}", slot, file.display());
    Ok(())
}
