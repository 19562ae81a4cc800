use rprom::host::validate_slot;

use crate::commands::progress_bar;
use crate::device::Device;
use crate::error::CliError;

pub fn run(device: Device, slot: u32) -> anyhow::Result<()> {
    let slot = validate_slot(slot).map_err(CliError::from)?;
    device
        .session(|session| session.erase_slot(slot.get() as u32, progress_bar("Erasing")))?
        .map_err(CliError::from)?;
    println!("Erased slot {}", slot);
    Ok(())
}
