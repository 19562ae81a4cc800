use rprom::host::validate_slot;

use crate::device::Device;
use crate::error::CliError;

pub fn run(device: Device, slot: u32) -> anyhow::Result<()> {
    let slot = validate_slot(slot).map_err(CliError::from)?;
    let slot = device.session(|session| session.switch(slot.get() as u32))?.map_err(CliError::from)?;
    tracing::info!("Active slot set to {}", slot);
    println!("Reset the host to boot from slot {}", slot);
    Ok(())
}
