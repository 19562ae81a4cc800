use std::path::Path;

use crate::device::Device;

pub fn run(flash: &Path, force: bool) -> anyhow::Result<()> {
    Device::create(flash, force)?;
    println!("Created blank flash dump {}", flash.display());
    Ok(())
}
