use std::fs;
use std::path::Path;

use anyhow::Context;
use crc64fast::Digest;
use rprom::config::SLOT_SIZE;
use rprom::error::HostResult;
use rprom::host::validate_slot;

use crate::commands::progress_bar;
use crate::device::Device;
use crate::error::CliError;

pub fn run(device: Device, slot: u32, file: &Path, verify: bool) -> anyhow::Result<()> {
    let slot = validate_slot(slot).map_err(CliError::from)?;
    let image = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    if image.len() != SLOT_SIZE {
        return Err(CliError::ImageSize {
            path: file.to_path_buf(),
            expected: SLOT_SIZE,
            found: image.len(),
        }
        .into());
    }

    let readback = device
        .session(|session| -> HostResult<Option<Vec<u8>>> {
            session.write_slot(slot.get() as u32, &image, progress_bar("Erasing"), progress_bar("Writing"))?;
            if !verify {
                return Ok(None);
            }
            let mut readback = vec![0u8; SLOT_SIZE];
            session.read_slot(slot.get() as u32, &mut readback, progress_bar("Verifying"))?;
            Ok(Some(readback))
        })?
        .map_err(CliError::from)?;
    println!("Wrote file {} to slot {}", file.display(), slot);

    if let Some(readback) = readback {
        let expected = compute_crc64(&image);
        let found = compute_crc64(&readback);
        if expected != found {
            return Err(CliError::ChecksumMismatch { expected, found }.into());
        }
        println!("Verified crc64 {:016x}", found);
    }
    Ok(())
}

pub fn compute_crc64(data: &[u8]) -> u64 {
    let mut digest = Digest::new();
    digest.write(data);
    digest.sum64()
}
