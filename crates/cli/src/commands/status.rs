use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use rprom::status::StatusRecord;
use serde::Serialize;

use crate::device::Device;

/// Status record as reported to the user.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub magic: String,
    pub status_length: u8,
    pub firmware_version: String,
    pub flash_size_mb: u8,
    pub active_slot: u8,
}

impl From<StatusRecord> for StatusReport {
    fn from(status: StatusRecord) -> Self {
        Self {
            magic: String::from_utf8_lossy(&status.magic).into_owned(),
            status_length: status.status_length,
            firmware_version: format!(
                "{}.{}.{}",
                status.major_version, status.minor_version, status.patch_version
            ),
            flash_size_mb: status.flash_size_mb,
            active_slot: status.active_slot,
        }
    }
}

pub fn query(device: Device) -> anyhow::Result<StatusReport> {
    let status = device.session(|session| session.status())?;
    if !status.has_valid_magic() {
        tracing::warn!("Status record has unexpected magic {:02x?}", status.magic);
    }
    Ok(status.into())
}

pub fn run(device: Device, json: bool) -> anyhow::Result<()> {
    let report = query(device)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("\nRPROM Status");
    println!("------------");

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Field", "Value"]);
    table.add_row(vec!["Firmware version".to_string(), report.firmware_version.clone()]);
    table.add_row(vec!["Flash size".to_string(), format!("{} MB", report.flash_size_mb)]);
    table.add_row(vec!["Active slot".to_string(), report.active_slot.to_string()]);
    println!("{table}");
    Ok(())
}
