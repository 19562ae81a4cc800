use std::fs;
use std::path::Path;

use rprom::config::{FLASH_SIZE, SLOT_SIZE};
use rprom::error::HostError;
use rprom_cli::commands::{erase, init, read, status, switch, write};
use rprom_cli::device::{Device, Layout};
use rprom_cli::error::CliError;
use tempfile::tempdir;

fn sample_image(seed: u8) -> Vec<u8> {
    (0..SLOT_SIZE).map(|i| (i as u8).wrapping_mul(31) ^ seed ^ (i >> 9) as u8).collect()
}

fn open(flash: &Path) -> Device {
    Device::open(flash, Layout::Contiguous).unwrap()
}

fn cli_error(result: anyhow::Result<()>) -> CliError {
    result.unwrap_err().downcast::<CliError>().unwrap()
}

#[test]
fn test_init_creates_blank_dump() {
    let dir = tempdir().unwrap();
    let flash = dir.path().join("flash.bin");

    init::run(&flash, false).unwrap();
    let bytes = fs::read(&flash).unwrap();
    assert_eq!(bytes.len(), FLASH_SIZE);
    assert!(bytes.iter().all(|&b| b == 0xFF));

    assert!(matches!(cli_error(init::run(&flash, false)), CliError::FlashExists(_)));
    assert!(init::run(&flash, true).is_ok());
}

#[test]
fn test_missing_or_truncated_dump_is_rejected() {
    let dir = tempdir().unwrap();
    let flash = dir.path().join("flash.bin");
    assert!(matches!(
        Device::open(&flash, Layout::Contiguous),
        Err(CliError::MissingFlash(_))
    ));

    fs::write(&flash, vec![0xFFu8; 1024]).unwrap();
    assert!(matches!(
        Device::open(&flash, Layout::Split),
        Err(CliError::FlashSize { found: 1024, .. })
    ));
}

#[test]
fn test_status_of_fresh_dump() {
    let dir = tempdir().unwrap();
    let flash = dir.path().join("flash.bin");
    init::run(&flash, false).unwrap();

    let report = status::query(open(&flash)).unwrap();
    assert_eq!(report.magic, "RPRM");
    assert_eq!(report.status_length, 10);
    assert_eq!(report.firmware_version, env!("CARGO_PKG_VERSION"));
    assert_eq!(report.flash_size_mb, 4);
    assert_eq!(report.active_slot, 1);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["active_slot"], 1);

    assert!(status::run(open(&flash), true).is_ok());
    assert!(status::run(open(&flash), false).is_ok());
}

#[test]
fn test_write_read_round_trip() {
    let dir = tempdir().unwrap();
    let flash = dir.path().join("flash.bin");
    let image_path = dir.path().join("kick.rom");
    let out_path = dir.path().join("readback.rom");
    init::run(&flash, false).unwrap();

    let image = sample_image(0x5A);
    fs::write(&image_path, &image).unwrap();
    write::run(open(&flash), 2, &image_path, true).unwrap();

    // The dump holds the image at the slot's offset.
    let dump = fs::read(&flash).unwrap();
    assert!(dump[2 * SLOT_SIZE..3 * SLOT_SIZE] == image[..]);
    assert!(dump[3 * SLOT_SIZE..].iter().all(|&b| b == 0xFF));

    read::run(open(&flash), 2, &out_path).unwrap();
    let readback = fs::read(&out_path).unwrap();
    assert!(readback == image);
    assert_eq!(write::compute_crc64(&readback), write::compute_crc64(&image));
}

#[test]
fn test_switch_then_status_over_split_layout() {
    let dir = tempdir().unwrap();
    let flash = dir.path().join("flash.bin");
    let image_path = dir.path().join("kick.rom");
    init::run(&flash, false).unwrap();

    let image = sample_image(0x11);
    fs::write(&image_path, &image).unwrap();
    write::run(Device::open(&flash, Layout::Split).unwrap(), 6, &image_path, false).unwrap();
    switch::run(Device::open(&flash, Layout::Split).unwrap(), 6).unwrap();

    let report = status::query(Device::open(&flash, Layout::Split).unwrap()).unwrap();
    assert_eq!(report.active_slot, 6);

    // The choice survives with the other wiring too.
    let report = status::query(open(&flash)).unwrap();
    assert_eq!(report.active_slot, 6);
}

#[test]
fn test_erase_blanks_only_the_slot() {
    let dir = tempdir().unwrap();
    let flash = dir.path().join("flash.bin");
    let image_path = dir.path().join("kick.rom");
    init::run(&flash, false).unwrap();

    fs::write(&image_path, sample_image(1)).unwrap();
    write::run(open(&flash), 3, &image_path, false).unwrap();
    write::run(open(&flash), 4, &image_path, false).unwrap();
    erase::run(open(&flash), 3).unwrap();

    let blank = read::read_image(open(&flash), 3).unwrap();
    assert!(blank.iter().all(|&b| b == 0xFF));
    let kept = read::read_image(open(&flash), 4).unwrap();
    assert!(kept == sample_image(1));
}

#[test]
fn test_invalid_requests_leave_dump_untouched() {
    let dir = tempdir().unwrap();
    let flash = dir.path().join("flash.bin");
    let image_path = dir.path().join("short.rom");
    init::run(&flash, false).unwrap();

    assert!(matches!(cli_error(switch::run(open(&flash), 0)), CliError::InvalidSlot(0)));
    assert!(matches!(cli_error(erase::run(open(&flash), 8)), CliError::InvalidSlot(8)));

    fs::write(&image_path, vec![0u8; 1000]).unwrap();
    match cli_error(write::run(open(&flash), 1, &image_path, false)) {
        CliError::ImageSize { path, expected, found } => {
            assert_eq!(path, image_path);
            assert_eq!(expected, SLOT_SIZE);
            assert_eq!(found, 1000);
        }
        other => panic!("unexpected error {other:?}"),
    }

    let dump = fs::read(&flash).unwrap();
    assert!(dump.iter().all(|&b| b == 0xFF));
}

#[test]
fn test_short_buffer_error_names_sizes() {
    let err = CliError::from(HostError::ImageSize { expected: SLOT_SIZE, found: 2 });
    assert!(matches!(err, CliError::BufferSize { expected: SLOT_SIZE, found: 2 }));
    assert_eq!(err.to_string(), format!("Buffer is 2 bytes, a slot holds exactly {SLOT_SIZE}"));

    assert!(matches!(CliError::from(HostError::InvalidSlot(9)), CliError::InvalidSlot(9)));
}
