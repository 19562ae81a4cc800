use std::io;
use std::path::PathBuf;

use rprom::error::{FlashError, HostError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Slot must be between 1 and 7, got {0}")]
    InvalidSlot(u32),
    #[error("Image {path} is {found} bytes, a slot holds exactly {expected}")]
    ImageSize {
        path: PathBuf,
        expected: usize,
        found: usize,
    },
    #[error("Buffer is {found} bytes, a slot holds exactly {expected}")]
    BufferSize { expected: usize, found: usize },
    #[error("Flash dump {0} not found (create one with `rprom init`)")]
    MissingFlash(PathBuf),
    #[error("Flash dump {0} already exists")]
    FlashExists(PathBuf),
    #[error("Flash dump {path} is {found} bytes, expected {expected}")]
    FlashSize {
        path: PathBuf,
        expected: usize,
        found: usize,
    },
    #[error("Verification failed: expected crc64 {expected:016x}, found {found:016x}")]
    ChecksumMismatch { expected: u64, found: u64 },
    #[error("Device error: {0}")]
    Device(#[from] FlashError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl From<HostError> for CliError {
    fn from(e: HostError) -> Self {
        match e {
            HostError::InvalidSlot(slot) => CliError::InvalidSlot(slot),
            HostError::ImageSize { expected, found } => CliError::BufferSize { expected, found },
        }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
