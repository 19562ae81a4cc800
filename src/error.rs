//! Error types.

use core::fmt;

/// Flash driver failures. None of them is recoverable by the core: the
/// operation that hit one is abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashError {
    /// Request extends past the end of the flash.
    OutOfRange,
    /// Offset or length is not aligned to the page/sector size.
    Misaligned,
    /// The device itself reported a failure.
    Device,
}

impl fmt::Display for FlashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlashError::OutOfRange => write!(f, "flash access out of range"),
            FlashError::Misaligned => write!(f, "flash access misaligned"),
            FlashError::Device => write!(f, "flash device failure"),
        }
    }
}

/// Host-side validation failures, raised before any bus access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostError {
    /// Slot outside 1..=7.
    InvalidSlot(u32),
    /// Image buffer is not exactly one slot long.
    ImageSize { expected: usize, found: usize },
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::InvalidSlot(slot) => write!(f, "slot must be between 1 and 7, got {}", slot),
            HostError::ImageSize { expected, found } => {
                write!(f, "image must be exactly {} bytes, got {}", expected, found)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FlashError {}

#[cfg(feature = "std")]
impl std::error::Error for HostError {}

pub type FlashResult<T> = core::result::Result<T, FlashError>;
pub type HostResult<T> = core::result::Result<T, HostError>;
