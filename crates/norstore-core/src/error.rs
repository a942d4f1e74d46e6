//! Generic flash error taxonomy
//!
//! These are the only error codes that cross the block-device contract.
//! Vendor drivers keep their own error enums and are translated into this
//! one by their adapter; the success code of the taxonomy is simply `Ok`.

use core::fmt;

/// Device-independent flash error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Error {
    /// A busy-wait ran out of budget, or the device was busy when it had
    /// to be idle
    Timeout,
    /// Address, length or erase index lies outside the device, or a write
    /// crosses a sector boundary
    InvalidAddress,
    /// The write-enable latch could not be set
    WriteProtected,
    /// The device has not been initialized
    NotInitialized,
    /// Programmed data did not read back as written
    VerificationFailed,
    /// Read operation failed
    ReadError,
    /// Write/program operation failed
    WriteError,
    /// Erase operation failed
    EraseError,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "operation timed out"),
            Self::InvalidAddress => write!(f, "invalid address"),
            Self::WriteProtected => write!(f, "flash is write protected"),
            Self::NotInitialized => write!(f, "flash device not initialized"),
            Self::VerificationFailed => write!(f, "verify failed: data mismatch"),
            Self::ReadError => write!(f, "read operation failed"),
            Self::WriteError => write!(f, "write operation failed"),
            Self::EraseError => write!(f, "erase operation failed"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the generic flash error
pub type Result<T> = core::result::Result<T, Error>;
