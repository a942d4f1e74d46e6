//! W25Qxx driver error codes
//!
//! These never cross the block-device contract; the adapter translates
//! them into [`crate::Error`].

use core::fmt;

/// Error reported by the W25Qxx command driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverError {
    /// Busy-wait budget exhausted, or device busy when write-enable was
    /// requested
    Timeout,
    /// Out-of-range address, length or erase index, or a write that spans
    /// two sectors
    InvalidAddress,
    /// WEL did not read back set after Write Enable
    WriteProtected,
    /// Operation needs an initialized driver
    InvalidParameter,
    /// Read-back after program did not match
    VerificationFailed,
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "W25Qxx busy-wait timed out"),
            Self::InvalidAddress => write!(f, "W25Qxx address out of range"),
            Self::WriteProtected => write!(f, "W25Qxx write enable latch not set"),
            Self::InvalidParameter => write!(f, "W25Qxx driver not initialized"),
            Self::VerificationFailed => write!(f, "W25Qxx program verify mismatch"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DriverError {}
