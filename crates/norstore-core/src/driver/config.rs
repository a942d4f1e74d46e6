//! Driver timing and behaviour configuration

/// Default busy-wait budget (status writes, suspend/resume)
pub const DEFAULT_TIMEOUT_MS: u32 = 3000;
/// Busy-wait budget before a read
pub const READ_TIMEOUT_MS: u32 = 3000;
/// Busy-wait budget after each page program
pub const WRITE_TIMEOUT_MS: u32 = 500;
/// Busy-wait budget after a 4 KiB sector erase
pub const SECTOR_ERASE_TIMEOUT_MS: u32 = 500;
/// Busy-wait budget after a 64 KiB block erase
pub const BLOCK_ERASE_TIMEOUT_MS: u32 = 2000;
/// Busy-wait budget after a chip erase
pub const CHIP_ERASE_TIMEOUT_MS: u32 = 20_000;

/// Driver configuration
///
/// Every timeout is a budget in milliseconds that one busy-wait may spend
/// in the transport's delay function. Each status poll that reports busy
/// costs `poll_interval_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "std", serde(default))]
pub struct DriverConfig {
    /// Budget for status writes and suspend/resume
    pub default_timeout_ms: u32,
    /// Budget spent waiting for idle before a read
    pub read_timeout_ms: u32,
    /// Budget after each page program
    pub write_timeout_ms: u32,
    /// Budget after a sector erase
    pub sector_erase_timeout_ms: u32,
    /// Budget after a block erase
    pub block_erase_timeout_ms: u32,
    /// Budget after a chip erase
    pub chip_erase_timeout_ms: u32,
    /// Delay between two status polls
    pub poll_interval_ms: u32,
    /// Read back every programmed chunk and compare
    pub verify_writes: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            read_timeout_ms: READ_TIMEOUT_MS,
            write_timeout_ms: WRITE_TIMEOUT_MS,
            sector_erase_timeout_ms: SECTOR_ERASE_TIMEOUT_MS,
            block_erase_timeout_ms: BLOCK_ERASE_TIMEOUT_MS,
            chip_erase_timeout_ms: CHIP_ERASE_TIMEOUT_MS,
            poll_interval_ms: 1,
            verify_writes: false,
        }
    }
}
