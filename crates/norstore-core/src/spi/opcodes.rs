//! Winbond W25Qxx command set
//!
//! Only the commands the driver and the emulator actually speak are listed
//! here. Values follow the W25Q datasheets, which agree with the common
//! JEDEC assignments.

// ============================================================================
// Write control
// ============================================================================

/// Write Enable - required before any program/erase/status-write command
pub const WREN: u8 = 0x06;
/// Write Disable - clears the WEL bit
pub const WRDI: u8 = 0x04;

// ============================================================================
// Status registers
// ============================================================================

/// Read Status Register 1
pub const RDSR: u8 = 0x05;
/// Read Status Register 2
pub const RDSR2: u8 = 0x35;
/// Read Status Register 3
pub const RDSR3: u8 = 0x15;
/// Write Status Register 1
pub const WRSR: u8 = 0x01;
/// Write Status Register 2
pub const WRSR2: u8 = 0x31;
/// Write Status Register 3
pub const WRSR3: u8 = 0x11;

// ============================================================================
// Identification
// ============================================================================

/// Read JEDEC ID (manufacturer + 16-bit device ID)
pub const RDID: u8 = 0x9F;

// ============================================================================
// Read
// ============================================================================

/// Read Data with 3-byte address, no dummy cycles
pub const READ: u8 = 0x03;
/// Fast Read with 3-byte address and one dummy byte
pub const FAST_READ: u8 = 0x0B;
/// Read Data with 4-byte address
pub const READ_4B: u8 = 0x13;
/// Fast Read with 4-byte address and one dummy byte
pub const FAST_READ_4B: u8 = 0x0C;

// ============================================================================
// Page Program
// ============================================================================

/// Page Program with 3-byte address
pub const PP: u8 = 0x02;
/// Page Program with 4-byte address
pub const PP_4B: u8 = 0x12;

// ============================================================================
// Erase
// ============================================================================

/// Sector Erase 4KB with 3-byte address
pub const SE_20: u8 = 0x20;
/// Block Erase 32KB with 3-byte address
pub const BE_52: u8 = 0x52;
/// Block Erase 64KB with 3-byte address
pub const BE_D8: u8 = 0xD8;
/// Sector Erase 4KB with 4-byte address
pub const SE_21: u8 = 0x21;
/// Block Erase 64KB with 4-byte address
pub const BE_DC: u8 = 0xDC;
/// Chip Erase
pub const CE_C7: u8 = 0xC7;
/// Chip Erase (alternate opcode)
pub const CE_60: u8 = 0x60;

// ============================================================================
// Suspend/Resume
// ============================================================================

/// Erase/Program Suspend
pub const SUSPEND: u8 = 0x75;
/// Erase/Program Resume
pub const RESUME: u8 = 0x7A;

// ============================================================================
// Power management
// ============================================================================

/// Deep Power Down
pub const DP: u8 = 0xB9;
/// Release from Deep Power Down
pub const RDP: u8 = 0xAB;

// ============================================================================
// Status register bit definitions
// ============================================================================

/// Status Register 1: Busy / Write In Progress
pub const SR1_BUSY: u8 = 0x01;
/// Status Register 1: Write Enable Latch
pub const SR1_WEL: u8 = 0x02;
/// Status Register 2: Erase/Program Suspend Status
pub const SR2_SUS: u8 = 0x80;

/// Filler byte clocked out while reading, and the fast-read dummy byte
pub const DUMMY: u8 = 0x00;
