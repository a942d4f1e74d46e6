//! Static capacity table for the W25Qxx family
//!
//! The table is keyed on the JEDEC density code only. Parts from other
//! vendors that follow the same density encoding resolve to the same
//! capacity; anything else falls back to [`DEFAULT_ENTRY`].

use super::types::{DeviceGeometry, DeviceIdentity};

/// Page size shared by the whole family
pub const PAGE_SIZE: u32 = 256;
/// 4 KiB sector
pub const SECTOR_SIZE: u32 = 4 * 1024;
/// 64 KiB block
pub const BLOCK_SIZE: u32 = 64 * 1024;
/// Rated program/erase cycles
pub const ERASE_CYCLES: u32 = 100_000;

/// One row of the capacity table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChipEntry {
    /// JEDEC density code (low byte of the device ID)
    pub density_code: u8,
    /// Part name
    pub name: &'static str,
    /// Total capacity in bytes
    pub capacity: u32,
    /// Whether erase suspend/resume is supported
    pub supports_suspend: bool,
}

impl ChipEntry {
    const fn winbond(density_code: u8, name: &'static str) -> Self {
        Self {
            density_code,
            name,
            capacity: 1u32 << (density_code as u32),
            supports_suspend: true,
        }
    }

    /// Geometry of a part described by this entry
    pub const fn geometry(&self) -> DeviceGeometry {
        DeviceGeometry::uniform(
            self.capacity,
            PAGE_SIZE,
            SECTOR_SIZE,
            BLOCK_SIZE,
            ERASE_CYCLES,
            self.supports_suspend,
        )
    }
}

/// Known parts, smallest first
pub static CHIPS: &[ChipEntry] = &[
    ChipEntry::winbond(0x13, "W25Q40"),
    ChipEntry::winbond(0x14, "W25Q80"),
    ChipEntry::winbond(0x15, "W25Q16"),
    ChipEntry::winbond(0x16, "W25Q32"),
    ChipEntry::winbond(0x17, "W25Q64"),
    ChipEntry::winbond(0x18, "W25Q128"),
    ChipEntry::winbond(0x19, "W25Q256"),
];

/// Conservative fallback for unrecognized density codes: 4 MiB, no suspend
pub const DEFAULT_ENTRY: ChipEntry = ChipEntry {
    density_code: 0,
    name: "unknown",
    capacity: 4 * 1024 * 1024,
    supports_suspend: false,
};

/// Find the table entry for an identity, if any
///
/// Capacities follow the JEDEC density code as Winbond datasheets define
/// it, `1 << code` bytes: `0x18` is the 16 MiB W25Q128. Some vendor C
/// drivers are off by one here and report `0x18` as 32 MiB; this table
/// does not reproduce that.
pub fn find(identity: &DeviceIdentity) -> Option<&'static ChipEntry> {
    let code = identity.density_code();
    CHIPS.iter().find(|entry| entry.density_code == code)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(identity: &DeviceIdentity) -> &'static ChipEntry {
        find(identity).unwrap_or(&DEFAULT_ENTRY)
    }

    #[test]
    fn test_capacity_is_two_to_the_density_code() {
        for entry in CHIPS {
            assert_eq!(entry.capacity, 1u32 << entry.density_code, "{}", entry.name);
        }
        let w25q128 = find(&DeviceIdentity::new(0xEF, 0x4018)).unwrap();
        assert_ne!(w25q128.capacity, 32 * 1024 * 1024);
    }

    #[test]
    fn test_w25q128_is_16mib() {
        let entry = lookup(&DeviceIdentity::new(0xEF, 0x4018));
        assert_eq!(entry.name, "W25Q128");
        assert_eq!(entry.capacity, 16 * 1024 * 1024);
        let g = entry.geometry();
        assert_eq!(g.block_count, 256);
        assert!(g.supports_suspend);
        assert!(g.is_consistent());
    }

    #[test]
    fn test_every_entry_is_consistent() {
        for entry in CHIPS {
            assert!(entry.geometry().is_consistent(), "{}", entry.name);
        }
    }

    #[test]
    fn test_unknown_code_uses_default() {
        let id = DeviceIdentity::new(0x12, 0x3456);
        assert!(find(&id).is_none());
        let entry = lookup(&id);
        assert_eq!(entry.capacity, 4 * 1024 * 1024);
        assert!(!entry.supports_suspend);
        assert!(entry.geometry().is_consistent());
    }
}
