//! Device identity and geometry types

/// Identity read with the JEDEC ID command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceIdentity {
    /// JEDEC manufacturer ID (first byte of RDID response)
    pub manufacturer_id: u8,
    /// JEDEC device ID (second and third bytes of RDID response)
    pub device_id: u16,
}

impl DeviceIdentity {
    /// Create an identity from the raw RDID fields
    pub const fn new(manufacturer_id: u8, device_id: u16) -> Self {
        Self {
            manufacturer_id,
            device_id,
        }
    }

    /// Build an identity from the three RDID response bytes
    pub const fn from_rdid(buf: [u8; 3]) -> Self {
        Self {
            manufacturer_id: buf[0],
            device_id: ((buf[1] as u16) << 8) | buf[2] as u16,
        }
    }

    /// Memory type byte (high byte of the device ID)
    pub const fn memory_type(&self) -> u8 {
        (self.device_id >> 8) as u8
    }

    /// Density code (low byte of the device ID)
    ///
    /// For JEDEC-conformant parts the capacity is `1 << code` bytes.
    pub const fn density_code(&self) -> u8 {
        self.device_id as u8
    }

    /// Get the JEDEC ID as a 24-bit value (manufacturer << 16 | device)
    pub const fn jedec_id(&self) -> u32 {
        ((self.manufacturer_id as u32) << 16) | (self.device_id as u32)
    }

    /// True when the bus returned a floating or shorted line instead of an ID
    pub const fn is_plausible(&self) -> bool {
        self.manufacturer_id != 0x00 && self.manufacturer_id != 0xFF
    }
}

/// Physical layout of a flash device
///
/// All sizes are in bytes. A default (all-zero) geometry stands for "not yet
/// discovered". A discovered geometry always satisfies
/// `total_size == page_size * page_count == sector_size * sector_count
/// == block_size * block_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceGeometry {
    /// Program granularity
    pub page_size: u32,
    /// Number of pages
    pub page_count: u32,
    /// Smallest erase unit
    pub sector_size: u32,
    /// Number of sectors
    pub sector_count: u32,
    /// Large erase unit
    pub block_size: u32,
    /// Number of blocks
    pub block_count: u32,
    /// Total capacity
    pub total_size: u32,
    /// Rated program/erase cycles per sector
    pub erase_cycles_max: u32,
    /// Whether erase suspend/resume is supported
    pub supports_suspend: bool,
}

impl DeviceGeometry {
    /// Derive a uniform geometry from a capacity and unit sizes
    pub const fn uniform(
        total_size: u32,
        page_size: u32,
        sector_size: u32,
        block_size: u32,
        erase_cycles_max: u32,
        supports_suspend: bool,
    ) -> Self {
        Self {
            page_size,
            page_count: total_size / page_size,
            sector_size,
            sector_count: total_size / sector_size,
            block_size,
            block_count: total_size / block_size,
            total_size,
            erase_cycles_max,
            supports_suspend,
        }
    }

    /// True once the geometry has been discovered
    pub const fn is_known(&self) -> bool {
        self.total_size != 0
    }

    /// Check that every unit tiles the device exactly
    pub const fn is_consistent(&self) -> bool {
        self.page_size as u64 * self.page_count as u64 == self.total_size as u64
            && self.sector_size as u64 * self.sector_count as u64 == self.total_size as u64
            && self.block_size as u64 * self.block_count as u64 == self.total_size as u64
    }

    /// Check if an address range is valid for this device
    pub fn is_valid_range(&self, addr: u32, len: usize) -> bool {
        // u64 so that addr + len cannot wrap
        let end = addr as u64 + len as u64;
        end <= self.total_size as u64
    }

    /// Sector index containing `addr`
    pub const fn sector_of(&self, addr: u32) -> u32 {
        addr / self.sector_size
    }

    /// Public device-info view of this geometry
    pub const fn info(&self) -> DeviceInfo {
        DeviceInfo {
            page_size: self.page_size,
            sector_size: self.sector_size,
            block_size: self.block_size,
            total_size: self.total_size,
            erase_cycles_max: self.erase_cycles_max,
            supports_suspend: self.supports_suspend,
        }
    }
}

/// Read-only device information exposed to any caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceInfo {
    /// Program granularity
    pub page_size: u32,
    /// Smallest erase unit
    pub sector_size: u32,
    /// Large erase unit
    pub block_size: u32,
    /// Total capacity
    pub total_size: u32,
    /// Rated program/erase cycles
    pub erase_cycles_max: u32,
    /// Whether erase suspend/resume is supported
    pub supports_suspend: bool,
}

impl From<DeviceGeometry> for DeviceInfo {
    fn from(geometry: DeviceGeometry) -> Self {
        geometry.info()
    }
}

/// JEDEC manufacturer IDs
pub mod manufacturer {
    /// GigaDevice
    pub const GIGADEVICE: u8 = 0xC8;
    /// Macronix
    pub const MACRONIX: u8 = 0xC2;
    /// Winbond
    pub const WINBOND: u8 = 0xEF;
}
