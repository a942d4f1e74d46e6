//! Hardware-agnostic block-device contract
//!
//! A [`BlockDevice`] is byte-addressable for reads, page-programmable and
//! erasable in sectors, blocks or as a whole. Every operation reports the
//! generic [`Error`](crate::Error) taxonomy, so code above this trait never
//! sees vendor-specific codes.
//!
//! The trait is a capability view: it owns no state of its own. Borrowing
//! (`&mut D`) or boxing (`Box<D>`) a device yields another device, so the
//! same implementation can be handed to a filesystem by value or by
//! reference.

use crate::chip::{DeviceGeometry, DeviceInfo};
use crate::error::Result;

/// Byte-addressable, page-programmable, sector/block-erasable storage
pub trait BlockDevice {
    /// Identify the device and make it ready for use
    fn initialize(&mut self) -> Result<()>;

    /// Physical layout (all zero before [`initialize`](Self::initialize))
    fn geometry(&self) -> DeviceGeometry;

    /// Public device information derived from the geometry
    fn info(&self) -> DeviceInfo {
        self.geometry().info()
    }

    /// Read `buf.len()` bytes starting at `address`
    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<()>;

    /// Program `data` at `address`
    ///
    /// The target range must be erased and must not cross a sector
    /// boundary.
    fn write(&mut self, address: u32, data: &[u8]) -> Result<()>;

    /// Erase one sector by index
    fn erase_sector(&mut self, sector: u32) -> Result<()>;

    /// Erase one block by index
    fn erase_block(&mut self, block: u32) -> Result<()>;

    /// Erase the whole device
    fn erase_chip(&mut self) -> Result<()>;

    /// Suspend an in-progress erase
    fn suspend_erase(&mut self) -> Result<()>;

    /// Resume a suspended erase
    fn resume_erase(&mut self) -> Result<()>;

    /// Whether an internal program or erase is still running
    fn is_busy(&mut self) -> bool;

    /// Allow the next program/erase
    fn enable_write(&mut self) -> Result<()>;

    /// Disallow program/erase
    fn disable_write(&mut self) -> Result<()>;
}

impl<D: BlockDevice + ?Sized> BlockDevice for &mut D {
    fn initialize(&mut self) -> Result<()> {
        (**self).initialize()
    }

    fn geometry(&self) -> DeviceGeometry {
        (**self).geometry()
    }

    fn info(&self) -> DeviceInfo {
        (**self).info()
    }

    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<()> {
        (**self).read(address, buf)
    }

    fn write(&mut self, address: u32, data: &[u8]) -> Result<()> {
        (**self).write(address, data)
    }

    fn erase_sector(&mut self, sector: u32) -> Result<()> {
        (**self).erase_sector(sector)
    }

    fn erase_block(&mut self, block: u32) -> Result<()> {
        (**self).erase_block(block)
    }

    fn erase_chip(&mut self) -> Result<()> {
        (**self).erase_chip()
    }

    fn suspend_erase(&mut self) -> Result<()> {
        (**self).suspend_erase()
    }

    fn resume_erase(&mut self) -> Result<()> {
        (**self).resume_erase()
    }

    fn is_busy(&mut self) -> bool {
        (**self).is_busy()
    }

    fn enable_write(&mut self) -> Result<()> {
        (**self).enable_write()
    }

    fn disable_write(&mut self) -> Result<()> {
        (**self).disable_write()
    }
}

#[cfg(feature = "alloc")]
impl<D: BlockDevice + ?Sized> BlockDevice for alloc::boxed::Box<D> {
    fn initialize(&mut self) -> Result<()> {
        (**self).initialize()
    }

    fn geometry(&self) -> DeviceGeometry {
        (**self).geometry()
    }

    fn info(&self) -> DeviceInfo {
        (**self).info()
    }

    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<()> {
        (**self).read(address, buf)
    }

    fn write(&mut self, address: u32, data: &[u8]) -> Result<()> {
        (**self).write(address, data)
    }

    fn erase_sector(&mut self, sector: u32) -> Result<()> {
        (**self).erase_sector(sector)
    }

    fn erase_block(&mut self, block: u32) -> Result<()> {
        (**self).erase_block(block)
    }

    fn erase_chip(&mut self) -> Result<()> {
        (**self).erase_chip()
    }

    fn suspend_erase(&mut self) -> Result<()> {
        (**self).suspend_erase()
    }

    fn resume_erase(&mut self) -> Result<()> {
        (**self).resume_erase()
    }

    fn is_busy(&mut self) -> bool {
        (**self).is_busy()
    }

    fn enable_write(&mut self) -> Result<()> {
        (**self).enable_write()
    }

    fn disable_write(&mut self) -> Result<()> {
        (**self).disable_write()
    }
}
