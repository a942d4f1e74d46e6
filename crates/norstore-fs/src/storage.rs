//! littlefs block-device callbacks on top of a [`BlockDevice`]
//!
//! Block `b`, offset `o` lives at device address `b * block_size + o`.
//! Erasing a filesystem block erases exactly one device block. Any device
//! failure surfaces to littlefs as `LFS_ERR_IO`.

use core::ffi::{c_int, c_void};
use core::slice;

use littlefs2_sys as ll;
use norstore_core::{BlockDevice, DeviceGeometry};

use crate::error::FsError;

/// Read granularity handed to the filesystem
pub const READ_SIZE: u32 = 1;
/// Erase cycles before the filesystem should relocate a block
pub const BLOCK_CYCLES: i32 = 500;
/// Minimum cache size
pub const CACHE_SIZE: u32 = 256;
/// Lookahead bitmap size in bytes
pub const LOOKAHEAD_SIZE: u32 = 16;

/// Geometry and tuning handed to littlefs at mount time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsConfig {
    /// Minimum read size
    pub read_size: u32,
    /// Minimum program size
    pub prog_size: u32,
    /// Erase unit
    pub block_size: u32,
    /// Number of erase units
    pub block_count: u32,
    /// Erase cycles before metadata is moved
    pub block_cycles: i32,
    /// Read, program and per-file cache size
    pub cache_size: u32,
    /// Lookahead bitmap size in bytes
    pub lookahead_size: u32,
}

/// Filesystem configuration for a device geometry
///
/// Returns `None` on a zero block size, zero total size or a device
/// smaller than one block.
pub fn fs_config(geometry: &DeviceGeometry) -> Option<FsConfig> {
    if geometry.block_size == 0 || geometry.total_size == 0 {
        return None;
    }
    let block_count = geometry.total_size / geometry.block_size;
    if block_count == 0 {
        return None;
    }
    Some(FsConfig {
        read_size: READ_SIZE,
        prog_size: geometry.page_size,
        block_size: geometry.block_size,
        block_count,
        block_cycles: BLOCK_CYCLES,
        cache_size: CACHE_SIZE.max(geometry.page_size),
        lookahead_size: LOOKAHEAD_SIZE,
    })
}

/// Block-addressed view of a borrowed block device
pub struct DeviceStorage<'a, D: BlockDevice + ?Sized> {
    device: &'a mut D,
    block_size: u32,
}

fn io(e: norstore_core::Error) -> FsError {
    log::debug!("flash: {}", e);
    FsError::Io
}

impl<'a, D: BlockDevice + ?Sized> DeviceStorage<'a, D> {
    /// Borrow `device`, addressing it in blocks of `block_size` bytes
    pub fn new(device: &'a mut D, block_size: u32) -> Self {
        Self { device, block_size }
    }

    fn address(&self, block: u32, offset: u32) -> Result<u32, FsError> {
        block
            .checked_mul(self.block_size)
            .and_then(|base| base.checked_add(offset))
            .ok_or(FsError::Io)
    }

    /// Read `buf.len()` bytes at `offset` within `block`
    pub fn read(&mut self, block: u32, offset: u32, buf: &mut [u8]) -> Result<(), FsError> {
        let address = self.address(block, offset)?;
        self.device.read(address, buf).map_err(io)
    }

    /// Program `data` at `offset` within `block`
    pub fn prog(&mut self, block: u32, offset: u32, data: &[u8]) -> Result<(), FsError> {
        let address = self.address(block, offset)?;
        self.device.write(address, data).map_err(io)
    }

    /// Erase one block
    pub fn erase(&mut self, block: u32) -> Result<(), FsError> {
        self.device.erase_block(block).map_err(io)
    }

    /// Flush device buffers; the contract has none
    pub fn sync(&mut self) -> Result<(), FsError> {
        Ok(())
    }
}

fn status(result: Result<(), FsError>) -> c_int {
    match result {
        Ok(()) => ll::lfs_error_LFS_ERR_OK,
        Err(e) => e.code(),
    }
}

/// `context` must point at the `D` this config was built for.
unsafe fn storage<'a, D: BlockDevice>(c: *const ll::lfs_config) -> DeviceStorage<'a, D> {
    let device = &mut *((*c).context as *mut D);
    DeviceStorage::new(device, (*c).block_size)
}

pub(crate) unsafe extern "C" fn lfs_read<D: BlockDevice>(
    c: *const ll::lfs_config,
    block: ll::lfs_block_t,
    off: ll::lfs_off_t,
    buffer: *mut c_void,
    size: ll::lfs_size_t,
) -> c_int {
    let buf = slice::from_raw_parts_mut(buffer as *mut u8, size as usize);
    status(storage::<D>(c).read(block, off, buf))
}

pub(crate) unsafe extern "C" fn lfs_prog<D: BlockDevice>(
    c: *const ll::lfs_config,
    block: ll::lfs_block_t,
    off: ll::lfs_off_t,
    buffer: *const c_void,
    size: ll::lfs_size_t,
) -> c_int {
    let data = slice::from_raw_parts(buffer as *const u8, size as usize);
    status(storage::<D>(c).prog(block, off, data))
}

pub(crate) unsafe extern "C" fn lfs_erase<D: BlockDevice>(
    c: *const ll::lfs_config,
    block: ll::lfs_block_t,
) -> c_int {
    status(storage::<D>(c).erase(block))
}

pub(crate) unsafe extern "C" fn lfs_sync<D: BlockDevice>(c: *const ll::lfs_config) -> c_int {
    status(storage::<D>(c).sync())
}

#[cfg(test)]
mod tests {
    use super::*;
    use norstore_core::{W25Device, W25Qxx};
    use norstore_dummy::{DummyConfig, DummyFlash};

    fn device() -> W25Device<DummyFlash> {
        let mut dev = W25Device::new(W25Qxx::new(DummyFlash::new(DummyConfig::winbond(0x4014))));
        dev.initialize().unwrap();
        dev
    }

    fn geometry(blocks: u32) -> DeviceGeometry {
        DeviceGeometry::uniform(blocks * 65536, 256, 4096, 65536, 100_000, true)
    }

    #[test]
    fn test_config_for_w25q128() {
        let config = fs_config(&geometry(256)).unwrap();
        assert_eq!(config.read_size, 1);
        assert_eq!(config.prog_size, 256);
        assert_eq!(config.block_size, 65536);
        assert_eq!(config.block_count, 256);
        assert_eq!(config.block_cycles, 500);
        assert_eq!(config.cache_size, 256);
        assert_eq!(config.lookahead_size, 16);
    }

    #[test]
    fn test_cache_grows_with_page() {
        let geometry = DeviceGeometry::uniform(4 * 1024 * 1024, 512, 4096, 65536, 100_000, true);
        assert_eq!(fs_config(&geometry).unwrap().cache_size, 512);
    }

    #[test]
    fn test_only_zero_geometry_is_unusable() {
        assert!(fs_config(&DeviceGeometry::default()).is_none());
        let tiny = DeviceGeometry {
            block_size: 65536,
            total_size: 4096,
            ..DeviceGeometry::default()
        };
        assert!(fs_config(&tiny).is_none());

        // Small devices are left for littlefs to accept or refuse
        assert_eq!(fs_config(&geometry(1)).unwrap().block_count, 1);
        assert_eq!(fs_config(&geometry(2)).unwrap().block_count, 2);
        assert_eq!(fs_config(&geometry(3)).unwrap().block_count, 3);
    }

    #[test]
    fn test_block_offset_translation() {
        let mut dev = device();
        {
            let mut storage = DeviceStorage::new(&mut dev, 65536);
            storage.erase(2).unwrap();
            storage.prog(2, 16, &[0xAA, 0xBB]).unwrap();
            let mut buf = [0u8; 2];
            storage.read(2, 16, &mut buf).unwrap();
            assert_eq!(buf, [0xAA, 0xBB]);
            storage.sync().unwrap();
        }
        let data = dev.driver().transport().data();
        assert_eq!(&data[2 * 65536 + 16..2 * 65536 + 18], &[0xAA, 0xBB]);
    }

    #[test]
    fn test_device_errors_become_io() {
        let mut dev = device();
        let mut storage = DeviceStorage::new(&mut dev, 65536);
        let mut buf = [0u8; 4];
        assert_eq!(storage.read(16, 0, &mut buf), Err(FsError::Io));
        assert_eq!(storage.erase(16), Err(FsError::Io));
        assert_eq!(storage.read(u32::MAX, 0, &mut buf), Err(FsError::Io));
    }

    #[test]
    fn test_callbacks_report_littlefs_codes() {
        let mut dev = device();
        let config = ll::lfs_config {
            context: &mut dev as *mut W25Device<DummyFlash> as *mut c_void,
            block_size: 65536,
            ..Default::default()
        };
        let mut buf = [0u8; 4];
        unsafe {
            assert_eq!(lfs_erase::<W25Device<DummyFlash>>(&config, 1), 0);
            let data = [1u8, 2, 3, 4];
            assert_eq!(
                lfs_prog::<W25Device<DummyFlash>>(&config, 1, 8, data.as_ptr().cast(), 4),
                0
            );
            assert_eq!(
                lfs_read::<W25Device<DummyFlash>>(&config, 1, 8, buf.as_mut_ptr().cast(), 4),
                0
            );
            assert_eq!(buf, data);
            assert_eq!(lfs_erase::<W25Device<DummyFlash>>(&config, 99), -5);
            assert_eq!(lfs_sync::<W25Device<DummyFlash>>(&config), 0);
        }
    }
}
