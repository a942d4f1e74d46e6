//! norstore-fs - filesystem bridge for norstore block devices
//!
//! [`FlashFs`] owns a [`BlockDevice`], derives a filesystem configuration
//! from its geometry, and runs the mount lifecycle:
//!
//! ```text
//! Uninitialized --init--> Initialized --mount--> Mounted
//!                                         ^         |
//!                                         +-mount- Unmounted <--unmount
//! ```
//!
//! The filesystem itself is littlefs, reached through `littlefs2-sys`; its
//! block-device callbacks go through [`DeviceStorage`]. Mounting a device
//! that holds no valid filesystem formats it once and retries. Open files
//! and directories are referred to by [`FileHandle`]/[`DirHandle`] values.
//! A handle is freed by the matching close call, and every handle is
//! invalidated when the filesystem is mounted again or reformatted.
//!
//! # Example
//!
//! ```ignore
//! use norstore_core::{BlockDevice, W25Device, W25Qxx};
//! use norstore_fs::{FlashFs, OpenFlags};
//!
//! let mut device = W25Device::new(W25Qxx::new(bus));
//! device.initialize()?;
//!
//! let mut fs = FlashFs::new();
//! fs.init(device)?;
//! fs.mount()?;
//! let log = fs.open("boot.log", OpenFlags::WRITE | OpenFlags::CREATE | OpenFlags::APPEND)?;
//! fs.write(log, b"booted\n")?;
//! fs.close(log)?;
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

extern crate alloc;

pub mod error;
pub mod handles;
pub mod storage;
pub mod types;
mod volume;

pub use error::{Error, FsError, Result};
pub use handles::{DirHandle, FileHandle};
pub use storage::{fs_config, DeviceStorage, FsConfig};
pub use types::{FileType, Info, OpenFlags, SeekFrom};

use alloc::ffi::CString;
use core::ffi::{c_int, c_void};
use core::ptr::addr_of_mut;

use error::{check, check_len};
use handles::{HandleTable, OpenDir, OpenFile};
use littlefs2_sys as ll;
use norstore_core::BlockDevice;
use volume::Volume;

/// Mount lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MountState {
    /// No device attached
    Uninitialized,
    /// Device attached, never mounted
    Initialized,
    /// Filesystem mounted
    Mounted,
    /// Device attached, filesystem unmounted again
    Unmounted,
}

/// NUL-terminated copy of a path for littlefs
fn c_path(path: &str) -> Result<CString> {
    CString::new(path).map_err(|_| Error::Fs(FsError::Invalid))
}

/// Clamp a buffer length to what littlefs can report back
fn io_len(len: usize) -> ll::lfs_size_t {
    len.min(i32::MAX as usize) as ll::lfs_size_t
}

struct Traverse<F> {
    visit: F,
    error: Option<Error>,
}

unsafe extern "C" fn traverse_block<F>(data: *mut c_void, block: ll::lfs_block_t) -> c_int
where
    F: FnMut(u32) -> Result<()>,
{
    let traverse = &mut *(data as *mut Traverse<F>);
    match (traverse.visit)(block) {
        Ok(()) => 0,
        Err(e) => {
            traverse.error = Some(e);
            e.code()
        }
    }
}

/// littlefs mounted on a block device
pub struct FlashFs<D: BlockDevice> {
    volume: Option<Volume<D>>,
    config: Option<FsConfig>,
    state: MountState,
    handles: HandleTable,
}

impl<D: BlockDevice> Default for FlashFs<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: BlockDevice> FlashFs<D> {
    /// Bridge with no device attached
    pub fn new() -> Self {
        Self {
            volume: None,
            config: None,
            state: MountState::Uninitialized,
            handles: HandleTable::new(),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> MountState {
        self.state
    }

    /// True once a device is attached
    pub fn is_initialized(&self) -> bool {
        self.volume.is_some()
    }

    /// True while mounted
    pub fn is_mounted(&self) -> bool {
        self.state == MountState::Mounted
    }

    /// Filesystem configuration derived at `init`
    pub fn config(&self) -> Option<&FsConfig> {
        self.config.as_ref()
    }

    /// Borrow the attached device
    pub fn device(&self) -> Option<&D> {
        self.volume.as_ref().map(Volume::device)
    }

    /// Mutably borrow the attached device
    pub fn device_mut(&mut self) -> Option<&mut D> {
        self.volume.as_mut().map(Volume::device_mut)
    }

    /// Number of open file and directory handles
    pub fn open_handles(&self) -> usize {
        self.handles.len()
    }

    /// Unmount and give the device back
    pub fn release(mut self) -> Option<D> {
        if let Err(e) = self.unmount() {
            log::warn!("unmount on release failed: {}", e);
        }
        self.handles.clear();
        self.state = MountState::Uninitialized;
        self.config = None;
        self.volume.take().map(Volume::into_device)
    }

    /// Attach an initialized device
    ///
    /// Fails with [`Error::InvalidGeometry`], leaving the bridge without a
    /// device, when the geometry cannot carry a filesystem. Attaching a
    /// new device while mounted unmounts the old one first.
    pub fn init(&mut self, device: D) -> Result<()> {
        if self.is_mounted() {
            if let Err(e) = self.unmount() {
                log::warn!("unmount before re-init failed: {}", e);
            }
        }
        self.handles.clear();

        let geometry = device.geometry();
        let Some(config) = fs_config(&geometry) else {
            log::warn!(
                "unusable geometry: block size {}, total size {}",
                geometry.block_size,
                geometry.total_size
            );
            self.volume = None;
            self.config = None;
            self.state = MountState::Uninitialized;
            return Err(Error::InvalidGeometry);
        };

        log::debug!(
            "filesystem on {} blocks of {} bytes",
            config.block_count,
            config.block_size
        );
        self.volume = Some(Volume::new(device, &config));
        self.config = Some(config);
        self.state = MountState::Initialized;
        Ok(())
    }

    /// Mount, formatting once if no valid filesystem is found
    ///
    /// Handles left over from an earlier mount are invalidated.
    pub fn mount(&mut self) -> Result<()> {
        if self.is_mounted() {
            return Err(Error::AlreadyMounted);
        }
        let Some(volume) = self.volume.as_ref() else {
            return Err(Error::NotInitialized);
        };
        let (lfs, config) = (volume.lfs(), volume.config());
        self.handles.clear();

        // SAFETY: the volume is pinned and owns the config and buffers
        if let Err(e) = check(unsafe { ll::lfs_mount(lfs, config) }) {
            log::warn!("mount failed ({}), formatting", e);
            check(unsafe { ll::lfs_format(lfs, config) })?;
            check(unsafe { ll::lfs_mount(lfs, config) })?;
        }

        self.state = MountState::Mounted;
        Ok(())
    }

    /// Sync open files and unmount; a no-op when not mounted
    ///
    /// On failure the filesystem stays mounted. After success, open
    /// handles stay allocated but every operation on them fails with
    /// [`Error::NotMounted`] until the next mount invalidates them.
    pub fn unmount(&mut self) -> Result<()> {
        if !self.is_mounted() {
            return Ok(());
        }
        let lfs = self.lfs()?;
        for file in self.handles.files_mut() {
            // SAFETY: open files are linked into the mounted state
            check(unsafe { ll::lfs_file_sync(lfs, file.state()) })?;
        }
        // SAFETY: the volume is mounted
        check(unsafe { ll::lfs_unmount(lfs) })?;
        self.state = MountState::Unmounted;
        Ok(())
    }

    /// Write an empty filesystem, unmounting first if needed
    ///
    /// A failed unmount is logged and the format goes ahead. Does not
    /// mount afterwards, and invalidates every open handle.
    pub fn format(&mut self) -> Result<()> {
        if !self.is_initialized() {
            return Err(Error::NotInitialized);
        }
        if let Err(e) = self.unmount() {
            log::warn!("unmount before format failed ({}), formatting anyway", e);
        }
        if self.state == MountState::Mounted {
            self.state = MountState::Unmounted;
        }
        self.handles.clear();

        let Some(volume) = self.volume.as_ref() else {
            return Err(Error::NotInitialized);
        };
        // SAFETY: as in `mount`
        check(unsafe { ll::lfs_format(volume.lfs(), volume.config()) })
    }

    /// Filesystem state, only while mounted
    fn lfs(&self) -> Result<*mut ll::lfs_t> {
        match (&self.volume, self.state) {
            (Some(volume), MountState::Mounted) => Ok(volume.lfs()),
            _ => Err(Error::NotMounted),
        }
    }

    // ------------------------------------------------------------------
    // Files
    // ------------------------------------------------------------------

    /// Open a file and allocate a handle for it
    pub fn open(&mut self, path: &str, flags: OpenFlags) -> Result<FileHandle> {
        let lfs = self.lfs()?;
        let cache_size = self.config.map_or(0, |c| c.cache_size) as usize;
        let path = c_path(path)?;
        let mut file = OpenFile::new(cache_size);
        // SAFETY: the file is boxed, so littlefs may keep pointing at it
        // until it is closed
        check(unsafe {
            ll::lfs_file_opencfg(lfs, file.state(), path.as_ptr(), flags.bits(), file.config())
        })?;
        Ok(self.handles.insert_file(file))
    }

    /// Sync and close a file, freeing its handle
    ///
    /// The handle is freed even when the final sync fails.
    pub fn close(&mut self, handle: FileHandle) -> Result<()> {
        let lfs = self.lfs()?;
        let mut file = self.handles.remove_file(handle)?;
        // SAFETY: littlefs unlinks the file even when the sync fails
        check(unsafe { ll::lfs_file_close(lfs, file.state()) })
    }

    /// Read from the file position
    pub fn read(&mut self, handle: FileHandle, buf: &mut [u8]) -> Result<usize> {
        let lfs = self.lfs()?;
        let file = self.handles.file_mut(handle)?;
        let n = check_len(unsafe {
            ll::lfs_file_read(lfs, file.state(), buf.as_mut_ptr().cast(), io_len(buf.len()))
        })?;
        Ok(n as usize)
    }

    /// Write at the file position
    pub fn write(&mut self, handle: FileHandle, data: &[u8]) -> Result<usize> {
        let lfs = self.lfs()?;
        let file = self.handles.file_mut(handle)?;
        let n = check_len(unsafe {
            ll::lfs_file_write(lfs, file.state(), data.as_ptr().cast(), io_len(data.len()))
        })?;
        Ok(n as usize)
    }

    /// Move the file position
    pub fn seek(&mut self, handle: FileHandle, pos: SeekFrom) -> Result<u32> {
        let lfs = self.lfs()?;
        let file = self.handles.file_mut(handle)?;
        let (off, whence) = pos.into_raw();
        check_len(unsafe { ll::lfs_file_seek(lfs, file.state(), off, whence) })
    }

    /// Current file position
    pub fn tell(&mut self, handle: FileHandle) -> Result<u32> {
        let lfs = self.lfs()?;
        let file = self.handles.file_mut(handle)?;
        check_len(unsafe { ll::lfs_file_tell(lfs, file.state()) })
    }

    /// Seek to the start of the file
    pub fn rewind(&mut self, handle: FileHandle) -> Result<()> {
        let lfs = self.lfs()?;
        let file = self.handles.file_mut(handle)?;
        check(unsafe { ll::lfs_file_rewind(lfs, file.state()) })
    }

    /// File size including unsynced writes
    pub fn size(&mut self, handle: FileHandle) -> Result<u32> {
        let lfs = self.lfs()?;
        let file = self.handles.file_mut(handle)?;
        check_len(unsafe { ll::lfs_file_size(lfs, file.state()) })
    }

    /// Commit buffered writes without closing
    pub fn sync(&mut self, handle: FileHandle) -> Result<()> {
        let lfs = self.lfs()?;
        let file = self.handles.file_mut(handle)?;
        check(unsafe { ll::lfs_file_sync(lfs, file.state()) })
    }

    /// Shrink or zero-extend a file
    pub fn truncate(&mut self, handle: FileHandle, size: u32) -> Result<()> {
        let lfs = self.lfs()?;
        let file = self.handles.file_mut(handle)?;
        check(unsafe { ll::lfs_file_truncate(lfs, file.state(), size) })
    }

    // ------------------------------------------------------------------
    // Namespace
    // ------------------------------------------------------------------

    /// Information about a path
    pub fn stat(&mut self, path: &str) -> Result<Info> {
        let lfs = self.lfs()?;
        let path = c_path(path)?;
        let mut info = ll::lfs_info::default();
        check(unsafe { ll::lfs_stat(lfs, path.as_ptr(), &mut info) })?;
        Ok(Info::from_raw(&info))
    }

    /// Remove a file or empty directory
    pub fn remove(&mut self, path: &str) -> Result<()> {
        let lfs = self.lfs()?;
        let path = c_path(path)?;
        check(unsafe { ll::lfs_remove(lfs, path.as_ptr()) })
    }

    /// Rename or move an entry
    pub fn rename(&mut self, old_path: &str, new_path: &str) -> Result<()> {
        let lfs = self.lfs()?;
        let (old_path, new_path) = (c_path(old_path)?, c_path(new_path)?);
        check(unsafe { ll::lfs_rename(lfs, old_path.as_ptr(), new_path.as_ptr()) })
    }

    /// Create a directory
    pub fn mkdir(&mut self, path: &str) -> Result<()> {
        let lfs = self.lfs()?;
        let path = c_path(path)?;
        check(unsafe { ll::lfs_mkdir(lfs, path.as_ptr()) })
    }

    // ------------------------------------------------------------------
    // Directories
    // ------------------------------------------------------------------

    /// Open a directory and allocate a handle for it
    pub fn dir_open(&mut self, path: &str) -> Result<DirHandle> {
        let lfs = self.lfs()?;
        let path = c_path(path)?;
        let mut dir = OpenDir::new();
        // SAFETY: boxed like open files
        check(unsafe { ll::lfs_dir_open(lfs, dir.state(), path.as_ptr()) })?;
        Ok(self.handles.insert_dir(dir))
    }

    /// Close a directory, freeing its handle
    pub fn dir_close(&mut self, handle: DirHandle) -> Result<()> {
        let lfs = self.lfs()?;
        let mut dir = self.handles.remove_dir(handle)?;
        check(unsafe { ll::lfs_dir_close(lfs, dir.state()) })
    }

    /// Next directory entry, `None` at the end
    ///
    /// `.` and `..` come first.
    pub fn dir_read(&mut self, handle: DirHandle) -> Result<Option<Info>> {
        let lfs = self.lfs()?;
        let dir = self.handles.dir_mut(handle)?;
        let mut info = ll::lfs_info::default();
        let found = check_len(unsafe { ll::lfs_dir_read(lfs, dir.state(), &mut info) })?;
        Ok((found > 0).then(|| Info::from_raw(&info)))
    }

    /// Jump to a position from [`dir_tell`](Self::dir_tell)
    pub fn dir_seek(&mut self, handle: DirHandle, pos: u32) -> Result<()> {
        let lfs = self.lfs()?;
        let dir = self.handles.dir_mut(handle)?;
        check(unsafe { ll::lfs_dir_seek(lfs, dir.state(), pos) })
    }

    /// Current directory position
    pub fn dir_tell(&mut self, handle: DirHandle) -> Result<u32> {
        let lfs = self.lfs()?;
        let dir = self.handles.dir_mut(handle)?;
        check_len(unsafe { ll::lfs_dir_tell(lfs, dir.state()) })
    }

    /// Back to the first directory entry
    pub fn dir_rewind(&mut self, handle: DirHandle) -> Result<()> {
        let lfs = self.lfs()?;
        let dir = self.handles.dir_mut(handle)?;
        check(unsafe { ll::lfs_dir_rewind(lfs, dir.state()) })
    }

    // ------------------------------------------------------------------
    // Filesystem
    // ------------------------------------------------------------------

    /// Blocks in use
    pub fn fs_size(&mut self) -> Result<u32> {
        let lfs = self.lfs()?;
        check_len(unsafe { ll::lfs_fs_size(lfs) })
    }

    /// Call `f` with every block in use
    ///
    /// The first error from `f` stops the walk and is returned.
    pub fn fs_traverse<F>(&mut self, f: F) -> Result<()>
    where
        F: FnMut(u32) -> Result<()>,
    {
        let lfs = self.lfs()?;
        let mut traverse = Traverse {
            visit: f,
            error: None,
        };
        // SAFETY: `traverse` outlives the call and matches the callback's
        // type parameter
        let code = unsafe {
            ll::lfs_fs_traverse(
                lfs,
                Some(traverse_block::<F>),
                addr_of_mut!(traverse).cast(),
            )
        };
        match traverse.error {
            Some(e) => Err(e),
            None => check(code),
        }
    }
}

impl<D: BlockDevice> Drop for FlashFs<D> {
    fn drop(&mut self) {
        if let Err(e) = self.unmount() {
            log::warn!("unmount on drop failed: {}", e);
        }
    }
}
