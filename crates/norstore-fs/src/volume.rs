//! Heap-pinned littlefs state
//!
//! littlefs keeps pointers into its configuration, the configuration points
//! at the device and at the cache buffers, and open files are linked into
//! the filesystem state. None of these may move while littlefs can reach
//! them, so everything lives in one leaked box that is only reached through
//! raw pointers.

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;
use core::mem;
use core::ptr::{addr_of, addr_of_mut, NonNull};

use littlefs2_sys as ll;
use norstore_core::BlockDevice;

use crate::storage::{self, FsConfig};

struct Inner<D> {
    lfs: ll::lfs_t,
    config: ll::lfs_config,
    device: D,
    read_cache: Vec<u8>,
    prog_cache: Vec<u8>,
    lookahead: Vec<u64>,
}

/// A device together with the littlefs state and buffers that use it
pub(crate) struct Volume<D> {
    inner: NonNull<Inner<D>>,
}

impl<D: BlockDevice> Volume<D> {
    pub(crate) fn new(device: D, fs: &FsConfig) -> Self {
        let cache = fs.cache_size as usize;
        let inner = Box::new(Inner {
            lfs: ll::lfs_t::default(),
            config: ll::lfs_config::default(),
            device,
            read_cache: vec![0; cache],
            prog_cache: vec![0; cache],
            lookahead: vec![0; (fs.lookahead_size as usize).div_ceil(8)],
        });
        let inner = NonNull::from(Box::leak(inner));
        let raw = inner.as_ptr();

        // SAFETY: `raw` comes from a live box that nothing else references yet
        unsafe {
            (*raw).config = ll::lfs_config {
                context: addr_of_mut!((*raw).device).cast(),
                read: Some(storage::lfs_read::<D>),
                prog: Some(storage::lfs_prog::<D>),
                erase: Some(storage::lfs_erase::<D>),
                sync: Some(storage::lfs_sync::<D>),
                read_size: fs.read_size,
                prog_size: fs.prog_size,
                block_size: fs.block_size,
                block_count: fs.block_count,
                block_cycles: fs.block_cycles,
                cache_size: fs.cache_size,
                lookahead_size: fs.lookahead_size,
                read_buffer: (*raw).read_cache.as_mut_ptr().cast(),
                prog_buffer: (*raw).prog_cache.as_mut_ptr().cast(),
                lookahead_buffer: (*raw).lookahead.as_mut_ptr().cast(),
                ..Default::default()
            };
        }
        Self { inner }
    }
}

impl<D> Volume<D> {
    /// Filesystem state for littlefs calls
    pub(crate) fn lfs(&self) -> *mut ll::lfs_t {
        // SAFETY: `inner` stays allocated until drop
        unsafe { addr_of_mut!((*self.inner.as_ptr()).lfs) }
    }

    /// Configuration for `lfs_mount` and `lfs_format`
    pub(crate) fn config(&self) -> *const ll::lfs_config {
        // SAFETY: as in `lfs`
        unsafe { addr_of!((*self.inner.as_ptr()).config) }
    }

    pub(crate) fn device(&self) -> &D {
        // SAFETY: littlefs only touches the device inside calls made through
        // `&mut FlashFs`, which cannot overlap this borrow
        unsafe { &(*self.inner.as_ptr()).device }
    }

    pub(crate) fn device_mut(&mut self) -> &mut D {
        // SAFETY: as in `device`
        unsafe { &mut (*self.inner.as_ptr()).device }
    }

    /// Free the littlefs state and give the device back
    pub(crate) fn into_device(self) -> D {
        // SAFETY: `inner` came from `Box::leak` and `self` is forgotten
        // below, so it is not freed twice
        let inner = unsafe { Box::from_raw(self.inner.as_ptr()) };
        mem::forget(self);
        inner.device
    }
}

impl<D> Drop for Volume<D> {
    fn drop(&mut self) {
        // SAFETY: see `into_device`
        drop(unsafe { Box::from_raw(self.inner.as_ptr()) });
    }
}
