//! Generation-checked handle arena
//!
//! Every open file or directory sits in a slot. A handle names the slot and
//! the slot's generation at the time of opening; closing bumps the
//! generation, so a closed handle never resolves again even after its slot
//! has been reused. [`HandleTable::clear`] frees every slot at once when
//! the filesystem underneath is remounted or reformatted.
//!
//! Slots own the littlefs file and directory state boxed, so littlefs can
//! keep pointing at it while the table grows.

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;
use core::ptr::{addr_of, addr_of_mut};

use littlefs2_sys as ll;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Key {
    index: u32,
    generation: u32,
}

impl Key {
    const fn raw(self) -> u64 {
        ((self.generation as u64) << 32) | self.index as u64
    }

    const fn from_raw(raw: u64) -> Self {
        Self {
            index: raw as u32,
            generation: (raw >> 32) as u32,
        }
    }
}

/// Handle to an open file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileHandle(Key);

/// Handle to an open directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DirHandle(Key);

macro_rules! raw_handle {
    ($ty:ident) => {
        impl $ty {
            /// Opaque integer form of this handle
            pub const fn raw(self) -> u64 {
                self.0.raw()
            }

            /// Rebuild a handle from [`raw`](Self::raw)
            ///
            /// Any value is accepted; invalid ones fail on use.
            pub const fn from_raw(raw: u64) -> Self {
                Self(Key::from_raw(raw))
            }
        }
    };
}

raw_handle!(FileHandle);
raw_handle!(DirHandle);

/// littlefs state of an open file
pub(crate) struct OpenFile {
    state: ll::lfs_file_t,
    config: ll::lfs_file_config,
    cache: Vec<u8>,
}

impl OpenFile {
    pub(crate) fn new(cache_size: usize) -> Box<Self> {
        let mut file = Box::new(Self {
            state: ll::lfs_file_t::default(),
            config: ll::lfs_file_config::default(),
            cache: vec![0; cache_size],
        });
        file.config.buffer = file.cache.as_mut_ptr().cast();
        file
    }

    pub(crate) fn state(&mut self) -> *mut ll::lfs_file_t {
        addr_of_mut!(self.state)
    }

    pub(crate) fn config(&self) -> *const ll::lfs_file_config {
        addr_of!(self.config)
    }
}

/// littlefs state of an open directory
pub(crate) struct OpenDir {
    state: ll::lfs_dir_t,
}

impl OpenDir {
    pub(crate) fn new() -> Box<Self> {
        Box::new(Self {
            state: ll::lfs_dir_t::default(),
        })
    }

    pub(crate) fn state(&mut self) -> *mut ll::lfs_dir_t {
        addr_of_mut!(self.state)
    }
}

enum Open {
    File(Box<OpenFile>),
    Dir(Box<OpenDir>),
}

#[derive(Default)]
struct Slot {
    generation: u32,
    open: Option<Open>,
}

/// Arena of open files and directories
#[derive(Default)]
pub struct HandleTable {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl HandleTable {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live handles
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// True when no handle is live
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&mut self, open: Open) -> Key {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot::default());
                (self.slots.len() - 1) as u32
            }
        };
        let slot = &mut self.slots[index as usize];
        slot.open = Some(open);
        Key {
            index,
            generation: slot.generation,
        }
    }

    fn slot(&mut self, key: Key) -> Result<&mut Slot> {
        self.slots
            .get_mut(key.index as usize)
            .filter(|slot| slot.generation == key.generation && slot.open.is_some())
            .ok_or(Error::BadHandle)
    }

    /// Free every handle
    ///
    /// Handles issued before stay rejected after their slots are reused.
    pub(crate) fn clear(&mut self) {
        self.free.clear();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.open.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
            }
            self.free.push(index as u32);
        }
    }

    /// Every open file
    pub(crate) fn files_mut(&mut self) -> impl Iterator<Item = &mut OpenFile> {
        self.slots.iter_mut().filter_map(|slot| match &mut slot.open {
            Some(Open::File(file)) => Some(&mut **file),
            _ => None,
        })
    }

    fn release(&mut self, key: Key) -> Result<Open> {
        let slot = self.slot(key)?;
        let open = slot.open.take().ok_or(Error::BadHandle)?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(key.index);
        Ok(open)
    }

    pub(crate) fn insert_file(&mut self, file: Box<OpenFile>) -> FileHandle {
        FileHandle(self.insert(Open::File(file)))
    }

    pub(crate) fn insert_dir(&mut self, dir: Box<OpenDir>) -> DirHandle {
        DirHandle(self.insert(Open::Dir(dir)))
    }

    pub(crate) fn file_mut(&mut self, handle: FileHandle) -> Result<&mut OpenFile> {
        match &mut self.slot(handle.0)?.open {
            Some(Open::File(file)) => Ok(file),
            _ => Err(Error::BadHandle),
        }
    }

    pub(crate) fn dir_mut(&mut self, handle: DirHandle) -> Result<&mut OpenDir> {
        match &mut self.slot(handle.0)?.open {
            Some(Open::Dir(dir)) => Ok(dir),
            _ => Err(Error::BadHandle),
        }
    }

    /// Free a file handle, returning the file
    pub(crate) fn remove_file(&mut self, handle: FileHandle) -> Result<Box<OpenFile>> {
        self.file_mut(handle)?;
        match self.release(handle.0)? {
            Open::File(file) => Ok(file),
            Open::Dir(_) => Err(Error::BadHandle),
        }
    }

    /// Free a directory handle, returning the cursor
    pub(crate) fn remove_dir(&mut self, handle: DirHandle) -> Result<Box<OpenDir>> {
        self.dir_mut(handle)?;
        match self.release(handle.0)? {
            Open::Dir(dir) => Ok(dir),
            Open::File(_) => Err(Error::BadHandle),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reuse_bumps_generation() {
        let mut table = HandleTable::new();
        let first = table.insert_file(OpenFile::new(16));
        table.remove_file(first).unwrap();
        let second = table.insert_file(OpenFile::new(16));
        assert_eq!(first.0.index, second.0.index);
        assert_ne!(first, second);
        assert!(table.file_mut(first).is_err());
        assert!(table.file_mut(second).is_ok());
    }

    #[test]
    fn test_clear_invalidates_every_handle() {
        let mut table = HandleTable::new();
        let file = table.insert_file(OpenFile::new(16));
        let dir = table.insert_dir(OpenDir::new());
        let closed = table.insert_file(OpenFile::new(16));
        table.remove_file(closed).unwrap();
        assert_eq!(table.len(), 2);

        table.clear();
        assert!(table.is_empty());
        assert_eq!(table.files_mut().count(), 0);

        let reused = table.insert_file(OpenFile::new(16));
        let reused_dir = table.insert_dir(OpenDir::new());
        let third = table.insert_file(OpenFile::new(16));
        assert_eq!(table.len(), 3);
        assert_eq!(table.file_mut(file).err(), Some(Error::BadHandle));
        assert_eq!(table.dir_mut(dir).err(), Some(Error::BadHandle));
        assert_eq!(table.file_mut(closed).err(), Some(Error::BadHandle));
        assert!(table.file_mut(reused).is_ok());
        assert!(table.dir_mut(reused_dir).is_ok());
        assert!(table.file_mut(third).is_ok());
    }

    #[test]
    fn test_file_cache_is_wired_into_config() {
        let mut file = OpenFile::new(256);
        let buffer: *mut core::ffi::c_void = file.cache.as_mut_ptr().cast();
        assert_eq!(file.config.buffer, buffer);
    }
}
