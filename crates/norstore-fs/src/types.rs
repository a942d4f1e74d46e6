//! Open flags, seek positions and entry metadata

use alloc::string::String;
use alloc::vec::Vec;

use littlefs2_sys as ll;

bitflags::bitflags! {
    /// Flags for [`FlashFs::open`](crate::FlashFs::open)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OpenFlags: i32 {
        /// Open for reading
        const READ = ll::lfs_open_flags_LFS_O_RDONLY as i32;
        /// Open for writing
        const WRITE = ll::lfs_open_flags_LFS_O_WRONLY as i32;
        /// Create the file if it does not exist
        const CREATE = ll::lfs_open_flags_LFS_O_CREAT as i32;
        /// With CREATE, fail if the file exists
        const EXCLUSIVE = ll::lfs_open_flags_LFS_O_EXCL as i32;
        /// Discard existing contents
        const TRUNCATE = ll::lfs_open_flags_LFS_O_TRUNC as i32;
        /// Every write goes to the end of the file
        const APPEND = ll::lfs_open_flags_LFS_O_APPEND as i32;

        /// Read and write
        const READ_WRITE = ll::lfs_open_flags_LFS_O_RDWR as i32;
    }
}

/// Position argument of [`FlashFs::seek`](crate::FlashFs::seek)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekFrom {
    /// Absolute offset
    Start(u32),
    /// Relative to the current position
    Current(i32),
    /// Relative to the end of the file
    End(i32),
}

impl SeekFrom {
    pub(crate) fn into_raw(self) -> (ll::lfs_soff_t, i32) {
        match self {
            // littlefs offsets are signed; larger starts fail as Invalid
            Self::Start(off) => (
                off.min(i32::MAX as u32) as ll::lfs_soff_t,
                ll::lfs_whence_flags_LFS_SEEK_SET as i32,
            ),
            Self::Current(off) => (off, ll::lfs_whence_flags_LFS_SEEK_CUR as i32),
            Self::End(off) => (off, ll::lfs_whence_flags_LFS_SEEK_END as i32),
        }
    }
}

/// Entry kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    /// Regular file
    File,
    /// Directory
    Dir,
}

/// What `stat` and directory reads report about an entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Info {
    /// Entry name (no path)
    pub name: String,
    /// File or directory
    pub kind: FileType,
    /// Size in bytes (zero for directories)
    pub size: u32,
}

impl Info {
    /// True for directories
    pub fn is_dir(&self) -> bool {
        self.kind == FileType::Dir
    }

    pub(crate) fn from_raw(info: &ll::lfs_info) -> Self {
        let name: Vec<u8> = info
            .name
            .iter()
            .take_while(|&&c| c != 0)
            .map(|&c| c as u8)
            .collect();
        let kind = if info.type_ as ll::lfs_type == ll::lfs_type_LFS_TYPE_DIR {
            FileType::Dir
        } else {
            FileType::File
        };
        Self {
            name: String::from_utf8_lossy(&name).into_owned(),
            kind,
            size: if kind == FileType::Dir { 0 } else { info.size },
        }
    }
}
