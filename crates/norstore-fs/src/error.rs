//! Bridge error type

use core::ffi::c_int;
use core::fmt;

use littlefs2_sys as ll;

/// Error reported by littlefs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FsError {
    /// Device operation failed
    Io,
    /// Metadata or data is corrupted
    Corrupt,
    /// No such file or directory
    NoEntry,
    /// Entry already exists
    Exists,
    /// A path component is not a directory
    NotDir,
    /// Entry is a directory
    IsDir,
    /// Directory is not empty
    NotEmpty,
    /// File not open in the required mode
    BadFile,
    /// File too large
    TooLarge,
    /// Invalid argument or path
    Invalid,
    /// No free blocks left
    NoSpace,
    /// Out of buffer memory
    NoMemory,
    /// No such attribute
    NoAttr,
    /// Name longer than the configured maximum
    NameTooLong,
    /// Code this binding does not know
    Other(i32),
}

impl FsError {
    /// Error for a negative littlefs return code
    pub fn from_code(code: i32) -> Self {
        match code {
            ll::lfs_error_LFS_ERR_IO => Self::Io,
            ll::lfs_error_LFS_ERR_CORRUPT => Self::Corrupt,
            ll::lfs_error_LFS_ERR_NOENT => Self::NoEntry,
            ll::lfs_error_LFS_ERR_EXIST => Self::Exists,
            ll::lfs_error_LFS_ERR_NOTDIR => Self::NotDir,
            ll::lfs_error_LFS_ERR_ISDIR => Self::IsDir,
            ll::lfs_error_LFS_ERR_NOTEMPTY => Self::NotEmpty,
            ll::lfs_error_LFS_ERR_BADF => Self::BadFile,
            ll::lfs_error_LFS_ERR_FBIG => Self::TooLarge,
            ll::lfs_error_LFS_ERR_INVAL => Self::Invalid,
            ll::lfs_error_LFS_ERR_NOSPC => Self::NoSpace,
            ll::lfs_error_LFS_ERR_NOMEM => Self::NoMemory,
            ll::lfs_error_LFS_ERR_NOATTR => Self::NoAttr,
            ll::lfs_error_LFS_ERR_NAMETOOLONG => Self::NameTooLong,
            other => Self::Other(other),
        }
    }

    /// littlefs return code
    pub fn code(&self) -> i32 {
        match self {
            Self::Io => ll::lfs_error_LFS_ERR_IO,
            Self::Corrupt => ll::lfs_error_LFS_ERR_CORRUPT,
            Self::NoEntry => ll::lfs_error_LFS_ERR_NOENT,
            Self::Exists => ll::lfs_error_LFS_ERR_EXIST,
            Self::NotDir => ll::lfs_error_LFS_ERR_NOTDIR,
            Self::IsDir => ll::lfs_error_LFS_ERR_ISDIR,
            Self::NotEmpty => ll::lfs_error_LFS_ERR_NOTEMPTY,
            Self::BadFile => ll::lfs_error_LFS_ERR_BADF,
            Self::TooLarge => ll::lfs_error_LFS_ERR_FBIG,
            Self::Invalid => ll::lfs_error_LFS_ERR_INVAL,
            Self::NoSpace => ll::lfs_error_LFS_ERR_NOSPC,
            Self::NoMemory => ll::lfs_error_LFS_ERR_NOMEM,
            Self::NoAttr => ll::lfs_error_LFS_ERR_NOATTR,
            Self::NameTooLong => ll::lfs_error_LFS_ERR_NAMETOOLONG,
            Self::Other(code) => *code,
        }
    }
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io => write!(f, "I/O error"),
            Self::Corrupt => write!(f, "corrupted"),
            Self::NoEntry => write!(f, "no such file or directory"),
            Self::Exists => write!(f, "already exists"),
            Self::NotDir => write!(f, "not a directory"),
            Self::IsDir => write!(f, "is a directory"),
            Self::NotEmpty => write!(f, "directory not empty"),
            Self::BadFile => write!(f, "bad file"),
            Self::TooLarge => write!(f, "file too large"),
            Self::Invalid => write!(f, "invalid argument"),
            Self::NoSpace => write!(f, "no space left"),
            Self::NoMemory => write!(f, "out of memory"),
            Self::NoAttr => write!(f, "no such attribute"),
            Self::NameTooLong => write!(f, "name too long"),
            Self::Other(code) => write!(f, "error {}", code),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FsError {}

/// Error returned by [`FlashFs`](crate::FlashFs)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// No device has been attached with `init`
    NotInitialized,
    /// The filesystem is not mounted
    NotMounted,
    /// The filesystem is already mounted
    AlreadyMounted,
    /// The device reports a geometry the filesystem cannot use
    InvalidGeometry,
    /// Handle is stale, never existed, or names the other handle kind
    BadHandle,
    /// Error from littlefs
    Fs(FsError),
}

impl Error {
    /// Negative integer code, as a C caller would see it
    pub fn code(&self) -> i32 {
        match self {
            Self::Fs(e) => e.code(),
            Self::BadHandle => FsError::BadFile.code(),
            _ => -1,
        }
    }
}

impl From<FsError> for Error {
    fn from(e: FsError) -> Self {
        Self::Fs(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInitialized => write!(f, "filesystem bridge not initialized"),
            Self::NotMounted => write!(f, "filesystem not mounted"),
            Self::AlreadyMounted => write!(f, "filesystem already mounted"),
            Self::InvalidGeometry => write!(f, "device geometry unusable for a filesystem"),
            Self::BadHandle => write!(f, "invalid or closed handle"),
            Self::Fs(e) => write!(f, "filesystem error: {}", e),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Fs(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type alias using the bridge error
pub type Result<T> = core::result::Result<T, Error>;

/// Map a littlefs status return
pub(crate) fn check(code: c_int) -> Result<()> {
    if code < 0 {
        Err(Error::Fs(FsError::from_code(code)))
    } else {
        Ok(())
    }
}

/// Map a littlefs size or offset return
pub(crate) fn check_len(code: i32) -> Result<u32> {
    u32::try_from(code).map_err(|_| Error::Fs(FsError::from_code(code)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip_through_littlefs_values() {
        assert_eq!(FsError::Io.code(), -5);
        assert_eq!(FsError::Corrupt.code(), -84);
        assert_eq!(FsError::NoEntry.code(), -2);
        assert_eq!(FsError::from_code(-28), FsError::NoSpace);
        assert_eq!(FsError::from_code(-1000), FsError::Other(-1000));
        assert_eq!(Error::BadHandle.code(), -9);
    }

    #[test]
    fn test_check_len() {
        assert_eq!(check_len(42), Ok(42));
        assert_eq!(check_len(-2), Err(Error::Fs(FsError::NoEntry)));
        assert_eq!(check(0), Ok(()));
        assert_eq!(check(-5), Err(Error::Fs(FsError::Io)));
    }
}
