//! CLI command implementations
//!
//! Every command runs against a [`Session`]: the image file loaded into the
//! emulated chip, wrapped by the driver, the block-device adapter and the
//! filesystem bridge.

mod files;
mod info;

pub use files::{cmd_df, cmd_get, cmd_ls, cmd_mkdir, cmd_mv, cmd_put, cmd_rm};
pub use info::cmd_info;

use crate::config::Config;
use crate::error::{CliError, Result};
use norstore_core::{BlockDevice, W25Device, W25Qxx};
use norstore_dummy::DummyFlash;
use norstore_fs::FlashFs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// The full storage stack over an image file
pub type Device = W25Device<DummyFlash>;

pub struct Session {
    image: PathBuf,
    fs: FlashFs<Device>,
}

impl Session {
    /// Load `image` (blank if missing) and attach it to the bridge
    pub fn open(image: &Path, config: &Config) -> Result<Self> {
        let data = match std::fs::read(image) {
            Ok(data) => {
                log::debug!("Read {} bytes from {:?}", data.len(), image);
                data
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::info!("{:?} does not exist, starting from a blank chip", image);
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };
        if data.len() > config.device.size {
            return Err(CliError::ImageTooLarge {
                len: data.len(),
                size: config.device.size,
            });
        }

        let flash = DummyFlash::with_data(config.device.clone(), &data);
        let mut device = W25Device::new(W25Qxx::with_config(flash, config.driver));
        device.initialize()?;

        let mut fs = FlashFs::new();
        fs.init(device)?;
        Ok(Self {
            image: image.to_path_buf(),
            fs,
        })
    }

    pub fn fs(&mut self) -> &mut FlashFs<Device> {
        &mut self.fs
    }

    /// Mount, formatting a blank or corrupt image on the way
    pub fn mounted(&mut self) -> Result<&mut FlashFs<Device>> {
        if !self.fs.is_mounted() {
            self.fs.mount()?;
        }
        Ok(&mut self.fs)
    }

    /// Unmount and write the chip contents back to the image file
    pub fn save(self) -> Result<()> {
        let Self { image, fs } = self;
        let Some(device) = fs.release() else {
            return Err(norstore_fs::Error::NotInitialized.into());
        };
        let data = device.into_driver().release().into_data();
        std::fs::write(&image, &data)?;
        log::info!("Wrote {} bytes to {:?}", data.len(), image);
        Ok(())
    }
}

/// Write an empty filesystem
pub fn cmd_format(session: &mut Session) -> Result<()> {
    session.fs().format()?;
    println!("Formatted");
    Ok(())
}

/// Human-readable byte count
pub(crate) fn format_size(bytes: u64) -> String {
    if bytes >= 1024 * 1024 && bytes % (1024 * 1024) == 0 {
        format!("{} MiB", bytes / (1024 * 1024))
    } else if bytes >= 1024 && bytes % 1024 == 0 {
        format!("{} KiB", bytes / 1024)
    } else {
        format!("{} bytes", bytes)
    }
}
