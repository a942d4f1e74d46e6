//! TOML configuration file
//!
//! ```toml
//! [device]
//! device_id = 0x4017
//! size = 8388608
//! erase_busy_polls = 8
//!
//! [driver]
//! verify_writes = true
//! sector_erase_timeout_ms = 400
//! ```
//!
//! Every key is optional; missing ones keep their defaults.

use crate::error::{CliError, Result};
use norstore_core::chip::{table, DEFAULT_ENTRY};
use norstore_core::{DeviceIdentity, DriverConfig};
use norstore_dummy::DummyConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Emulated chip
    pub device: DummyConfig,
    /// Driver timeouts and write verification
    pub driver: DriverConfig,
}

impl Config {
    pub fn from_toml_str(s: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Load `path`, or the defaults when no file is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text).map_err(|source| CliError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Loaded config from {:?}", path);
        config.validate()?;
        Ok(config)
    }

    /// Reject chip shapes the emulator cannot model
    pub fn validate(&self) -> Result<()> {
        let d = &self.device;
        if d.page_size == 0 || d.sector_size == 0 || d.block_size == 0 || d.size == 0 {
            return Err(CliError::InvalidConfig("sizes must be non-zero".into()));
        }
        if d.sector_size % d.page_size != 0
            || d.block_size % d.sector_size != 0
            || d.size % d.block_size != 0
        {
            return Err(CliError::InvalidConfig(format!(
                "page {} / sector {} / block {} / size {} do not nest",
                d.page_size, d.sector_size, d.block_size, d.size
            )));
        }
        if d.size > u32::MAX as usize {
            return Err(CliError::InvalidConfig(format!(
                "size {} exceeds 32-bit addressing",
                d.size
            )));
        }
        // The driver sizes the chip from its ID alone
        let identity = DeviceIdentity::new(d.manufacturer_id, d.device_id);
        let expected = table::find(&identity).unwrap_or(&DEFAULT_ENTRY).capacity as usize;
        if d.size != expected {
            return Err(CliError::InvalidConfig(format!(
                "device ID 0x{:04X} identifies a {} byte chip but size is {}",
                d.device_id, expected, d.size
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(Config::from_toml_str("").unwrap(), Config::default());
    }

    #[test]
    fn test_partial_tables() {
        let config = Config::from_toml_str(
            "[device]\ndevice_id = 0x4017\nsize = 8388608\n\n[driver]\nverify_writes = true\n",
        )
        .unwrap();
        assert_eq!(config.device.device_id, 0x4017);
        assert_eq!(config.device.size, 8 * 1024 * 1024);
        assert_eq!(config.device.page_size, 256);
        assert!(config.driver.verify_writes);
        assert_eq!(config.driver.sector_erase_timeout_ms, 500);
        config.validate().unwrap();
    }

    #[test]
    fn test_rejects_bad_nesting() {
        let mut config = Config::default();
        config.device.sector_size = 3000;
        assert!(config.validate().is_err());
        config.device = DummyConfig::default();
        config.device.page_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_size_that_disagrees_with_device_id() {
        let config = Config::from_toml_str("[device]\ndevice_id = 0x4019\n").unwrap();
        assert_eq!(config.device.size, 16 * 1024 * 1024);
        assert!(matches!(config.validate(), Err(CliError::InvalidConfig(_))));

        let config =
            Config::from_toml_str("[device]\ndevice_id = 0x4019\nsize = 33554432\n").unwrap();
        config.validate().unwrap();
    }

    #[test]
    fn test_unknown_device_id_needs_default_capacity() {
        let mut config = Config::default();
        config.device.device_id = 0x4011;
        config.device.size = 128 * 1024;
        assert!(config.validate().is_err());
        config.device.size = 4 * 1024 * 1024;
        config.validate().unwrap();
    }
}
