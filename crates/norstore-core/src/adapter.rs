//! W25Qxx implementation of the block-device contract
//!
//! [`W25Device`] forwards every contract method to the [`W25Qxx`] driver
//! and relabels driver errors through the single `From<DriverError>`
//! mapping below. Nothing else in the stack sees [`DriverError`].

use crate::chip::DeviceGeometry;
use crate::device::BlockDevice;
use crate::driver::{DriverError, W25Qxx};
use crate::error::{Error, Result};
use crate::transport::Transport;

impl From<DriverError> for Error {
    fn from(e: DriverError) -> Self {
        match e {
            DriverError::Timeout => Error::Timeout,
            DriverError::InvalidAddress => Error::InvalidAddress,
            DriverError::WriteProtected => Error::WriteProtected,
            DriverError::InvalidParameter => Error::NotInitialized,
            DriverError::VerificationFailed => Error::VerificationFailed,
        }
    }
}

/// Block device backed by a W25Qxx chip
pub struct W25Device<T: Transport> {
    driver: W25Qxx<T>,
}

impl<T: Transport> W25Device<T> {
    /// Wrap a driver
    pub fn new(driver: W25Qxx<T>) -> Self {
        Self { driver }
    }

    /// Borrow the driver
    pub fn driver(&self) -> &W25Qxx<T> {
        &self.driver
    }

    /// Mutably borrow the driver, e.g. for status-register access
    pub fn driver_mut(&mut self) -> &mut W25Qxx<T> {
        &mut self.driver
    }

    /// Unwrap into the driver
    pub fn into_driver(self) -> W25Qxx<T> {
        self.driver
    }
}

impl<T: Transport> BlockDevice for W25Device<T> {
    fn initialize(&mut self) -> Result<()> {
        Ok(self.driver.initialize()?)
    }

    fn geometry(&self) -> DeviceGeometry {
        *self.driver.geometry()
    }

    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<()> {
        Ok(self.driver.read(address, buf)?)
    }

    fn write(&mut self, address: u32, data: &[u8]) -> Result<()> {
        Ok(self.driver.write(address, data)?)
    }

    fn erase_sector(&mut self, sector: u32) -> Result<()> {
        Ok(self.driver.erase_sector(sector)?)
    }

    fn erase_block(&mut self, block: u32) -> Result<()> {
        Ok(self.driver.erase_block(block)?)
    }

    fn erase_chip(&mut self) -> Result<()> {
        Ok(self.driver.erase_chip()?)
    }

    fn suspend_erase(&mut self) -> Result<()> {
        Ok(self.driver.suspend_erase()?)
    }

    fn resume_erase(&mut self) -> Result<()> {
        Ok(self.driver.resume_erase()?)
    }

    fn is_busy(&mut self) -> bool {
        self.driver.is_busy()
    }

    fn enable_write(&mut self) -> Result<()> {
        Ok(self.driver.enable_write()?)
    }

    fn disable_write(&mut self) -> Result<()> {
        // The driver leaves WEL alone; every program/erase re-arms it anyway.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_error_mapping_is_total() {
        let cases = [
            (DriverError::Timeout, Error::Timeout),
            (DriverError::InvalidAddress, Error::InvalidAddress),
            (DriverError::WriteProtected, Error::WriteProtected),
            (DriverError::InvalidParameter, Error::NotInitialized),
            (DriverError::VerificationFailed, Error::VerificationFailed),
        ];
        for (from, to) in cases {
            assert_eq!(Error::from(from), to);
        }
    }
}
