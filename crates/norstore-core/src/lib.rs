//! norstore-core - NOR flash driver and block-device contract
//!
//! This crate contains the lower half of the norstore storage stack:
//!
//! - [`transport`] - the byte-exchange contract a SPI bus must satisfy
//! - [`driver`] - a command-level driver for Winbond W25Qxx serial NOR flash
//! - [`device`] - the hardware-agnostic [`BlockDevice`] contract
//! - [`adapter`] - [`W25Device`], which makes the driver satisfy the contract
//!
//! It is `no_std` and never allocates; the `alloc` feature only adds a
//! blanket [`BlockDevice`] impl for boxed devices.
//!
//! # Features
//!
//! - `std` - Enable standard library support (includes `alloc` and serde
//!   derives on the configuration types)
//! - `alloc` - Enable heap allocation
//!
//! # Example
//!
//! ```ignore
//! use norstore_core::{BlockDevice, W25Device, W25Qxx};
//!
//! fn dump_first_page<T: norstore_core::Transport>(bus: T) -> norstore_core::Result<()> {
//!     let mut device = W25Device::new(W25Qxx::new(bus));
//!     device.initialize()?;
//!     let mut page = [0u8; 256];
//!     device.read(0, &mut page)?;
//!     println!("{:02X?}", page);
//!     Ok(())
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod adapter;
pub mod chip;
pub mod device;
pub mod driver;
pub mod error;
pub mod spi;
pub mod transport;

pub use adapter::W25Device;
pub use chip::{DeviceGeometry, DeviceIdentity, DeviceInfo};
pub use device::BlockDevice;
pub use driver::{DriverConfig, DriverError, StatusRegister, W25Qxx};
pub use error::{Error, Result};
pub use transport::Transport;
