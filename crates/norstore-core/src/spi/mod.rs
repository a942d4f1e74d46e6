//! SPI flash command vocabulary
//!
//! This module provides the W25Qxx opcodes and the address encoding used by
//! every addressed command.

mod address;
pub mod opcodes;

pub use address::AddressWidth;
pub use opcodes::*;
