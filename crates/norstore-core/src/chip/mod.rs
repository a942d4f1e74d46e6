//! Flash chip identity, geometry and the capacity table
//!
//! The driver reads a [`DeviceIdentity`] once at initialization and turns it
//! into a [`DeviceGeometry`] through the static [`table`].

pub mod table;
mod types;

pub use table::{ChipEntry, CHIPS, DEFAULT_ENTRY};
pub use types::*;
