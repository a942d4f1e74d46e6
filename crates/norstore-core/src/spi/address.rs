//! Address width types

/// Address width of the read/program/erase commands
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AddressWidth {
    /// 3-byte (24-bit) address - supports up to 16 MiB
    #[default]
    ThreeByte,
    /// 4-byte (32-bit) address - supports up to 4 GiB
    FourByte,
}

impl AddressWidth {
    /// Pick the narrowest width that reaches every byte of `capacity`
    pub const fn for_capacity(capacity: u32) -> Self {
        if capacity > Self::ThreeByte.max_size() {
            Self::FourByte
        } else {
            Self::ThreeByte
        }
    }

    /// Returns the number of address bytes
    pub const fn bytes(&self) -> usize {
        match self {
            Self::ThreeByte => 3,
            Self::FourByte => 4,
        }
    }

    /// Returns the maximum addressable size in bytes
    pub const fn max_size(&self) -> u32 {
        match self {
            Self::ThreeByte => 16 * 1024 * 1024,
            Self::FourByte => u32::MAX,
        }
    }

    /// Encode an address MSB first into the start of `buf`
    ///
    /// Three-byte encoding keeps only the lowest three bytes of `address`.
    pub fn encode(&self, address: u32, buf: &mut [u8]) -> usize {
        match self {
            Self::ThreeByte => {
                buf[0] = (address >> 16) as u8;
                buf[1] = (address >> 8) as u8;
                buf[2] = address as u8;
            }
            Self::FourByte => {
                buf[0] = (address >> 24) as u8;
                buf[1] = (address >> 16) as u8;
                buf[2] = (address >> 8) as u8;
                buf[3] = address as u8;
            }
        }
        self.bytes()
    }
}
