//! Winbond W25Qxx command driver
//!
//! Speaks the W25Q command set over a [`Transport`]. The driver learns the
//! part's geometry from its JEDEC ID at [`W25Qxx::initialize`] and refuses
//! every data operation before that.
//!
//! All busy-waits are bounded: a wait polls Status Register 1 and spends
//! `poll_interval_ms` of its budget per busy reading, failing with
//! [`DriverError::Timeout`] once the budget is gone.

mod config;
mod error;

pub use config::*;
pub use error::DriverError;

use crate::chip::{table, DeviceGeometry, DeviceIdentity};
use crate::spi::opcodes;
use crate::spi::AddressWidth;
use crate::transport::Transport;

/// Result type for driver operations
pub type Result<T> = core::result::Result<T, DriverError>;

/// Chunk size used when reading back programmed data
const VERIFY_CHUNK: usize = 64;

/// The three W25Q status registers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusRegister {
    /// BUSY, WEL and block protection bits
    Sr1,
    /// QE, SUS and security register locks
    Sr2,
    /// Output driver strength and WPS
    Sr3,
}

impl StatusRegister {
    /// Opcode that reads this register
    pub const fn read_opcode(self) -> u8 {
        match self {
            Self::Sr1 => opcodes::RDSR,
            Self::Sr2 => opcodes::RDSR2,
            Self::Sr3 => opcodes::RDSR3,
        }
    }

    /// Opcode that writes this register
    pub const fn write_opcode(self) -> u8 {
        match self {
            Self::Sr1 => opcodes::WRSR,
            Self::Sr2 => opcodes::WRSR2,
            Self::Sr3 => opcodes::WRSR3,
        }
    }
}

/// W25Qxx driver owning its transport
pub struct W25Qxx<T: Transport> {
    transport: T,
    config: DriverConfig,
    identity: Option<DeviceIdentity>,
    geometry: DeviceGeometry,
    address_width: AddressWidth,
}

impl<T: Transport> W25Qxx<T> {
    /// Create an uninitialized driver with default timeouts
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, DriverConfig::default())
    }

    /// Create an uninitialized driver with the given configuration
    pub fn with_config(transport: T, config: DriverConfig) -> Self {
        Self {
            transport,
            config,
            identity: None,
            geometry: DeviceGeometry::default(),
            address_width: AddressWidth::default(),
        }
    }

    /// Current configuration
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Replace the configuration
    pub fn set_config(&mut self, config: DriverConfig) {
        self.config = config;
    }

    /// Borrow the transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutably borrow the transport
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Give the transport back
    pub fn release(self) -> T {
        self.transport
    }

    /// True after a successful [`initialize`](Self::initialize)
    pub fn is_initialized(&self) -> bool {
        self.identity.is_some()
    }

    /// Identity read at initialization
    pub fn identity(&self) -> Option<DeviceIdentity> {
        self.identity
    }

    /// Discovered geometry (all zero before initialization)
    pub fn geometry(&self) -> &DeviceGeometry {
        &self.geometry
    }

    /// Address width used for read, program and erase commands
    pub fn address_width(&self) -> AddressWidth {
        self.address_width
    }

    /// Initialize the transport, identify the part and derive its geometry
    ///
    /// Unknown density codes fall back to a conservative default geometry
    /// instead of failing. Calling this again re-identifies the part.
    pub fn initialize(&mut self) -> Result<()> {
        self.transport.init();

        let identity = self.read_jedec_id();
        if !identity.is_plausible() {
            log::warn!(
                "Implausible JEDEC ID {:06X}, is the flash connected?",
                identity.jedec_id()
            );
        }

        let entry = match table::find(&identity) {
            Some(entry) => entry,
            None => {
                log::warn!(
                    "Unknown density code 0x{:02X}, assuming {} bytes",
                    identity.density_code(),
                    table::DEFAULT_ENTRY.capacity
                );
                &table::DEFAULT_ENTRY
            }
        };

        self.geometry = entry.geometry();
        self.address_width = AddressWidth::for_capacity(self.geometry.total_size);
        self.identity = Some(identity);

        log::debug!(
            "Found {} (JEDEC ID {:06X}), {} bytes, {}-byte addressing",
            entry.name,
            identity.jedec_id(),
            self.geometry.total_size,
            self.address_width.bytes()
        );
        Ok(())
    }

    /// Issue RDID and decode the response
    pub fn read_jedec_id(&mut self) -> DeviceIdentity {
        let mut id = [0u8; 3];
        self.transport.select();
        self.transport.send(&[opcodes::RDID]);
        self.transport.receive(&mut id);
        self.transport.deselect();
        DeviceIdentity::from_rdid(id)
    }

    /// Read `buf.len()` bytes starting at `address` using Fast Read
    pub fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<()> {
        self.check_range(address, buf.len())?;
        if buf.is_empty() {
            return Ok(());
        }

        self.wait_ready(self.config.read_timeout_ms)?;

        let opcode = match self.address_width {
            AddressWidth::ThreeByte => opcodes::FAST_READ,
            AddressWidth::FourByte => opcodes::FAST_READ_4B,
        };
        let mut header = [0u8; 6];
        let mut len = self.command_header(opcode, address, &mut header);
        header[len] = opcodes::DUMMY;
        len += 1;

        log::trace!("read 0x{:08X} len {}", address, buf.len());
        self.transport.select();
        self.transport.send(&header[..len]);
        self.transport.receive(buf);
        self.transport.deselect();
        Ok(())
    }

    /// Program `data` starting at `address`
    ///
    /// The range must lie inside a single sector; a range that touches two
    /// sectors is rejected before any bus activity. Within the sector the
    /// data is split at page boundaries and each page is programmed with
    /// its own Write Enable and busy-wait. The target must already be
    /// erased; programming only clears bits.
    pub fn write(&mut self, address: u32, data: &[u8]) -> Result<()> {
        self.check_range(address, data.len())?;
        if data.is_empty() {
            return Ok(());
        }

        let last = address + (data.len() as u32 - 1);
        if self.geometry.sector_of(address) != self.geometry.sector_of(last) {
            log::debug!(
                "write 0x{:08X}..=0x{:08X} crosses a sector boundary",
                address,
                last
            );
            return Err(DriverError::InvalidAddress);
        }

        let page_size = self.geometry.page_size;
        let mut address = address;
        let mut remaining = data;
        while !remaining.is_empty() {
            let room = (page_size - address % page_size) as usize;
            let (chunk, rest) = remaining.split_at(room.min(remaining.len()));
            self.program_page(address, chunk)?;
            if self.config.verify_writes {
                self.verify(address, chunk)?;
            }
            address += chunk.len() as u32;
            remaining = rest;
        }
        Ok(())
    }

    fn program_page(&mut self, address: u32, chunk: &[u8]) -> Result<()> {
        self.enable_write()?;

        let opcode = match self.address_width {
            AddressWidth::ThreeByte => opcodes::PP,
            AddressWidth::FourByte => opcodes::PP_4B,
        };
        let mut header = [0u8; 5];
        let len = self.command_header(opcode, address, &mut header);

        log::trace!("program 0x{:08X} len {}", address, chunk.len());
        self.transport.select();
        self.transport.send(&header[..len]);
        self.transport.send(chunk);
        self.transport.deselect();

        self.wait_ready(self.config.write_timeout_ms)
    }

    fn verify(&mut self, address: u32, expected: &[u8]) -> Result<()> {
        let mut buf = [0u8; VERIFY_CHUNK];
        for (i, want) in expected.chunks(VERIFY_CHUNK).enumerate() {
            let offset = address + (i * VERIFY_CHUNK) as u32;
            let got = &mut buf[..want.len()];
            self.read(offset, got)?;
            if got != want {
                log::warn!("verify mismatch in chunk at 0x{:08X}", offset);
                return Err(DriverError::VerificationFailed);
            }
        }
        Ok(())
    }

    /// Erase one 4 KiB sector by index
    pub fn erase_sector(&mut self, sector: u32) -> Result<()> {
        self.ensure_initialized()?;
        if sector >= self.geometry.sector_count {
            return Err(DriverError::InvalidAddress);
        }
        let opcode = match self.address_width {
            AddressWidth::ThreeByte => opcodes::SE_20,
            AddressWidth::FourByte => opcodes::SE_21,
        };
        let address = sector * self.geometry.sector_size;
        log::debug!("erase sector {} at 0x{:08X}", sector, address);
        self.erase(opcode, Some(address), self.config.sector_erase_timeout_ms)
    }

    /// Erase one 64 KiB block by index
    pub fn erase_block(&mut self, block: u32) -> Result<()> {
        self.ensure_initialized()?;
        if block >= self.geometry.block_count {
            return Err(DriverError::InvalidAddress);
        }
        let opcode = match self.address_width {
            AddressWidth::ThreeByte => opcodes::BE_D8,
            AddressWidth::FourByte => opcodes::BE_DC,
        };
        let address = block * self.geometry.block_size;
        log::debug!("erase block {} at 0x{:08X}", block, address);
        self.erase(opcode, Some(address), self.config.block_erase_timeout_ms)
    }

    /// Erase the whole chip
    pub fn erase_chip(&mut self) -> Result<()> {
        self.ensure_initialized()?;
        log::debug!("erase chip");
        self.erase(opcodes::CE_C7, None, self.config.chip_erase_timeout_ms)
    }

    fn erase(&mut self, opcode: u8, address: Option<u32>, timeout_ms: u32) -> Result<()> {
        self.enable_write()?;

        let mut header = [0u8; 5];
        let len = match address {
            Some(address) => self.command_header(opcode, address, &mut header),
            None => {
                header[0] = opcode;
                1
            }
        };
        self.transport.select();
        self.transport.send(&header[..len]);
        self.transport.deselect();

        self.wait_ready(timeout_ms)
    }

    /// Suspend an in-progress erase
    ///
    /// Whether an erase is actually running is not tracked; the command is
    /// sent regardless.
    pub fn suspend_erase(&mut self) -> Result<()> {
        self.command(opcodes::SUSPEND);
        self.wait_ready(self.config.default_timeout_ms)
    }

    /// Resume a suspended erase
    pub fn resume_erase(&mut self) -> Result<()> {
        self.command(opcodes::RESUME);
        self.wait_ready(self.config.default_timeout_ms)
    }

    /// Enter deep power-down
    pub fn power_down(&mut self) {
        self.command(opcodes::DP);
        self.transport.delay_ms(1);
    }

    /// Leave deep power-down
    pub fn release_power_down(&mut self) {
        self.transport.select();
        self.transport.send(&[opcodes::RDP, opcodes::DUMMY]);
        self.transport.deselect();
        self.transport.delay_ms(1);
    }

    /// Set the write enable latch
    ///
    /// Fails with `Timeout` if the device is busy and with `WriteProtected`
    /// if WEL does not read back set.
    pub fn enable_write(&mut self) -> Result<()> {
        if self.is_busy() {
            return Err(DriverError::Timeout);
        }
        self.command(opcodes::WREN);
        if self.is_write_enabled() {
            Ok(())
        } else {
            log::debug!("WEL not set after WREN");
            Err(DriverError::WriteProtected)
        }
    }

    /// Read one status register
    pub fn read_status_register(&mut self, reg: StatusRegister) -> u8 {
        self.transport.select();
        self.transport.send(&[reg.read_opcode()]);
        let value = self.transport.exchange(opcodes::DUMMY);
        self.transport.deselect();
        value
    }

    /// Write one status register and wait for the write to finish
    pub fn write_status_register(&mut self, reg: StatusRegister, value: u8) -> Result<()> {
        self.enable_write()?;
        self.transport.select();
        self.transport.send(&[reg.write_opcode(), value]);
        self.transport.deselect();
        self.wait_ready(self.config.default_timeout_ms)
    }

    /// BUSY bit of Status Register 1
    pub fn is_busy(&mut self) -> bool {
        self.read_status_register(StatusRegister::Sr1) & opcodes::SR1_BUSY != 0
    }

    /// WEL bit of Status Register 1
    pub fn is_write_enabled(&mut self) -> bool {
        self.read_status_register(StatusRegister::Sr1) & opcodes::SR1_WEL != 0
    }

    /// SUS bit of Status Register 2
    pub fn is_suspended(&mut self) -> bool {
        self.read_status_register(StatusRegister::Sr2) & opcodes::SR2_SUS != 0
    }

    /// Poll BUSY until clear or until `timeout_ms` is spent
    pub fn wait_ready(&mut self, timeout_ms: u32) -> Result<()> {
        let interval = self.config.poll_interval_ms.max(1);
        let mut remaining = timeout_ms;
        while self.is_busy() {
            if remaining == 0 {
                log::debug!("device still busy after {} ms", timeout_ms);
                return Err(DriverError::Timeout);
            }
            self.transport.delay_ms(interval);
            remaining = remaining.saturating_sub(interval);
        }
        Ok(())
    }

    fn command(&mut self, opcode: u8) {
        self.transport.select();
        self.transport.send(&[opcode]);
        self.transport.deselect();
    }

    fn command_header(&self, opcode: u8, address: u32, buf: &mut [u8]) -> usize {
        buf[0] = opcode;
        1 + self.address_width.encode(address, &mut buf[1..])
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(DriverError::InvalidParameter)
        }
    }

    fn check_range(&self, address: u32, len: usize) -> Result<()> {
        self.ensure_initialized()?;
        if self.geometry.is_valid_range(address, len) {
            Ok(())
        } else {
            Err(DriverError::InvalidAddress)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Bus that answers RDID with a fixed ID and reports idle otherwise
    struct IdOnly {
        id: [u8; 3],
        opcode: Option<u8>,
        pos: usize,
        frames: usize,
    }

    impl IdOnly {
        fn new(id: [u8; 3]) -> Self {
            Self {
                id,
                opcode: None,
                pos: 0,
                frames: 0,
            }
        }
    }

    impl Transport for IdOnly {
        fn select(&mut self) {
            self.opcode = None;
            self.pos = 0;
            self.frames += 1;
        }

        fn deselect(&mut self) {}

        fn exchange(&mut self, byte: u8) -> u8 {
            let opcode = *self.opcode.get_or_insert(byte);
            let pos = self.pos;
            self.pos += 1;
            match opcode {
                opcodes::RDID if (1..=3).contains(&pos) => self.id[pos - 1],
                _ => 0,
            }
        }
    }

    #[test]
    fn test_operations_need_initialize() {
        let mut drv = W25Qxx::new(IdOnly::new([0xEF, 0x40, 0x18]));
        let mut buf = [0u8; 4];
        assert_eq!(drv.read(0, &mut buf), Err(DriverError::InvalidParameter));
        assert_eq!(drv.write(0, &buf), Err(DriverError::InvalidParameter));
        assert_eq!(drv.erase_sector(0), Err(DriverError::InvalidParameter));
        assert_eq!(drv.erase_chip(), Err(DriverError::InvalidParameter));
        assert_eq!(drv.transport().frames, 0);
        assert!(!drv.geometry().is_known());
    }

    #[test]
    fn test_initialize_picks_geometry_and_width() {
        let mut drv = W25Qxx::new(IdOnly::new([0xEF, 0x40, 0x19]));
        drv.initialize().unwrap();
        assert_eq!(drv.geometry().total_size, 32 * 1024 * 1024);
        assert_eq!(drv.address_width(), AddressWidth::FourByte);
        assert_eq!(drv.identity(), Some(DeviceIdentity::new(0xEF, 0x4019)));
    }

    #[test]
    fn test_out_of_range_is_rejected_without_bus_traffic() {
        let mut drv = W25Qxx::new(IdOnly::new([0xEF, 0x40, 0x14]));
        drv.initialize().unwrap();
        let frames = drv.transport().frames;
        let mut buf = [0u8; 2];
        assert_eq!(
            drv.read(1024 * 1024 - 1, &mut buf),
            Err(DriverError::InvalidAddress)
        );
        assert_eq!(drv.erase_block(16), Err(DriverError::InvalidAddress));
        assert_eq!(drv.erase_sector(256), Err(DriverError::InvalidAddress));
        assert_eq!(drv.transport().frames, frames);
    }

    #[test]
    fn test_status_register_opcodes() {
        assert_eq!(StatusRegister::Sr2.read_opcode(), 0x35);
        assert_eq!(StatusRegister::Sr3.write_opcode(), 0x11);
    }
}
