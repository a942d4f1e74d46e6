//! norstore-dummy - In-memory W25Qxx emulator for testing
//!
//! [`DummyFlash`] implements the byte-level [`Transport`] contract and
//! answers like a Winbond W25Qxx part would: chip select opens a command
//! frame, every exchanged byte is decoded by opcode and position, and
//! program/erase commands take effect when chip select is released. It is
//! what the driver tests, the filesystem bridge tests and the CLI run on.
//!
//! Busy time is modelled in status polls rather than wall time: after a
//! program or erase the BUSY bit stays set for a configurable number of
//! Status Register 1 reads.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "alloc")]
use alloc::vec;
#[cfg(feature = "alloc")]
use alloc::vec::Vec;

use norstore_core::spi::opcodes;
use norstore_core::Transport;

/// Level on MISO when the chip is not driving the line
const IDLE_LINE: u8 = 0xFF;
/// 32 KiB erase unit (BE_52)
const HALF_BLOCK_SIZE: usize = 32 * 1024;

/// Configuration for the dummy flash
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "std", serde(default))]
pub struct DummyConfig {
    /// JEDEC manufacturer ID
    pub manufacturer_id: u8,
    /// JEDEC device ID
    pub device_id: u16,
    /// Flash size in bytes
    pub size: usize,
    /// Page size for programming
    pub page_size: usize,
    /// Sector size for smallest erase
    pub sector_size: usize,
    /// Block size for the 64 KiB erase
    pub block_size: usize,
    /// Status polls that report BUSY after a page program
    pub program_busy_polls: u32,
    /// Status polls that report BUSY after a sector or block erase
    pub erase_busy_polls: u32,
    /// Status polls that report BUSY after a chip erase
    pub chip_erase_busy_polls: u32,
    /// Report BUSY forever
    pub stuck_busy: bool,
    /// Ignore Write Enable, as with the WP# pin asserted
    pub write_protected: bool,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            manufacturer_id: 0xEF, // Winbond
            device_id: 0x4018,     // W25Q128
            size: 16 * 1024 * 1024,
            page_size: 256,
            sector_size: 4096,
            block_size: 64 * 1024,
            program_busy_polls: 1,
            erase_busy_polls: 4,
            chip_erase_busy_polls: 16,
            stuck_busy: false,
            write_protected: false,
        }
    }
}

impl DummyConfig {
    /// Configuration for a Winbond part with the given device ID
    ///
    /// The size follows the JEDEC density code in the low byte.
    pub fn winbond(device_id: u16) -> Self {
        Self {
            device_id,
            size: 1usize << (device_id & 0xFF),
            ..Self::default()
        }
    }
}

/// Dummy W25Qxx flash
///
/// Emulates a flash chip in memory for testing purposes.
#[cfg(feature = "alloc")]
pub struct DummyFlash {
    config: DummyConfig,
    data: Vec<u8>,
    status_reg1: u8,
    status_reg2: u8,
    status_reg3: u8,
    write_enabled: bool,
    busy_polls: u32,
    suspended_polls: Option<u32>,
    powered_down: bool,
    selected: bool,
    frame: Vec<u8>,
    transactions: Vec<u8>,
    total_delay_ms: u64,
    init_count: u32,
}

#[cfg(feature = "alloc")]
impl DummyFlash {
    /// Create a new dummy flash with the given configuration
    pub fn new(config: DummyConfig) -> Self {
        let data = vec![0xFF; config.size];
        Self {
            config,
            data,
            status_reg1: 0,
            status_reg2: 0,
            status_reg3: 0,
            write_enabled: false,
            busy_polls: 0,
            suspended_polls: None,
            powered_down: false,
            selected: false,
            frame: Vec::new(),
            transactions: Vec::new(),
            total_delay_ms: 0,
            init_count: 0,
        }
    }

    /// Create a new dummy flash with default configuration (W25Q128)
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Create a dummy flash with pre-filled data
    pub fn with_data(config: DummyConfig, initial_data: &[u8]) -> Self {
        let mut flash = Self::new(config);
        let len = core::cmp::min(initial_data.len(), flash.data.len());
        flash.data[..len].copy_from_slice(&initial_data[..len]);
        flash
    }

    /// Get a reference to the flash data
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get a mutable reference to the flash data
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Take the flash contents
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Get the configuration
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// Make the chip report BUSY forever (or stop doing so)
    pub fn set_stuck_busy(&mut self, stuck: bool) {
        self.config.stuck_busy = stuck;
    }

    /// Assert or release hardware write protection
    pub fn set_write_protected(&mut self, protected: bool) {
        self.config.write_protected = protected;
    }

    /// Opcode of every completed transaction, oldest first
    pub fn transactions(&self) -> &[u8] {
        &self.transactions
    }

    /// Forget the recorded transactions
    pub fn clear_transactions(&mut self) {
        self.transactions.clear();
    }

    /// Number of completed transactions with the given opcode
    pub fn opcode_count(&self, opcode: u8) -> usize {
        self.transactions.iter().filter(|&&op| op == opcode).count()
    }

    /// Sum of all delays requested through the transport
    pub fn total_delay_ms(&self) -> u64 {
        self.total_delay_ms
    }

    /// How often the transport was initialized
    pub fn init_count(&self) -> u32 {
        self.init_count
    }

    /// Whether the chip is in deep power-down
    pub fn is_powered_down(&self) -> bool {
        self.powered_down
    }

    /// Whether the write enable latch is set
    pub fn is_write_enabled(&self) -> bool {
        self.write_enabled
    }

    fn is_busy(&self) -> bool {
        self.config.stuck_busy || self.busy_polls > 0
    }

    /// Status Register 1 as seen by one poll; every busy poll uses up one
    /// unit of the remaining busy time
    fn poll_status1(&mut self) -> u8 {
        let mut sr = self.status_reg1 & !(opcodes::SR1_BUSY | opcodes::SR1_WEL);
        if self.is_busy() {
            sr |= opcodes::SR1_BUSY;
            if !self.config.stuck_busy {
                self.busy_polls -= 1;
            }
        }
        if self.write_enabled {
            sr |= opcodes::SR1_WEL;
        }
        sr
    }

    fn status2(&self) -> u8 {
        let sr = self.status_reg2 & !opcodes::SR2_SUS;
        if self.suspended_polls.is_some() {
            sr | opcodes::SR2_SUS
        } else {
            sr
        }
    }

    /// Address of the current frame, once all address bytes are in
    fn frame_address(&self) -> Option<usize> {
        let opcode = *self.frame.first()?;
        let width = address_bytes(opcode);
        let bytes = self.frame.get(1..1 + width)?;
        let address = bytes
            .iter()
            .fold(0usize, |acc, &b| (acc << 8) | b as usize);
        if address >= self.data.len() {
            log::trace!("dummy: address 0x{:08X} beyond the array", address);
            return None;
        }
        Some(address)
    }

    fn read_byte(&self, opcode: u8, pos: usize) -> u8 {
        let dummy = match opcode {
            opcodes::FAST_READ | opcodes::FAST_READ_4B => 1,
            _ => 0,
        };
        let header = 1 + address_bytes(opcode) + dummy;
        if pos < header || self.data.is_empty() {
            return IDLE_LINE;
        }
        match self.frame_address() {
            Some(start) => self.data.get(start + pos - header).copied().unwrap_or(IDLE_LINE),
            None => IDLE_LINE,
        }
    }

    fn respond(&mut self, pos: usize) -> u8 {
        let opcode = self.frame[0];
        match opcode {
            opcodes::RDID => match pos {
                1 => self.config.manufacturer_id,
                2 => (self.config.device_id >> 8) as u8,
                3 => self.config.device_id as u8,
                _ => IDLE_LINE,
            },
            opcodes::RDSR => self.poll_status1(),
            opcodes::RDSR2 => self.status2(),
            opcodes::RDSR3 => self.status_reg3,
            opcodes::READ | opcodes::READ_4B | opcodes::FAST_READ | opcodes::FAST_READ_4B
                if !self.is_busy() =>
            {
                self.read_byte(opcode, pos)
            }
            _ => IDLE_LINE,
        }
    }

    fn execute(&mut self, opcode: u8) {
        match opcode {
            opcodes::WREN => {
                if !self.config.write_protected {
                    self.write_enabled = true;
                }
            }
            opcodes::WRDI => self.write_enabled = false,
            opcodes::WRSR | opcodes::WRSR2 | opcodes::WRSR3 => self.handle_write_status(opcode),
            opcodes::PP | opcodes::PP_4B => self.handle_page_program(),
            opcodes::SE_20 | opcodes::SE_21 => self.handle_erase(self.config.sector_size),
            opcodes::BE_52 => self.handle_erase(HALF_BLOCK_SIZE),
            opcodes::BE_D8 | opcodes::BE_DC => self.handle_erase(self.config.block_size),
            opcodes::CE_C7 | opcodes::CE_60 => self.handle_chip_erase(),
            opcodes::SUSPEND => {
                if self.busy_polls > 0 {
                    self.suspended_polls = Some(self.busy_polls);
                    self.busy_polls = 0;
                }
            }
            opcodes::RESUME => {
                if let Some(polls) = self.suspended_polls.take() {
                    self.busy_polls = polls;
                }
            }
            opcodes::DP => self.powered_down = true,
            _ => {}
        }
    }

    fn handle_write_status(&mut self, opcode: u8) {
        let Some(&value) = self.frame.get(1) else {
            return;
        };
        if !self.write_enabled {
            return;
        }
        match opcode {
            opcodes::WRSR => {
                self.status_reg1 = value & !(opcodes::SR1_BUSY | opcodes::SR1_WEL)
            }
            opcodes::WRSR2 => self.status_reg2 = value & !opcodes::SR2_SUS,
            _ => self.status_reg3 = value,
        }
        self.write_enabled = false;
    }

    fn handle_page_program(&mut self) {
        if !self.write_enabled {
            log::trace!("dummy: page program without WEL ignored");
            return;
        }
        let Some(address) = self.frame_address() else {
            return;
        };
        let header = 1 + address_bytes(self.frame[0]);
        let page_size = self.config.page_size;
        let page_base = address - address % page_size;
        let offset = address % page_size;

        // Only the last page_size bytes stay in the page buffer
        let payload = &self.frame[header..];
        let skip = payload.len().saturating_sub(page_size);
        for (i, &byte) in payload.iter().enumerate().skip(skip) {
            let target = page_base + (offset + i) % page_size;
            // Flash programming: can only change 1 -> 0
            self.data[target] &= byte;
        }

        self.write_enabled = false;
        self.busy_polls = self.config.program_busy_polls;
    }

    fn handle_erase(&mut self, erase_size: usize) {
        if !self.write_enabled {
            log::trace!("dummy: erase without WEL ignored");
            return;
        }
        let Some(address) = self.frame_address() else {
            return;
        };

        // Align address to erase boundary
        let aligned = address - address % erase_size;
        let end = (aligned + erase_size).min(self.data.len());
        self.data[aligned..end].fill(0xFF);

        self.write_enabled = false;
        self.busy_polls = self.config.erase_busy_polls;
    }

    fn handle_chip_erase(&mut self) {
        if !self.write_enabled {
            return;
        }
        self.data.fill(0xFF);
        self.write_enabled = false;
        self.busy_polls = self.config.chip_erase_busy_polls;
    }
}

/// Address bytes that follow `opcode`
fn address_bytes(opcode: u8) -> usize {
    match opcode {
        opcodes::READ_4B
        | opcodes::FAST_READ_4B
        | opcodes::PP_4B
        | opcodes::SE_21
        | opcodes::BE_DC => 4,
        _ => 3,
    }
}

#[cfg(feature = "alloc")]
impl Transport for DummyFlash {
    fn init(&mut self) {
        self.init_count += 1;
    }

    fn select(&mut self) {
        self.selected = true;
        self.frame.clear();
    }

    fn deselect(&mut self) {
        if !self.selected {
            return;
        }
        self.selected = false;

        let Some(&opcode) = self.frame.first() else {
            return;
        };
        self.transactions.push(opcode);

        if self.powered_down {
            if opcode == opcodes::RDP {
                self.powered_down = false;
            }
            return;
        }

        let status_or_suspend = matches!(
            opcode,
            opcodes::RDSR | opcodes::RDSR2 | opcodes::RDSR3 | opcodes::SUSPEND
        );
        if self.is_busy() && !status_or_suspend {
            log::trace!("dummy: opcode 0x{:02X} ignored while busy", opcode);
            return;
        }

        self.execute(opcode);
    }

    fn exchange(&mut self, byte: u8) -> u8 {
        if !self.selected {
            return IDLE_LINE;
        }
        let pos = self.frame.len();
        self.frame.push(byte);
        if pos == 0 || self.powered_down {
            return IDLE_LINE;
        }
        self.respond(pos)
    }

    fn delay_ms(&mut self, ms: u32) {
        self.total_delay_ms += ms as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use norstore_core::{
        BlockDevice, DriverConfig, DriverError, Error, StatusRegister, W25Device, W25Qxx,
    };

    fn small_config() -> DummyConfig {
        DummyConfig::winbond(0x4014) // W25Q80, 1 MiB
    }

    fn driver(config: DummyConfig) -> W25Qxx<DummyFlash> {
        let mut drv = W25Qxx::new(DummyFlash::new(config));
        drv.initialize().unwrap();
        drv.transport_mut().clear_transactions();
        drv
    }

    fn raw(flash: &mut DummyFlash, bytes: &[u8]) {
        flash.select();
        flash.send(bytes);
        flash.deselect();
    }

    #[test]
    fn test_read_jedec_id() {
        let mut drv = W25Qxx::new(DummyFlash::new_default());
        let id = drv.read_jedec_id();
        assert_eq!(id.manufacturer_id, 0xEF);
        assert_eq!(id.device_id, 0x4018);
    }

    #[test]
    fn test_initialize_discovers_geometry() {
        let drv = driver(DummyConfig::default());
        let g = drv.geometry();
        assert_eq!(g.total_size, 16 * 1024 * 1024);
        assert_eq!(g.sector_count, 4096);
        assert_eq!(g.block_count, 256);
        assert!(g.supports_suspend);
        assert_eq!(drv.transport().init_count(), 1);
    }

    #[test]
    fn test_round_trip_across_page_boundary() {
        let mut drv = driver(small_config());
        let data: Vec<u8> = (0..300u32).map(|i| (i * 7) as u8).collect();

        drv.write(0x1F0, &data).unwrap();
        // 16 bytes to the page end, one full page, then the rest
        assert_eq!(drv.transport().opcode_count(opcodes::PP), 3);

        let mut buf = vec![0u8; data.len()];
        drv.read(0x1F0, &mut buf).unwrap();
        assert_eq!(buf, data);
        assert_eq!(drv.transport().opcode_count(opcodes::FAST_READ), 1);
    }

    #[test]
    fn test_cross_sector_write_rejected_without_bus_traffic() {
        let mut drv = driver(small_config());
        assert_eq!(
            drv.write(0x0FFF, &[0x00, 0x00]),
            Err(DriverError::InvalidAddress)
        );
        assert!(drv.transport().transactions().is_empty());
        assert!(drv.transport().data()[0xFF0..0x1010]
            .iter()
            .all(|&b| b == 0xFF));
    }

    #[test]
    fn test_write_up_to_sector_end_is_allowed() {
        let mut drv = driver(small_config());
        drv.write(0x0FFE, &[0x12, 0x34]).unwrap();
        assert_eq!(&drv.transport().data()[0x0FFE..0x1000], &[0x12, 0x34]);
    }

    #[test]
    fn test_zero_length_write_is_noop() {
        let mut drv = driver(small_config());
        drv.write(0x100, &[]).unwrap();
        assert!(drv.transport().transactions().is_empty());
        assert_eq!(
            drv.write(1024 * 1024 + 1, &[]),
            Err(DriverError::InvalidAddress)
        );
    }

    #[test]
    fn test_erase_sector_reads_back_ff() {
        let mut drv = driver(small_config());
        drv.write(0x2000, &[0u8; 256]).unwrap();
        drv.erase_sector(2).unwrap();

        let mut buf = [0u8; 4096];
        drv.read(0x2000, &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 0xFF));
        assert_eq!(drv.transport().opcode_count(opcodes::SE_20), 1);
    }

    #[test]
    fn test_erase_block_and_chip() {
        let mut drv = driver(small_config());
        drv.write(0x10000, &[0u8; 16]).unwrap();
        drv.write(0x20000, &[0u8; 16]).unwrap();

        drv.erase_block(1).unwrap();
        assert!(drv.transport().data()[0x10000..0x10010]
            .iter()
            .all(|&b| b == 0xFF));
        assert_eq!(drv.transport().data()[0x20000], 0x00);

        drv.erase_chip().unwrap();
        assert!(drv.transport().data().iter().all(|&b| b == 0xFF));
        assert_eq!(drv.transport().opcode_count(opcodes::BE_D8), 1);
        assert_eq!(drv.transport().opcode_count(opcodes::CE_C7), 1);
    }

    #[test]
    fn test_busy_wait_within_budget_succeeds() {
        let mut drv = driver(DummyConfig {
            program_busy_polls: 500,
            ..small_config()
        });
        drv.write(0, &[0xA5]).unwrap();
        assert_eq!(drv.transport().total_delay_ms(), 500);
        assert_eq!(drv.transport().data()[0], 0xA5);
    }

    #[test]
    fn test_busy_wait_past_budget_times_out() {
        let mut drv = driver(DummyConfig {
            program_busy_polls: 501,
            ..small_config()
        });
        assert_eq!(drv.write(0, &[0xA5]), Err(DriverError::Timeout));
        assert_eq!(drv.transport().total_delay_ms(), 500);
    }

    #[test]
    fn test_stuck_busy_read_times_out() {
        let mut drv = driver(small_config());
        drv.transport_mut().set_stuck_busy(true);
        let mut buf = [0u8; 4];
        assert_eq!(drv.read(0, &mut buf), Err(DriverError::Timeout));
        assert_eq!(drv.transport().total_delay_ms(), 3000);
        assert_eq!(drv.enable_write(), Err(DriverError::Timeout));
    }

    #[test]
    fn test_write_protected_chip() {
        let mut drv = driver(DummyConfig {
            write_protected: true,
            ..small_config()
        });
        assert_eq!(drv.write(0, &[0x00]), Err(DriverError::WriteProtected));
        assert_eq!(drv.erase_sector(0), Err(DriverError::WriteProtected));
        assert_eq!(drv.transport().opcode_count(opcodes::PP), 0);
        assert_eq!(drv.transport().data()[0], 0xFF);
    }

    #[test]
    fn test_uninitialized_driver_touches_nothing() {
        let mut drv = W25Qxx::new(DummyFlash::new(small_config()));
        let mut buf = [0u8; 1];
        assert_eq!(drv.read(0, &mut buf), Err(DriverError::InvalidParameter));
        assert_eq!(drv.write(0, &buf), Err(DriverError::InvalidParameter));
        assert_eq!(drv.erase_block(0), Err(DriverError::InvalidParameter));
        assert!(drv.transport().transactions().is_empty());
    }

    #[test]
    fn test_unknown_id_defaults_to_4mib() {
        let drv = driver(DummyConfig {
            manufacturer_id: 0x9D,
            device_id: 0x60AA,
            size: 4 * 1024 * 1024,
            ..DummyConfig::default()
        });
        let g = drv.geometry();
        assert_eq!(g.total_size, 4 * 1024 * 1024);
        assert_eq!(g.block_count, 64);
        assert!(!g.supports_suspend);
    }

    #[test]
    fn test_four_byte_addressing_above_16mib() {
        let mut drv = driver(DummyConfig::winbond(0x4019));
        let address = 24 * 1024 * 1024 + 0x10;
        drv.write(address, b"high").unwrap();

        let mut buf = [0u8; 4];
        drv.read(address, &mut buf).unwrap();
        assert_eq!(&buf, b"high");

        let flash = drv.transport();
        assert_eq!(flash.opcode_count(opcodes::PP_4B), 1);
        assert_eq!(flash.opcode_count(opcodes::FAST_READ_4B), 1);
        assert_eq!(flash.opcode_count(opcodes::PP), 0);
        assert_eq!(&flash.data()[address as usize..address as usize + 4], b"high");
    }

    #[test]
    fn test_addresses_beyond_the_array_are_not_wrapped() {
        // ID claims 32 MiB, the array holds 16 MiB
        let mut drv = driver(DummyConfig {
            device_id: 0x4019,
            ..DummyConfig::default()
        });
        drv.write(0x100, b"meta").unwrap();

        let high = 16 * 1024 * 1024 + 0x100;
        drv.erase_block(256).unwrap();
        drv.write(high, b"boom").unwrap();
        assert_eq!(&drv.transport().data()[0x100..0x104], b"meta");

        let mut buf = [0u8; 4];
        drv.read(high, &mut buf).unwrap();
        assert_eq!(buf, [0xFF; 4]);
    }

    #[test]
    fn test_verify_catches_unerased_target() {
        let mut drv = W25Qxx::with_config(
            DummyFlash::new(small_config()),
            DriverConfig {
                verify_writes: true,
                ..DriverConfig::default()
            },
        );
        drv.initialize().unwrap();

        drv.write(0x40, &[0x0F; 80]).unwrap();
        assert_eq!(
            drv.write(0x40, &[0xF0; 80]),
            Err(DriverError::VerificationFailed)
        );
        assert_eq!(drv.transport().data()[0x40], 0x00);
    }

    #[test]
    fn test_suspend_and_resume_erase() {
        let mut drv = driver(DummyConfig {
            erase_busy_polls: 5,
            ..small_config()
        });
        // Start an erase behind the driver's back so it is still running
        raw(drv.transport_mut(), &[opcodes::WREN]);
        raw(drv.transport_mut(), &[opcodes::SE_20, 0x00, 0x10, 0x00]);
        assert!(drv.is_busy());

        drv.suspend_erase().unwrap();
        assert!(drv.is_suspended());
        assert!(!drv.is_busy());

        drv.resume_erase().unwrap();
        assert!(!drv.is_suspended());
        assert!(!drv.is_busy());
    }

    #[test]
    fn test_suspend_when_idle_is_harmless() {
        let mut drv = driver(small_config());
        drv.suspend_erase().unwrap();
        drv.resume_erase().unwrap();
        assert_eq!(drv.transport().opcode_count(opcodes::SUSPEND), 1);
        assert_eq!(drv.transport().opcode_count(opcodes::RESUME), 1);
    }

    #[test]
    fn test_power_down_and_release() {
        let mut drv = driver(small_config());
        drv.power_down();
        assert!(drv.transport().is_powered_down());
        assert!(!drv.read_jedec_id().is_plausible());

        drv.release_power_down();
        assert!(!drv.transport().is_powered_down());
        assert_eq!(drv.read_jedec_id().jedec_id(), 0xEF4014);
        assert_eq!(drv.transport().total_delay_ms(), 2);
    }

    #[test]
    fn test_status_register_write() {
        let mut drv = driver(small_config());
        drv.write_status_register(StatusRegister::Sr3, 0x60).unwrap();
        assert_eq!(drv.read_status_register(StatusRegister::Sr3), 0x60);
        assert!(!drv.is_write_enabled());
    }

    #[test]
    fn test_write_enable_latch() {
        let mut drv = driver(small_config());
        drv.enable_write().unwrap();
        assert!(drv.is_write_enabled());
        raw(drv.transport_mut(), &[opcodes::WRDI]);
        assert!(!drv.is_write_enabled());
    }

    #[test]
    fn test_alternate_command_forms() {
        let mut flash = DummyFlash::new(DummyConfig {
            program_busy_polls: 0,
            erase_busy_polls: 0,
            chip_erase_busy_polls: 0,
            ..small_config()
        });
        raw(&mut flash, &[opcodes::WREN]);
        raw(&mut flash, &[opcodes::PP, 0x00, 0x80, 0x10, 0x5A]);
        raw(&mut flash, &[opcodes::WREN]);
        raw(&mut flash, &[opcodes::PP, 0x00, 0x00, 0x00, 0x11]);

        // Plain read with a 4-byte address
        flash.select();
        flash.send(&[opcodes::READ_4B, 0x00, 0x00, 0x80, 0x10]);
        assert_eq!(flash.exchange(opcodes::DUMMY), 0x5A);
        flash.deselect();

        // 32 KiB erase clears only the half block holding 0x8010
        raw(&mut flash, &[opcodes::WREN]);
        raw(&mut flash, &[opcodes::BE_52, 0x00, 0x80, 0x00]);
        assert_eq!(flash.data()[0x8010], 0xFF);
        assert_eq!(flash.data()[0x0000], 0x11);

        raw(&mut flash, &[opcodes::WREN]);
        raw(&mut flash, &[opcodes::CE_60]);
        assert!(flash.data().iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_injected_delay_sees_busy_waits() {
        let mut waited = 0u32;
        {
            let bus = DummyFlash::new(DummyConfig {
                program_busy_polls: 3,
                ..small_config()
            })
            .with_delay(|ms| waited += ms);
            let mut drv = W25Qxx::new(bus);
            drv.initialize().unwrap();
            drv.write(0, &[0x42]).unwrap();
            assert_eq!(drv.transport().inner().total_delay_ms(), 0);
        }
        assert_eq!(waited, 3);
    }

    #[test]
    fn test_adapter_reports_generic_errors() {
        let mut dev = W25Device::new(W25Qxx::new(DummyFlash::new(small_config())));
        let mut buf = [0u8; 2];
        assert_eq!(dev.read(0, &mut buf), Err(Error::NotInitialized));
        assert_eq!(dev.geometry().total_size, 0);

        dev.initialize().unwrap();
        assert_eq!(dev.info().total_size, 1024 * 1024);
        assert_eq!(dev.info().erase_cycles_max, 100_000);
        assert_eq!(dev.write(0x0FFF, &buf), Err(Error::InvalidAddress));
        assert_eq!(dev.erase_block(16), Err(Error::InvalidAddress));
        assert_eq!(dev.disable_write(), Ok(()));
        assert!(!dev.is_busy());

        dev.driver_mut().transport_mut().set_write_protected(true);
        assert_eq!(dev.write(0, &buf), Err(Error::WriteProtected));
    }

    #[test]
    fn test_borrowed_and_boxed_devices() {
        fn fill<D: BlockDevice>(mut dev: D) -> norstore_core::Result<()> {
            dev.erase_sector(0)?;
            dev.write(0, &[1, 2, 3])
        }

        let mut dev = W25Device::new(W25Qxx::new(DummyFlash::new(small_config())));
        dev.initialize().unwrap();
        fill(&mut dev).unwrap();
        assert_eq!(&dev.driver().transport().data()[..3], &[1, 2, 3]);

        let mut boxed: Box<dyn BlockDevice> = Box::new(dev);
        fill(&mut boxed).unwrap();
        let mut buf = [0u8; 3];
        boxed.read(0, &mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3]);
    }

    #[test]
    fn test_page_program_wraps_within_page() {
        let mut flash = DummyFlash::new(small_config());
        raw(&mut flash, &[opcodes::WREN]);
        raw(&mut flash, &[opcodes::PP, 0x00, 0x00, 0xFE, 0x11, 0x22, 0x33]);
        assert_eq!(&flash.data()[0xFE..0x100], &[0x11, 0x22]);
        assert_eq!(flash.data()[0x00], 0x33);
        assert_eq!(flash.data()[0x100], 0xFF);
    }

    #[test]
    fn test_commands_ignored_while_busy() {
        let mut flash = DummyFlash::new(DummyConfig {
            program_busy_polls: 2,
            ..small_config()
        });
        raw(&mut flash, &[opcodes::WREN]);
        raw(&mut flash, &[opcodes::PP, 0x00, 0x00, 0x00, 0x00]);
        raw(&mut flash, &[opcodes::WREN]);
        assert!(!flash.is_write_enabled());
    }
}
