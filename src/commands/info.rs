//! `info` command

use super::{format_size, Session};
use crate::error::Result;
use norstore_core::BlockDevice;

pub fn cmd_info(session: &mut Session) -> Result<()> {
    let fs = session.fs();
    let Some(device) = fs.device() else {
        return Err(norstore_fs::Error::NotInitialized.into());
    };
    let driver = device.driver();
    let info = device.info();

    println!("Flash Chip Information");
    println!("======================");
    println!();
    if let Some(id) = driver.identity() {
        println!(
            "JEDEC ID:        {:02X} {:04X}",
            id.manufacturer_id, id.device_id
        );
    }
    println!(
        "Size:            {} bytes ({})",
        info.total_size,
        format_size(info.total_size as u64)
    );
    println!("Page size:       {} bytes", info.page_size);
    println!("Sector size:     {}", format_size(info.sector_size as u64));
    println!("Block size:      {}", format_size(info.block_size as u64));
    println!("Erase cycles:    {}", info.erase_cycles_max);
    println!(
        "Suspend:         {}",
        if info.supports_suspend {
            "Supported"
        } else {
            "Not supported"
        }
    );
    println!("Addressing:      {:?}", driver.address_width());

    if let Some(config) = fs.config() {
        println!();
        println!("Filesystem layout");
        println!("-----------------");
        println!("Blocks:          {} x {}", config.block_count, format_size(config.block_size as u64));
        println!("Program size:    {} bytes", config.prog_size);
        println!("Cache size:      {} bytes", config.cache_size);
        println!("Lookahead:       {} blocks", config.lookahead_size * 8);
        println!("Block cycles:    {}", config.block_cycles);
    }

    Ok(())
}
