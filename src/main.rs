//! norstore - filesystem tool for W25Qxx NOR flash images
//!
//! The image file is loaded into an emulated W25Qxx chip and driven through
//! the same stack firmware would use on real hardware:
//!
//! - **Command driver** (`norstore_core::W25Qxx`) - JEDEC identification,
//!   page program, sector/block erase, busy-waits
//! - **Block device** (`norstore_core::W25Device`) - generic contract with a
//!   device-independent error taxonomy
//! - **Filesystem bridge** (`norstore_fs::FlashFs`) - littlefs mount
//!   lifecycle and handle table
//!
//! Mutating commands write the image back when they finish.

mod cli;
mod commands;
mod config;
mod error;

use clap::Parser;
use cli::{Cli, Commands};
use commands::Session;
use config::Config;
use norstore_dummy::DummyConfig;

fn main() {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> error::Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(device_id) = cli.chip {
        let density = device_id & 0xFF;
        if !(0x10..0x20).contains(&density) {
            return Err(error::CliError::InvalidConfig(format!(
                "density code 0x{:02X} in device ID 0x{:04X} is out of range",
                density, device_id
            )));
        }
        let chip = DummyConfig::winbond(device_id);
        config.device.device_id = chip.device_id;
        config.device.size = chip.size;
        config.validate()?;
    }

    let mut session = Session::open(&cli.image, &config)?;

    match &cli.command {
        Commands::Info => commands::cmd_info(&mut session)?,
        Commands::Format => commands::cmd_format(&mut session)?,
        Commands::Ls { path } => commands::cmd_ls(&mut session, path)?,
        Commands::Mkdir { path } => commands::cmd_mkdir(&mut session, path)?,
        Commands::Put { local, remote } => commands::cmd_put(&mut session, local, remote)?,
        Commands::Get { remote, local } => commands::cmd_get(&mut session, remote, local)?,
        Commands::Rm { path } => commands::cmd_rm(&mut session, path)?,
        Commands::Mv { from, to } => commands::cmd_mv(&mut session, from, to)?,
        Commands::Df => commands::cmd_df(&mut session)?,
    }

    if cli.command.mutates() {
        session.save()?;
    }
    Ok(())
}
