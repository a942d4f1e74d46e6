//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u16
fn parse_hex_u16(s: &str) -> Result<u16, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u16::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u16>().map_err(|e| format!("Invalid number: {}", e))
    }
}

#[derive(Parser)]
#[command(name = "norstore")]
#[command(author, version, about = "Filesystem tool for W25Qxx NOR flash images", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Flash image file (created blank if missing)
    #[arg(short, long, global = true, default_value = "flash.bin")]
    pub image: PathBuf,

    /// TOML file with [device] and [driver] tables
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Emulate a Winbond part with this JEDEC device ID (hex, e.g. 0x4017)
    #[arg(long, global = true, value_parser = parse_hex_u16)]
    pub chip: Option<u16>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show chip identity, geometry and filesystem layout
    Info,

    /// Write an empty filesystem
    Format,

    /// List a directory
    Ls {
        /// Directory to list
        #[arg(default_value = "/")]
        path: String,
    },

    /// Create a directory
    Mkdir {
        /// Directory to create
        path: String,
    },

    /// Copy a local file into the filesystem
    Put {
        /// Local source file
        local: PathBuf,
        /// Destination path in the filesystem
        remote: String,
    },

    /// Copy a file out of the filesystem
    Get {
        /// Source path in the filesystem
        remote: String,
        /// Local destination file
        local: PathBuf,
    },

    /// Remove a file or empty directory
    Rm {
        /// Path to remove
        path: String,
    },

    /// Rename or move an entry
    Mv {
        /// Existing path
        from: String,
        /// New path
        to: String,
    },

    /// Show space usage
    Df,
}

impl Commands {
    /// Whether the image must be written back afterwards
    pub fn mutates(&self) -> bool {
        matches!(
            self,
            Self::Format | Self::Mkdir { .. } | Self::Put { .. } | Self::Rm { .. } | Self::Mv { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_u16() {
        assert_eq!(parse_hex_u16("0x4017"), Ok(0x4017));
        assert_eq!(parse_hex_u16("0X40"), Ok(0x40));
        assert_eq!(parse_hex_u16("16407"), Ok(16407));
        assert!(parse_hex_u16("0x10000").is_err());
        assert!(parse_hex_u16("abc").is_err());
    }

    #[test]
    fn test_parse_put() {
        let cli = Cli::try_parse_from(["norstore", "-i", "img.bin", "put", "a.txt", "/data/a.txt"])
            .unwrap();
        assert_eq!(cli.image, PathBuf::from("img.bin"));
        assert!(cli.command.mutates());
        match cli.command {
            Commands::Put { local, remote } => {
                assert_eq!(local, PathBuf::from("a.txt"));
                assert_eq!(remote, "/data/a.txt");
            }
            _ => panic!("expected put"),
        }
    }

    #[test]
    fn test_ls_defaults_to_root() {
        let cli = Cli::try_parse_from(["norstore", "ls", "--chip", "0x4017"]).unwrap();
        assert_eq!(cli.chip, Some(0x4017));
        assert!(!cli.command.mutates());
        assert!(matches!(cli.command, Commands::Ls { ref path } if path == "/"));
    }
}
