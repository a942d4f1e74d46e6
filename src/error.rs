//! CLI error type

use std::path::PathBuf;
use thiserror::Error;

/// Everything that can stop a `norstore` command
#[derive(Debug, Error)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config {path:?}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("flash device error: {0}")]
    Device(#[from] norstore_core::Error),

    #[error("{0}")]
    Fs(#[from] norstore_fs::Error),

    #[error("progress bar template: {0}")]
    Progress(#[from] indicatif::style::TemplateError),

    #[error("image is {len} bytes but the configured chip holds {size}")]
    ImageTooLarge { len: usize, size: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, CliError>;
