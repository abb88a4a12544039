//! Error type shared by the LRMM crates
//!
//! Only file I/O and configuration parsing fail inside lrmm-common; the
//! marker engine layers its own error over this one.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// File system operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file unreadable or not valid TOML
    #[error("Configuration error: {0}")]
    Config(String),
}
