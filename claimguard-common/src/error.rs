//! Common error types for claimguard

use thiserror::Error;

/// Common result type for claimguard operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across claimguard crates
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error, including unreadable files
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed TOML configuration file
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}
