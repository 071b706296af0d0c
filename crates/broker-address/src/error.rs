//! Error types for broker address resolution.

use thiserror::Error;

/// Errors raised while turning address lines into broker endpoints.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Broker address has an empty host: {0:?}")]
    EmptyHost(String),

    #[error("Invalid broker port in {line:?}: {port}")]
    InvalidPort { line: String, port: String },

    #[error("Invalid broker address argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, AddressError>;
