use crate::session::{Operation, Role};
use broker_address::AddressError;
use dataset_attributes::AttributeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A mandatory setting is missing or malformed.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// The operation is not available for the session's role.
    #[error("{role} cannot {operation}")]
    Capability { role: Role, operation: Operation },

    #[error("session closed")]
    SessionClosed,

    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    /// Broker failure reported by a non-rdkafka driver.
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Session lock poisoned")]
    Poisoned,
}

impl Error {
    pub fn capability(role: Role, operation: Operation) -> Self {
        Self::Capability { role, operation }
    }

    /// Whether the error came from the broker client rather than from this crate.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Kafka(_) | Self::Transport(_))
    }
}

impl From<AttributeError> for Error {
    fn from(err: AttributeError) -> Self {
        Error::Configuration(err.to_string())
    }
}

impl From<AddressError> for Error {
    fn from(err: AddressError) -> Self {
        Error::Configuration(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
