use thiserror::Error;

/// Errors raised when reading typed values out of a [`crate::Configuration`].
///
/// Building a configuration never fails: unknown keys are dropped and missing
/// ones take their defaults. Errors only show up once a caller asks for a
/// value of a particular type.
#[derive(Error, Debug)]
pub enum AttributeError {
    #[error("Attribute `{0}` is required but not set")]
    Missing(String),

    #[error("Attribute `{0}` is not declared")]
    Undeclared(String),

    #[error("Attribute `{name}` is not a valid {expected}: {source}")]
    InvalidType {
        name: String,
        expected: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, AttributeError>;
