//! Error types for Fedigest

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FedigestError>;

#[derive(Error, Debug)]
pub enum FedigestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Feed client error: {0}")]
    Client(#[from] FetchError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl FedigestError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            FedigestError::InvalidInput(_) => 3,
            FedigestError::Client(FetchError::Authentication(_)) => 2,
            FedigestError::Client(_) => 1,
            FedigestError::Config(_) => 1,
            FedigestError::Io(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Errors raised by the feed transport.
///
/// Any of these occurring mid-walk ends that subject's walk only; partial
/// results are kept and the run continues with the next subject.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error: {0}")]
    Api(String),
}
