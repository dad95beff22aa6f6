//! Error types for gp-core
//!
//! Provides a unified error type that can be converted to appropriate exit codes.

use thiserror::Error;

/// Result type alias for gp-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for gp-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file or provider settings error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Declared resource configuration rejected before any remote call
    #[error("Validation error: {0}")]
    Validation(String),

    /// Profile not found
    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    /// Profile already exists
    #[error("Profile already exists: {0}")]
    ProfileExists(String),

    /// Remote resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Admin API answered with a non-success status
    #[error("{summary}: {detail}")]
    Api {
        status: u16,
        summary: String,
        detail: String,
    },

    /// Network error (retryable)
    #[error("Network error: {0}")]
    Network(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// General error
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Whether this error signals that the remote resource is absent
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Get the appropriate exit code for this error
    pub const fn exit_code(&self) -> i32 {
        match self {
            Error::Validation(_) | Error::Config(_) => 2, // UsageError
            Error::Network(_) => 3,                       // NetworkError
            Error::Api { status: 401 | 403, .. } => 4,    // AuthError
            Error::NotFound(_) | Error::ProfileNotFound(_) => 5, // NotFound
            Error::Api { status: 409, .. } | Error::ProfileExists(_) => 6, // Conflict
            _ => 1,                                       // GeneralError
        }
    }
}
