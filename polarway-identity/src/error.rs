//! Error types for polarway-identity — Railway Programming
//!
//! All operations return `Result<T, IdentityError>`.
//! Index maintenance failures are surfaced as-is: nothing here retries
//! or compensates, the caller decides.

use thiserror::Error;

/// Unified error type for all identity store operations
#[derive(Error, Debug)]
pub enum IdentityError {
    // ─── Protocol Errors ───

    #[error("Id mismatch: actor '{actor}' was addressed with record '{record}'")]
    IdMismatch { actor: String, record: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ─── Infrastructure Errors ───

    #[error("Infrastructure unavailable: {0}")]
    InfrastructureUnavailable(String),

    #[error("Delta table error: {0}")]
    DeltaTable(String),

    #[error("Arrow error: {0}")]
    Arrow(String),

    #[error("DataFusion error: {0}")]
    DataFusion(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IdentityError {
    /// True for failures of the runtime or the storage backend.
    ///
    /// These are left to the caller's retry policy; protocol errors
    /// (`IdMismatch`, `NotFound`, `DuplicateKey`, `InvalidArgument`) are not.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            Self::InfrastructureUnavailable(_)
                | Self::DeltaTable(_)
                | Self::Arrow(_)
                | Self::DataFusion(_)
                | Self::Io(_)
                | Self::Internal(_)
        )
    }

    pub(crate) fn user_not_found(id: &str) -> Self {
        Self::NotFound(format!("user '{id}'"))
    }

    pub(crate) fn role_not_found(id: &str) -> Self {
        Self::NotFound(format!("role '{id}'"))
    }
}

#[cfg(feature = "delta")]
impl From<deltalake::DeltaTableError> for IdentityError {
    fn from(err: deltalake::DeltaTableError) -> Self {
        IdentityError::DeltaTable(err.to_string())
    }
}

#[cfg(feature = "delta")]
impl From<deltalake::arrow::error::ArrowError> for IdentityError {
    fn from(err: deltalake::arrow::error::ArrowError) -> Self {
        IdentityError::Arrow(err.to_string())
    }
}

#[cfg(feature = "delta")]
impl From<deltalake::datafusion::error::DataFusionError> for IdentityError {
    fn from(err: deltalake::datafusion::error::DataFusionError) -> Self {
        IdentityError::DataFusion(err.to_string())
    }
}

#[cfg(feature = "delta")]
impl From<url::ParseError> for IdentityError {
    fn from(err: url::ParseError) -> Self {
        IdentityError::Config(format!("URL parse error: {err}"))
    }
}

impl From<serde_json::Error> for IdentityError {
    fn from(err: serde_json::Error) -> Self {
        IdentityError::Serialization(err.to_string())
    }
}

/// Result type alias for identity store operations
pub type Result<T> = std::result::Result<T, IdentityError>;
