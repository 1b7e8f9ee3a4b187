//! Common Error Types for the custody engine
//!
//! Every engine operation returns `Result<T>`; module errors fold into
//! `CustodyError` so callers match on one taxonomy.

use thiserror::Error;

use crate::chain::{ChainError, SignerError};
use crate::storage::StorageError;
use crate::types::AmountError;

/// Root error type for the custody engine
#[derive(Debug, Error)]
pub enum CustodyError {
    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),

    /// Logging errors
    #[error("logging error: {0}")]
    Logging(#[from] super::logging::LoggingError),

    /// Document missing, unreadable or unwritable
    #[error("IO error: {0}")]
    Io(String),

    /// Document fails to parse or misses required fields
    #[error("format error: {0}")]
    Format(String),

    /// Decimal amount fails to parse
    #[error("conversion error: {0}")]
    Conversion(String),

    /// Remote query or broadcast failed
    #[error("chain error: {0}")]
    Chain(#[from] ChainError),

    /// Signing or key resolution failed
    #[error("signer error: {0}")]
    Signer(#[from] SignerError),

    /// Withdrawal exceeds the reconciled balance
    #[error("insufficient funds: balance {available}, requested {requested}")]
    InsufficientFunds { available: String, requested: String },

    /// No available pool entry
    #[error("no available account in pool")]
    Exhausted,

    /// Unknown credentials
    #[error("not found: {0}")]
    NotFound(String),

    /// Operation requires an admin session
    #[error("unauthorized: {0}")]
    Unauthorized(String),
}

impl From<StorageError> for CustodyError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Io { .. } => CustodyError::Io(err.to_string()),
            StorageError::Format { .. } => CustodyError::Format(err.to_string()),
            StorageError::Conversion { .. } => CustodyError::Conversion(err.to_string()),
        }
    }
}

impl From<AmountError> for CustodyError {
    fn from(err: AmountError) -> Self {
        CustodyError::Conversion(err.to_string())
    }
}

impl CustodyError {
    /// Create a format error
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    /// Create an unauthorized error
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    /// Check if re-issuing the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, CustodyError::Chain(_) | CustodyError::Io(_))
    }

    /// Get a stable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            CustodyError::Config(_) => "CONFIG_ERROR",
            CustodyError::Logging(_) => "LOGGING_ERROR",
            CustodyError::Io(_) => "IO_ERROR",
            CustodyError::Format(_) => "FORMAT_ERROR",
            CustodyError::Conversion(_) => "CONVERSION_ERROR",
            CustodyError::Chain(_) => "CHAIN_ERROR",
            CustodyError::Signer(_) => "SIGNER_ERROR",
            CustodyError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            CustodyError::Exhausted => "POOL_EXHAUSTED",
            CustodyError::NotFound(_) => "NOT_FOUND",
            CustodyError::Unauthorized(_) => "UNAUTHORIZED",
        }
    }
}

/// Result type alias using CustodyError
pub type Result<T> = std::result::Result<T, CustodyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(CustodyError::Exhausted.error_code(), "POOL_EXHAUSTED");
        assert_eq!(CustodyError::format("bad json").error_code(), "FORMAT_ERROR");

        let err = CustodyError::InsufficientFunds {
            available: "10".to_string(),
            requested: "20".to_string(),
        };
        assert!(err.to_string().contains("requested 20"));
    }

    #[test]
    fn test_retryable_errors() {
        assert!(CustodyError::Chain(ChainError::Rpc("timeout".to_string())).is_retryable());
        assert!(CustodyError::Io("disk full".to_string()).is_retryable());
        assert!(!CustodyError::Exhausted.is_retryable());
        assert!(!CustodyError::Conversion("abc".to_string()).is_retryable());
    }

    #[test]
    fn test_storage_error_mapping() {
        let err: CustodyError = StorageError::Conversion {
            key: "0xa1".to_string(),
            message: "bad amount".to_string(),
        }
        .into();
        assert_eq!(err.error_code(), "CONVERSION_ERROR");
    }
}
