//! Common Infrastructure Module
//!
//! Shared utilities and configuration for the custody engine.
//!
//! This module contains:
//! - Configuration loading from environment variables
//! - Structured logging setup
//! - Common error types

pub mod config;
pub mod error;
pub mod logging;

// Re-exports for convenience
pub use config::{ConfigError, CustodyConfig, Network};
pub use error::{CustodyError, Result};
pub use logging::{
    generate_correlation_id, init_from_config, init_logging, EventCategory, LogEvent, LogLevel,
    LoggingError,
};
