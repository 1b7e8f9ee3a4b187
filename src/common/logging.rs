//! Structured Logging
//!
//! Engine events are built as `LogEvent` values and written as one JSON
//! line each under the `custody::events` target. Free-form diagnostics go
//! through plain `tracing` macros with per-module targets
//! (`custody::ledger`, `custody::transfer`, ...).
//!
//! Mainnet installs a JSON formatter; every other network gets the pretty
//! formatter.

use serde::Serialize;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Application log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl From<&str> for LogLevel {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "trace" => LogLevel::Trace,
            "debug" => LogLevel::Debug,
            "warn" | "warning" => LogLevel::Warn,
            "error" => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

/// What part of the engine an event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    Pool,
    Ledger,
    Transfer,
    Sweep,
    Security,
}

/// One structured engine event
#[derive(Debug, Serialize)]
pub struct LogEvent {
    /// RFC 3339, UTC
    pub timestamp: String,
    pub level: LogLevel,
    pub category: EventCategory,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetails>,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

impl LogEvent {
    pub fn new(level: LogLevel, category: EventCategory, message: impl Into<String>) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            level,
            category,
            message: message.into(),
            correlation_id: None,
            data: None,
            error: None,
        }
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_error(mut self, code: impl Into<String>, message: impl Into<String>) -> Self {
        self.error = Some(ErrorDetails {
            code: code.into(),
            message: message.into(),
        });
        self
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|e| format!("{{\"message\":{:?},\"serialize_error\":{:?}}}", self.message, e.to_string()))
    }

    /// Write the event at its own level
    pub fn emit(&self) {
        let line = self.to_json();
        match self.level {
            LogLevel::Trace => tracing::trace!(target: "custody::events", "{}", line),
            LogLevel::Debug => tracing::debug!(target: "custody::events", "{}", line),
            LogLevel::Info => tracing::info!(target: "custody::events", "{}", line),
            LogLevel::Warn => tracing::warn!(target: "custody::events", "{}", line),
            LogLevel::Error => tracing::error!(target: "custody::events", "{}", line),
        }
    }
}

// ============================================================================
// Event builders
// ============================================================================

/// Login attempt; failures are warnings
pub fn security_event(event_type: &str, success: bool, details: serde_json::Value) -> LogEvent {
    let level = if success { LogLevel::Info } else { LogLevel::Warn };
    LogEvent::new(level, EventCategory::Security, event_type)
        .with_data(serde_json::json!({ "success": success, "details": details }))
}

/// Pool address handed to a user
pub fn pool_event(address: &str, remaining: usize) -> LogEvent {
    LogEvent::new(LogLevel::Info, EventCategory::Pool, "address_assigned")
        .with_data(serde_json::json!({ "address": address, "remaining": remaining }))
}

/// Counts and balances after one reconcile pass
pub fn ledger_event(
    address: &str,
    confirmed: usize,
    still_pending: usize,
    addr_balance: &str,
    pending_balance: &str,
) -> LogEvent {
    let level = if confirmed > 0 { LogLevel::Info } else { LogLevel::Debug };
    LogEvent::new(level, EventCategory::Ledger, "reconciled").with_data(serde_json::json!({
        "address": address,
        "confirmed": confirmed,
        "still_pending": still_pending,
        "addr_balance": addr_balance,
        "pending_balance": pending_balance,
    }))
}

/// Fields of one transfer attempt
#[derive(Debug, Clone, Copy)]
pub struct TransferFields<'a> {
    pub from: &'a str,
    pub to: &'a str,
    pub amount_wei: &'a str,
    /// `TransferSigner::signer_type` of the key used
    pub signer: &'a str,
}

/// Transfer broadcast (`Ok(hash)`) or failed (`Err(message)`)
pub fn transfer_event(fields: TransferFields<'_>, outcome: Result<&str, &str>) -> LogEvent {
    let (level, message, hash) = match outcome {
        Ok(hash) => (LogLevel::Info, "transfer_submitted", Some(hash)),
        Err(_) => (LogLevel::Error, "transfer_failed", None),
    };

    let event = LogEvent::new(level, EventCategory::Transfer, message).with_data(serde_json::json!({
        "from": fields.from,
        "to": fields.to,
        "amount_wei": fields.amount_wei,
        "signer": fields.signer,
        "tx_hash": hash,
    }));

    match outcome {
        Err(err) => event.with_error("TRANSFER_ERROR", err),
        Ok(_) => event,
    }
}

/// End of a centralization run
pub fn sweep_event(run_id: &str, swept: usize, error: Option<&str>) -> LogEvent {
    let level = if error.is_some() { LogLevel::Error } else { LogLevel::Info };
    let event = LogEvent::new(level, EventCategory::Sweep, "centralize")
        .with_correlation_id(run_id)
        .with_data(serde_json::json!({ "swept_addresses": swept }));

    match error {
        Some(err) => event.with_error("SWEEP_ERROR", err),
        None => event,
    }
}

/// Fresh correlation ID
pub fn generate_correlation_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// ============================================================================
// Initialization
// ============================================================================

/// Install the global subscriber; `RUST_LOG` wins over `level`
pub fn init_logging(level: LogLevel, json_format: bool) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let lvl = level.directive();
        EnvFilter::new(format!("custody={lvl},ledger_custody={lvl},reqwest=warn"))
    });

    let registry = tracing_subscriber::registry().with(filter);
    let result = if json_format {
        registry.with(fmt::layer().json().with_target(true)).try_init()
    } else {
        registry.with(fmt::layer().pretty().with_target(true)).try_init()
    };

    result.map_err(|e| LoggingError::InitFailed(e.to_string()))
}

pub fn init_from_config(config: &crate::common::config::CustodyConfig) -> Result<(), LoggingError> {
    let json_format = config.network == crate::common::config::Network::Mainnet;
    init_logging(LogLevel::from(config.log_level.as_str()), json_format)
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("failed to initialize logging: {0}")]
    InitFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(event: &LogEvent) -> serde_json::Value {
        serde_json::from_str(&event.to_json()).unwrap()
    }

    #[test]
    fn test_sweep_event_shape() {
        let ok = parse(&sweep_event("run-1", 3, None));
        assert_eq!(ok["category"], "sweep");
        assert_eq!(ok["level"], "INFO");
        assert_eq!(ok["correlation_id"], "run-1");
        assert!(ok.get("error").is_none());

        let failed = parse(&sweep_event("run-2", 1, Some("no key")));
        assert_eq!(failed["level"], "ERROR");
        assert_eq!(failed["error"]["code"], "SWEEP_ERROR");
    }

    #[test]
    fn test_pool_and_ledger_events() {
        let pool = parse(&pool_event("0xa1", 4));
        assert_eq!(pool["category"], "pool");
        assert_eq!(pool["data"]["remaining"], 4);

        let quiet = parse(&ledger_event("0xa1", 0, 2, "100", "70"));
        assert_eq!(quiet["category"], "ledger");
        assert_eq!(quiet["level"], "DEBUG");
        assert_eq!(quiet["data"]["pending_balance"], "70");

        let moved = parse(&ledger_event("0xa1", 1, 0, "150", "150"));
        assert_eq!(moved["level"], "INFO");
    }

    #[test]
    fn test_transfer_event_carries_signer() {
        let fields = TransferFields {
            from: "0xa1",
            to: "0xb2",
            amount_wei: "50",
            signer: "node-keystore",
        };

        let sent = parse(&transfer_event(fields, Ok("0xabc")));
        assert_eq!(sent["message"], "transfer_submitted");
        assert_eq!(sent["data"]["signer"], "node-keystore");
        assert_eq!(sent["data"]["tx_hash"], "0xabc");

        let failed = parse(&transfer_event(fields, Err("nonce too low")));
        assert_eq!(failed["message"], "transfer_failed");
        assert!(failed["data"]["tx_hash"].is_null());
        assert_eq!(failed["error"]["message"], "nonce too low");
    }

    #[test]
    fn test_failed_login_is_warning() {
        let event = parse(&security_event("admin_login", false, serde_json::json!({})));
        assert_eq!(event["level"], "WARN");
        assert_eq!(event["data"]["success"], false);
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::from("debug"), LogLevel::Debug);
        assert_eq!(LogLevel::from("WARN"), LogLevel::Warn);
        assert_eq!(LogLevel::from("bogus"), LogLevel::Info);
    }

    #[test]
    fn test_correlation_ids_are_unique() {
        assert_ne!(generate_correlation_id(), generate_correlation_id());
    }
}
