//! Logging setup for Lodestar services.
//!
//! `lodestar-config` reports every load and accessor mismatch through the
//! `tracing` facade. This crate installs the subscriber that renders those
//! events, configured from the service's own validated configuration.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐   tracing events   ┌──────────────────────┐
//! │   lodestar-config    │ ─────────────────▶ │  lodestar-telemetry  │
//! │  (TracingReporter)   │                    │  (fmt + EnvFilter)   │
//! └──────────────────────┘                    └──────────┬───────────┘
//!                                                        │
//!                                                        ▼
//!                                                 ┌──────────────┐
//!                                                 │ stdout (JSON │
//!                                                 │  or pretty)  │
//!                                                 └──────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use lodestar_config::{ConfigLoader, Schema};
//! use lodestar_telemetry::{init_from_configuration, logging_rules};
//!
//! let schema = Schema::builder().rules(logging_rules()).build();
//! let config = ConfigLoader::new(schema).load_path("config.toml").into_result()?;
//!
//! init_from_configuration(&config)?;
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, init_logging, logging_rules, LogConfig};

use lodestar_config::Configuration;

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Reads the `logging` section of `config` and installs the subscriber.
///
/// # Errors
///
/// Returns `TelemetryError` if the settings are invalid or a global
/// subscriber is already installed.
pub fn init_from_configuration(config: &Configuration) -> TelemetryResult<LogConfig> {
    let log_config = LogConfig::from_configuration(config)?;
    init_logging(&log_config)?;
    Ok(log_config)
}
