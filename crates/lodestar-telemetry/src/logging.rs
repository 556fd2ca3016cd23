//! Structured logging for Lodestar services.
//!
//! This module installs a `tracing-subscriber` pipeline that renders the
//! events emitted by `lodestar-config` (and the rest of the application).
//!
//! # Features
//!
//! - JSON-formatted or human-readable output
//! - Configurable log levels and `EnvFilter` directives
//! - Settings read from a validated [`Configuration`]
//!
//! # Example
//!
//! ```rust,ignore
//! use lodestar_telemetry::logging::{LogConfig, init_logging};
//!
//! let config = LogConfig::default();
//! init_logging(&config)?;
//!
//! tracing::info!(source = "config.toml", "Configuration load attempted");
//! ```

use crate::error::TelemetryError;
use crate::TelemetryResult;
use lodestar_config::{Configuration, FieldRule, ValueKind};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Configuration paths read by [`LogConfig::from_configuration`].
pub mod keys {
    /// Whether logging is enabled (boolean).
    pub const ENABLED: &str = "logging.enabled";

    /// Filter directive, e.g. `info` or `lodestar_config=debug` (string).
    pub const LEVEL: &str = "logging.level";

    /// Output format, `json` or `pretty` (string).
    pub const FORMAT: &str = "logging.format";

    /// Whether to include file/line info (boolean).
    pub const FILE_LINE_INFO: &str = "logging.file_line_info";

    /// Service name attached to log output (string).
    pub const SERVICE_NAME: &str = "logging.service_name";
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Whether logging is enabled.
    pub enabled: bool,

    /// Log level (e.g., "info", "debug", "warn").
    pub level: String,

    /// Whether to output JSON format.
    pub json_format: bool,

    /// Whether to include span events (enter, exit, close).
    pub span_events: bool,

    /// Whether to include file/line info.
    pub file_line_info: bool,

    /// Whether to include thread IDs.
    pub thread_ids: bool,

    /// Whether to include target (module path).
    pub include_target: bool,

    /// Service name for log fields.
    pub service_name: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            json_format: true, // JSON by default for production
            span_events: false,
            file_line_info: false,
            thread_ids: false,
            include_target: true,
            service_name: "lodestar".to_string(),
        }
    }
}

impl LogConfig {
    /// Creates a development configuration with human-readable output.
    #[must_use]
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            json_format: false,
            span_events: true,
            file_line_info: true,
            ..Self::default()
        }
    }

    /// Creates a production configuration with JSON output.
    #[must_use]
    pub fn production() -> Self {
        Self::default()
    }

    /// Reads logging settings from a validated configuration.
    ///
    /// Absent settings keep their [`Default`] values, so this works whether
    /// or not the schema included [`logging_rules`].
    ///
    /// # Errors
    ///
    /// Returns `TelemetryError::Access` if a setting has the wrong type and
    /// `TelemetryError::InvalidConfig` if the format is not `json` or `pretty`.
    pub fn from_configuration(config: &Configuration) -> TelemetryResult<Self> {
        let defaults = Self::default();

        let json_format = match config.get_string(keys::FORMAT, "json")? {
            "json" => true,
            "pretty" => false,
            other => {
                return Err(TelemetryError::InvalidConfig(format!(
                    "{} must be \"json\" or \"pretty\", got {other:?}",
                    keys::FORMAT
                )))
            }
        };

        Ok(Self {
            enabled: config.get_bool(keys::ENABLED, defaults.enabled)?,
            level: config.get_string(keys::LEVEL, &defaults.level)?.to_string(),
            json_format,
            file_line_info: config.get_bool(keys::FILE_LINE_INFO, defaults.file_line_info)?,
            service_name: config
                .get_string(keys::SERVICE_NAME, &defaults.service_name)?
                .to_string(),
            ..defaults
        })
    }
}

/// Schema rules for the `logging` section, with the same defaults as
/// [`LogConfig::default`].
///
/// # Example
///
/// ```
/// use lodestar_config::{FieldRule, Schema, ValueKind};
/// use lodestar_telemetry::logging_rules;
///
/// let schema = Schema::builder()
///     .rule(FieldRule::required("server.host", ValueKind::String))
///     .rules(logging_rules())
///     .build();
/// assert_eq!(schema.rules().len(), 6);
/// ```
#[must_use]
pub fn logging_rules() -> Vec<FieldRule> {
    let defaults = LogConfig::default();
    vec![
        FieldRule::optional(keys::ENABLED, ValueKind::Boolean).with_default(defaults.enabled),
        FieldRule::optional(keys::LEVEL, ValueKind::String).with_default(defaults.level),
        FieldRule::optional(keys::FORMAT, ValueKind::String).with_default("json"),
        FieldRule::optional(keys::FILE_LINE_INFO, ValueKind::Boolean)
            .with_default(defaults.file_line_info),
        FieldRule::optional(keys::SERVICE_NAME, ValueKind::String)
            .with_default(defaults.service_name),
    ]
}

/// Initializes the logging subsystem.
///
/// # Arguments
///
/// * `config` - Logging configuration
///
/// # Errors
///
/// Returns `TelemetryError::LoggingInit` if initialization fails.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    // Build env filter
    let filter = create_env_filter(&config.level)?;

    // Determine span events to capture
    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    if config.json_format {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_span_events(span_events)
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_thread_ids(config.thread_ids)
            .with_target(config.include_target)
            .with_filter(filter);

        tracing_subscriber::registry()
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_span_events(span_events)
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_thread_ids(config.thread_ids)
            .with_target(config.include_target)
            .with_filter(filter);

        tracing_subscriber::registry()
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    }

    tracing::debug!(
        service.name = %config.service_name,
        level = %config.level,
        json = config.json_format,
        "Logging initialized"
    );

    Ok(())
}

/// Creates an env filter from a string.
///
/// # Arguments
///
/// * `filter` - Filter string (e.g., "info", "lodestar_config=debug,warn")
///
/// # Errors
///
/// Returns error if the filter string is invalid.
pub fn create_env_filter(filter: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(filter)
        .map_err(|e| TelemetryError::LoggingInit(format!("Invalid log level: {e}")))
}
