//! Schema-validated configuration loading for Lodestar services.
//!
//! This crate turns a configuration document into a validated, read-only
//! [`Configuration`] with support for:
//! - JSON and TOML documents, from files or memory
//! - Declarative schemas of typed, required or defaulted fields
//! - Environment variable overrides for declared fields
//! - Reporting every violation of a document at once
//! - Structured events for every load and accessor mismatch
//!
//! # Overview
//!
//! A load runs in three steps:
//!
//! 1. [`DocumentReader`] reads a [`ByteSource`] and parses it into a
//!    [`RawValue`] tree.
//! 2. [`Schema::validate`] checks the tree against its [`FieldRule`]s,
//!    collecting every [`ValidationError`] and injecting defaults.
//! 3. [`ConfigLoader`] wraps the result in a [`LoadOutcome`].
//!
//! Every step reports through an [`EventReporter`]. The default,
//! [`TracingReporter`], forwards to the `tracing` facade.
//!
//! # Example
//!
//! ```no_run
//! use lodestar_config::{ConfigLoader, FieldRule, LoadFailure, Schema, ValueKind};
//!
//! # fn main() -> Result<(), LoadFailure> {
//! let schema = Schema::builder()
//!     .rule(FieldRule::required("server.host", ValueKind::String))
//!     .rule(FieldRule::optional("server.port", ValueKind::Integer).with_default(8080))
//!     .build();
//!
//! let config = ConfigLoader::new(schema)
//!     .with_env_prefix("LODESTAR")
//!     .load_path("config.toml")
//!     .into_result()?;
//!
//! let port = config.get_int("server.port", 8080).unwrap_or(8080);
//! println!("Listening on port {port}");
//! # Ok(())
//! # }
//! ```
//!
//! # Environment Variable Overrides
//!
//! Fields declared in the schema can be overridden via environment variables
//! using the format `PREFIX__SECTION__KEY`. For example:
//!
//! - `LODESTAR__SERVER__HOST=0.0.0.0`
//! - `LODESTAR__SERVER__PORT=9000`
//! - `LODESTAR__FEATURES__BETA=true`

#![warn(missing_docs)]

mod config;
mod error;
mod events;
mod loader;
mod reader;
mod schema;
mod source;
mod value;

pub use config::Configuration;
pub use error::{AccessError, LoadFailure, ReadFailure, ValidationError, Violation};
pub use events::{CapturingReporter, Event, EventKind, EventReporter, TracingReporter};
pub use loader::{ConfigLoader, LoadOutcome};
pub use reader::{parse_document, Document, DocumentReader};
pub use schema::{FieldRule, Schema, SchemaBuilder};
pub use source::{ByteSource, DocumentFormat, FileSource, MemorySource};
pub use value::{ObjectMap, RawValue, ValueKind};
