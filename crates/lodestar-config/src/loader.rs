//! Top-level configuration loading.
//!
//! [`ConfigLoader`] runs one load synchronously: read the document, apply
//! environment overrides, validate against the schema, and wrap the result.
//! Every call returns a [`LoadOutcome`]; nothing is cached between calls.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::value::{self, Resolution};
use crate::{
    ByteSource, Configuration, DocumentFormat, DocumentReader, Event, EventReporter, FieldRule,
    FileSource, LoadFailure, MemorySource, ObjectMap, RawValue, ReadFailure, Schema, TracingReporter,
    ValidationError, ValueKind,
};

/// Result of one load attempt.
///
/// # Example
///
/// ```
/// use lodestar_config::{ConfigLoader, LoadOutcome, Schema};
///
/// match ConfigLoader::new(Schema::default()).load_path("/nonexistent/app.json") {
///     LoadOutcome::Success(_) => unreachable!(),
///     LoadOutcome::ReadFailure(failure) => println!("cannot read: {failure}"),
///     LoadOutcome::ValidationFailure(errors) => println!("{} problems", errors.len()),
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub enum LoadOutcome {
    /// A validated configuration.
    Success(Configuration),
    /// The document could not be read or parsed.
    ReadFailure(ReadFailure),
    /// The document violated the schema; every violation is listed.
    ValidationFailure(Vec<ValidationError>),
}

impl LoadOutcome {
    /// Whether a configuration was produced.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The configuration, if the load succeeded.
    pub fn configuration(&self) -> Option<&Configuration> {
        match self {
            Self::Success(config) => Some(config),
            _ => None,
        }
    }

    /// The failure detail, if the load failed.
    pub fn failure(&self) -> Option<LoadFailure> {
        match self {
            Self::Success(_) => None,
            Self::ReadFailure(failure) => Some(LoadFailure::Read(failure.clone())),
            Self::ValidationFailure(errors) => Some(LoadFailure::Validation(errors.clone())),
        }
    }

    /// Converts into a `Result` for `?`-style handling.
    pub fn into_result(self) -> Result<Configuration, LoadFailure> {
        match self {
            Self::Success(config) => Ok(config),
            Self::ReadFailure(failure) => Err(LoadFailure::Read(failure)),
            Self::ValidationFailure(errors) => Err(LoadFailure::Validation(errors)),
        }
    }
}

/// Loads and validates configuration documents against one schema.
///
/// Environment overrides use the format `PREFIX__SECTION__KEY` and only touch
/// paths the schema declares. For example, with prefix `APP` and a rule for
/// `server.port`, `APP__SERVER__PORT=9000` replaces the document's value.
///
/// # Example
///
/// ```
/// use lodestar_config::{ConfigLoader, FieldRule, MemorySource, Schema, ValueKind};
///
/// let schema = Schema::new([FieldRule::required("server.port", ValueKind::Integer)]);
/// let loader = ConfigLoader::new(schema)
///     .with_env_vars("APP", [("APP__SERVER__PORT", "9000")]);
///
/// let config = loader
///     .load_source(&MemorySource::json("inline", r#"{"server": {"port": 80}}"#))
///     .into_result()
///     .unwrap();
/// assert_eq!(config.get_int("server.port", 0), Ok(9000));
/// ```
#[derive(Clone)]
pub struct ConfigLoader {
    schema: Arc<Schema>,
    reporter: Arc<dyn EventReporter>,
    env: Option<EnvOverrides>,
}

#[derive(Debug, Clone)]
enum EnvOverrides {
    /// Read the process environment at load time.
    Process { prefix: String },
    /// Fixed variables.
    Fixed {
        prefix: String,
        vars: HashMap<String, String>,
    },
}

impl fmt::Debug for ConfigLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigLoader")
            .field("schema", &self.schema)
            .field("env", &self.env)
            .finish_non_exhaustive()
    }
}

impl ConfigLoader {
    /// Create a new loader reporting through [`TracingReporter`].
    pub fn new(schema: impl Into<Arc<Schema>>) -> Self {
        Self {
            schema: schema.into(),
            reporter: Arc::new(TracingReporter),
            env: None,
        }
    }

    /// Replaces the event reporter.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn EventReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Enables overrides from the process environment.
    ///
    /// Keys are matched against rule paths ignoring case, so
    /// `APP__SERVER__HTTPPORT` overrides a rule for `server.httpPort`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env = Some(EnvOverrides::Process {
            prefix: prefix.to_uppercase(),
        });
        self
    }

    /// Enables overrides from a fixed set of variables instead of the
    /// process environment.
    #[must_use]
    pub fn with_env_vars<K, V>(mut self, prefix: &str, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.env = Some(EnvOverrides::Fixed {
            prefix: prefix.to_uppercase(),
            vars: vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        });
        self
    }

    /// Load a `.env` file into the process environment.
    ///
    /// A missing `.env` file is not an error.
    ///
    /// # Errors
    ///
    /// Returns the `dotenvy` error if the file exists but cannot be parsed.
    pub fn with_dotenv(self) -> Result<Self, dotenvy::Error> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(e),
        }
    }

    /// Load variables from the dotenv file at `path` into the process
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns the `dotenvy` error if the file is missing or cannot be parsed.
    pub fn with_dotenv_path(self, path: impl AsRef<Path>) -> Result<Self, dotenvy::Error> {
        dotenvy::from_path(path.as_ref())?;
        Ok(self)
    }

    /// The schema this loader validates against.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Loads a file. `.toml` files are parsed as TOML, anything else as JSON.
    pub fn load_path(&self, path: impl AsRef<Path>) -> LoadOutcome {
        self.load_source(&FileSource::new(path.as_ref()))
    }

    /// Loads the file named by environment variable `var`, or `fallback` if
    /// the variable is unset or empty.
    pub fn load_path_from_env(&self, var: &str, fallback: impl AsRef<Path>) -> LoadOutcome {
        let path = env::var_os(var)
            .filter(|value| !value.is_empty())
            .map_or_else(|| fallback.as_ref().to_path_buf(), PathBuf::from);
        self.load_path(path)
    }

    /// Loads in-memory content.
    pub fn load_str(&self, name: &str, content: &str, format: DocumentFormat) -> LoadOutcome {
        self.load_source(&MemorySource::new(name, format, content))
    }

    /// Loads from any byte source.
    pub fn load_source(&self, source: &dyn ByteSource) -> LoadOutcome {
        let reader = DocumentReader::new(Arc::clone(&self.reporter));
        let mut tree = match reader.read(source) {
            Ok(tree) => tree,
            // Already reported by the reader.
            Err(failure) => return LoadOutcome::ReadFailure(failure),
        };

        let faults = match (&self.env, &mut tree) {
            (Some(overrides), RawValue::Object(root)) => self.apply_env_overrides(overrides, root),
            _ => HashMap::new(),
        };

        let outcome = match self
            .schema
            .validate_with_faults(tree, &faults, Arc::clone(&self.reporter))
        {
            Ok(config) => LoadOutcome::Success(config),
            Err(errors) => LoadOutcome::ValidationFailure(errors),
        };

        let source = source.name();
        match &outcome {
            LoadOutcome::Success(config) => self.reporter.report(&Event::LoadSucceeded {
                source,
                defaulted: config.defaulted_paths().to_vec(),
            }),
            LoadOutcome::ValidationFailure(errors) => self.reporter.report(&Event::LoadFailed {
                source,
                failure: LoadFailure::Validation(errors.clone()),
            }),
            LoadOutcome::ReadFailure(_) => {}
        }

        outcome
    }

    /// Writes parsed overrides into `root` and returns the overrides that
    /// could not be applied, keyed by rule path.
    fn apply_env_overrides(
        &self,
        settings: &EnvOverrides,
        root: &mut ObjectMap,
    ) -> HashMap<String, ValidationError> {
        let (prefix, mut vars): (&str, Vec<(String, Option<String>)>) = match settings {
            // Keys that are not valid Unicode can never name a rule.
            EnvOverrides::Process { prefix } => (
                prefix.as_str(),
                env::vars_os()
                    .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok())))
                    .collect(),
            ),
            EnvOverrides::Fixed { prefix, vars } => (
                prefix.as_str(),
                vars.iter()
                    .map(|(k, v)| (k.clone(), Some(v.clone())))
                    .collect(),
            ),
        };
        // Deterministic regardless of environment iteration order.
        vars.sort();

        let mut planned: Vec<(&str, String, Result<RawValue, ValidationError>)> = Vec::new();
        for (key, raw) in vars {
            let Some(path) = override_path(&key, prefix) else {
                continue;
            };
            // Unknown key - ignore
            let Some(rule) = self.override_rule(&path) else {
                continue;
            };
            let parsed = match raw.as_deref() {
                Some(raw) => parse_override(raw, rule.kind()).ok_or_else(|| {
                    ValidationError::mismatch(rule.path(), rule.kind(), ValueKind::String)
                        .with_message(format!(
                            "environment override {key}: expected {}, got {raw:?}",
                            rule.kind()
                        ))
                }),
                None => Err(
                    ValidationError::mismatch(rule.path(), rule.kind(), ValueKind::String)
                        .with_message(format!("environment override {key} is not valid UTF-8")),
                ),
            };
            // A later key for the same rule replaces an earlier one.
            planned.retain(|(p, _, _)| *p != rule.path());
            planned.push((rule.path(), key, parsed));
        }

        let mut faults = HashMap::new();
        for (path, key, parsed) in planned {
            let fault = match parsed {
                Ok(parsed) => {
                    if value::insert(root, path, parsed) {
                        continue;
                    }
                    let (at, kind) = match value::resolve(root, path) {
                        Resolution::Blocked { at, kind } => (at, kind),
                        _ => (path.to_string(), ValueKind::Null),
                    };
                    ValidationError::mismatch(at, ValueKind::Object, kind).with_message(format!(
                        "environment override {key} cannot be placed under {kind}"
                    ))
                }
                Err(fault) => fault,
            };
            faults.insert(path.to_string(), fault);
        }

        faults
    }

    /// The last-declared rule whose path matches `path` ignoring case.
    fn override_rule(&self, path: &str) -> Option<&FieldRule> {
        self.schema
            .rules()
            .iter()
            .rev()
            .find(|rule| rule.path().to_lowercase() == path)
    }
}

/// Maps `PREFIX__SERVER__HTTP_PORT` to `server.http_port`.
fn override_path(key: &str, prefix: &str) -> Option<String> {
    let rest = key.strip_prefix(prefix)?.strip_prefix("__")?;
    if rest.is_empty() {
        return None;
    }
    Some(
        rest.split("__")
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join("."),
    )
}

/// Parses an override string according to the kind its rule expects.
fn parse_override(raw: &str, kind: ValueKind) -> Option<RawValue> {
    match kind {
        ValueKind::String => Some(RawValue::String(raw.to_string())),
        ValueKind::Integer => raw.trim().parse().ok().map(RawValue::Integer),
        ValueKind::Float => raw.trim().parse().ok().map(RawValue::Float),
        ValueKind::Boolean => parse_bool(raw).map(RawValue::Bool),
        ValueKind::Null => raw.trim().eq_ignore_ascii_case("null").then_some(RawValue::Null),
        ValueKind::Array | ValueKind::Object => {
            let document = crate::parse_document(raw.as_bytes(), DocumentFormat::Json).ok()?;
            (document.value.kind() == kind).then_some(document.value)
        }
    }
}

/// Parse a boolean from a string.
fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
