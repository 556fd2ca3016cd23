//! Validated configuration and its typed accessors.

use std::fmt;
use std::sync::Arc;

use crate::value::{self, Resolution};
use crate::{AccessError, Event, EventReporter, ObjectMap, RawValue, ValueKind};

/// A document that passed schema validation.
///
/// Only [`Schema::validate`](crate::Schema::validate) (and therefore the
/// loader) can build one, and nothing can mutate it afterwards. Holding a
/// `Configuration` is the proof that a valid configuration was loaded.
///
/// Accessors return the caller's default when a field is absent and an
/// [`AccessError`] when the stored value has another type. Mismatches are
/// also reported as `AccessorTypeMismatch` events.
///
/// # Example
///
/// ```
/// use lodestar_config::{ConfigLoader, FieldRule, MemorySource, Schema, ValueKind};
///
/// let schema = Schema::new([
///     FieldRule::required("server.host", ValueKind::String),
///     FieldRule::optional("server.port", ValueKind::Integer).with_default(8080),
/// ]);
/// let source = MemorySource::json("inline", r#"{"server": {"host": "0.0.0.0"}}"#);
///
/// let config = ConfigLoader::new(schema).load_source(&source).into_result().unwrap();
/// assert_eq!(config.get_string("server.host", "localhost"), Ok("0.0.0.0"));
/// assert_eq!(config.get_int("server.port", 0), Ok(8080));
/// assert!(config.get_bool("server.host", false).is_err());
/// ```
#[derive(Clone)]
pub struct Configuration {
    root: ObjectMap,
    defaulted: Vec<String>,
    reporter: Arc<dyn EventReporter>,
}

impl Configuration {
    pub(crate) fn new(
        root: ObjectMap,
        defaulted: Vec<String>,
        reporter: Arc<dyn EventReporter>,
    ) -> Self {
        Self {
            root,
            defaulted,
            reporter,
        }
    }

    /// The whole validated tree.
    pub fn root(&self) -> &ObjectMap {
        &self.root
    }

    /// Paths that were filled from schema defaults, in rule order.
    pub fn defaulted_paths(&self) -> &[String] {
        &self.defaulted
    }

    /// Returns the raw node at `path`, if present.
    pub fn get(&self, path: &str) -> Option<&RawValue> {
        match value::resolve(&self.root, path) {
            Resolution::Found(found) => Some(found),
            Resolution::Absent | Resolution::Blocked { .. } => None,
        }
    }

    /// Whether `path` holds a value.
    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Reads a string.
    pub fn get_string<'a>(&'a self, path: &str, default: &'a str) -> Result<&'a str, AccessError> {
        self.typed(path, ValueKind::String, default, |v| match v {
            RawValue::String(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// Reads an integer.
    pub fn get_int(&self, path: &str, default: i64) -> Result<i64, AccessError> {
        self.typed(path, ValueKind::Integer, default, |v| match v {
            RawValue::Integer(n) => Some(*n),
            _ => None,
        })
    }

    /// Reads a float. Integer values are widened.
    pub fn get_float(&self, path: &str, default: f64) -> Result<f64, AccessError> {
        self.typed(path, ValueKind::Float, default, |v| match v {
            RawValue::Float(n) => Some(*n),
            RawValue::Integer(n) => Some(*n as f64),
            _ => None,
        })
    }

    /// Reads a boolean.
    pub fn get_bool(&self, path: &str, default: bool) -> Result<bool, AccessError> {
        self.typed(path, ValueKind::Boolean, default, |v| match v {
            RawValue::Bool(b) => Some(*b),
            _ => None,
        })
    }

    /// Reads a nested object.
    pub fn get_object<'a>(
        &'a self,
        path: &str,
        default: &'a ObjectMap,
    ) -> Result<&'a ObjectMap, AccessError> {
        self.typed(path, ValueKind::Object, default, |v| match v {
            RawValue::Object(map) => Some(map),
            _ => None,
        })
    }

    /// Reads a list.
    pub fn get_list<'a>(
        &'a self,
        path: &str,
        default: &'a [RawValue],
    ) -> Result<&'a [RawValue], AccessError> {
        self.typed(path, ValueKind::Array, default, |v| match v {
            RawValue::Array(items) => Some(items.as_slice()),
            _ => None,
        })
    }

    fn typed<'a, T>(
        &'a self,
        path: &str,
        requested: ValueKind,
        default: T,
        extract: impl FnOnce(&'a RawValue) -> Option<T>,
    ) -> Result<T, AccessError> {
        match value::resolve(&self.root, path) {
            Resolution::Found(found) => {
                extract(found).ok_or_else(|| self.mismatch(path.to_string(), requested, found.kind()))
            }
            Resolution::Absent => Ok(default),
            // Asking for a child of a scalar
            Resolution::Blocked { at, kind } => Err(self.mismatch(at, ValueKind::Object, kind)),
        }
    }

    fn mismatch(&self, path: String, requested: ValueKind, actual: ValueKind) -> AccessError {
        let error = AccessError::TypeMismatch {
            path,
            requested,
            actual,
        };
        self.reporter.report(&Event::AccessorTypeMismatch {
            error: error.clone(),
        });
        error
    }
}

impl PartialEq for Configuration {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("root", &self.root)
            .field("defaulted", &self.defaulted)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CapturingReporter, EventKind, FieldRule, Schema};
    use std::thread;

    fn sample(reporter: Arc<CapturingReporter>) -> Configuration {
        let mut server = ObjectMap::new();
        server.insert("host".to_string(), RawValue::from("0.0.0.0"));
        server.insert("port".to_string(), RawValue::Integer(8080));
        server.insert("ratio".to_string(), RawValue::Float(0.25));
        server.insert("http2".to_string(), RawValue::Bool(true));
        server.insert(
            "aliases".to_string(),
            RawValue::Array(vec![RawValue::from("api"), RawValue::from("www")]),
        );
        let mut root = ObjectMap::new();
        root.insert("server".to_string(), RawValue::Object(server));

        Schema::new([FieldRule::required("server", ValueKind::Object)])
            .validate(RawValue::Object(root), reporter)
            .unwrap()
    }

    #[test]
    fn test_typed_reads() {
        let config = sample(Arc::new(CapturingReporter::new()));
        assert_eq!(config.get_string("server.host", ""), Ok("0.0.0.0"));
        assert_eq!(config.get_int("server.port", 0), Ok(8080));
        assert_eq!(config.get_float("server.ratio", 0.0), Ok(0.25));
        assert_eq!(config.get_float("server.port", 0.0), Ok(8080.0));
        assert_eq!(config.get_bool("server.http2", false), Ok(true));
        assert_eq!(
            config.get_list("server.aliases", &[]),
            Ok(&[RawValue::from("api"), RawValue::from("www")][..])
        );
        let empty = ObjectMap::new();
        assert_eq!(config.get_object("server", &empty).map(ObjectMap::len), Ok(5));
    }

    #[test]
    fn test_absent_fields_return_default() {
        let reporter = Arc::new(CapturingReporter::new());
        let config = sample(reporter.clone());
        let fallback = ObjectMap::new();

        assert_eq!(config.get_string("server.name", "api"), Ok("api"));
        assert_eq!(config.get_int("server.workers", 4), Ok(4));
        assert_eq!(config.get_bool("features.beta", false), Ok(false));
        assert_eq!(config.get_list("server.routes", &[]), Ok(&[][..]));
        assert!(config.get_object("database", &fallback).unwrap().is_empty());
        assert!(reporter.events().is_empty());
    }

    #[test]
    fn test_type_mismatch_is_returned_and_reported() {
        let reporter = Arc::new(CapturingReporter::new());
        let config = sample(reporter.clone());

        let err = config.get_bool("server.port", false).unwrap_err();
        assert_eq!(
            err,
            AccessError::TypeMismatch {
                path: "server.port".to_string(),
                requested: ValueKind::Boolean,
                actual: ValueKind::Integer,
            }
        );
        assert_eq!(
            reporter.events(),
            vec![Event::AccessorTypeMismatch { error: err }]
        );
    }

    #[test]
    fn test_int_accessor_rejects_float() {
        let config = sample(Arc::new(CapturingReporter::new()));
        assert!(config.get_int("server.ratio", 0).is_err());
    }

    #[test]
    fn test_child_of_scalar_is_mismatch() {
        let reporter = Arc::new(CapturingReporter::new());
        let config = sample(reporter.clone());

        let err = config.get_int("server.port.value", 1).unwrap_err();
        assert_eq!(
            err,
            AccessError::TypeMismatch {
                path: "server.port".to_string(),
                requested: ValueKind::Object,
                actual: ValueKind::Integer,
            }
        );
        assert_eq!(reporter.kinds(), vec![EventKind::AccessorTypeMismatch]);
    }

    #[test]
    fn test_get_and_contains() {
        let config = sample(Arc::new(CapturingReporter::new()));
        assert_eq!(config.get("server.port"), Some(&RawValue::Integer(8080)));
        assert!(config.contains("server.http2"));
        assert!(!config.contains("server.port.value"));
        assert!(config.root().contains_key("server"));
    }

    #[test]
    fn test_equality_ignores_reporter() {
        let a = sample(Arc::new(CapturingReporter::new()));
        let b = sample(Arc::new(CapturingReporter::new()));
        assert_eq!(a, b);
    }

    #[test]
    fn test_shared_across_threads() {
        let config = Arc::new(sample(Arc::new(CapturingReporter::new())));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let config = Arc::clone(&config);
                thread::spawn(move || config.get_int("server.port", 0))
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), Ok(8080));
        }
    }
}
