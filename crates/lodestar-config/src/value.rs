//! Untyped document tree.
//!
//! Every configuration document, whatever its on-disk format, is parsed into a
//! [`RawValue`] tree before schema validation. Objects keep document order.

use std::fmt;

use indexmap::IndexMap;

/// Mapping used for object nodes.
pub type ObjectMap = IndexMap<String, RawValue>;

/// A parsed, not yet validated, document node.
///
/// # Example
///
/// ```
/// use lodestar_config::{RawValue, ValueKind};
///
/// let value = RawValue::from(8080);
/// assert_eq!(value.kind(), ValueKind::Integer);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// Explicit null.
    Null,
    /// Boolean literal.
    Bool(bool),
    /// Numeric literal without a decimal point or exponent.
    Integer(i64),
    /// Numeric literal with a decimal point or exponent.
    Float(f64),
    /// String literal.
    String(String),
    /// Ordered list of nodes.
    Array(Vec<RawValue>),
    /// Key/value mapping.
    Object(ObjectMap),
}

/// The tag of a [`RawValue`], used by rules and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// `null`
    Null,
    /// `true` / `false`
    Boolean,
    /// 64-bit signed integer.
    Integer,
    /// 64-bit float.
    Float,
    /// UTF-8 string.
    String,
    /// List.
    Array,
    /// Mapping.
    Object,
}

impl ValueKind {
    /// Lowercase name used in messages and log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
        }
    }

    /// Whether a value of kind `actual` satisfies a rule expecting `self`.
    ///
    /// Integers are accepted where floats are expected.
    #[must_use]
    pub fn accepts(self, actual: ValueKind) -> bool {
        self == actual || (self == Self::Float && actual == Self::Integer)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl RawValue {
    /// Returns the tag of this node.
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Null,
            Self::Bool(_) => ValueKind::Boolean,
            Self::Integer(_) => ValueKind::Integer,
            Self::Float(_) => ValueKind::Float,
            Self::String(_) => ValueKind::String,
            Self::Array(_) => ValueKind::Array,
            Self::Object(_) => ValueKind::Object,
        }
    }

    /// Returns the object map if this node is an object.
    #[must_use]
    pub fn as_object(&self) -> Option<&ObjectMap> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }
}

/// Result of descending a path one key segment at a time.
#[derive(Debug, PartialEq)]
pub(crate) enum Resolution<'a> {
    Found(&'a RawValue),
    /// Some segment is missing and every node on the way was an object.
    Absent,
    /// An intermediate segment holds a non-object.
    Blocked { at: String, kind: ValueKind },
}

/// Resolves a dot-delimited path by descending one key segment at a time.
pub(crate) fn resolve<'a>(root: &'a ObjectMap, path: &str) -> Resolution<'a> {
    let segments: Vec<&str> = path.split('.').collect();
    let Some((leaf, parents)) = segments.split_last() else {
        return Resolution::Absent;
    };

    let mut map = root;
    for (idx, segment) in parents.iter().enumerate() {
        match map.get(*segment) {
            Some(RawValue::Object(next)) => map = next,
            Some(other) => {
                return Resolution::Blocked {
                    at: segments[..=idx].join("."),
                    kind: other.kind(),
                }
            }
            None => return Resolution::Absent,
        }
    }

    map.get(*leaf).map_or(Resolution::Absent, Resolution::Found)
}

/// Inserts `value` at `path`, creating intermediate objects.
///
/// Returns `false` without modifying anything if an intermediate segment
/// holds a non-object value.
pub(crate) fn insert(root: &mut ObjectMap, path: &str, value: RawValue) -> bool {
    let segments: Vec<&str> = path.split('.').collect();
    let Some((leaf, parents)) = segments.split_last() else {
        return false;
    };

    let mut map = root;
    for segment in parents {
        let entry = map
            .entry((*segment).to_string())
            .or_insert_with(|| RawValue::Object(ObjectMap::new()));
        match entry {
            RawValue::Object(next) => map = next,
            _ => return false,
        }
    }

    map.insert((*leaf).to_string(), value);
    true
}

impl From<bool> for RawValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for RawValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<RawValue>> for RawValue {
    fn from(value: Vec<RawValue>) -> Self {
        Self::Array(value)
    }
}

impl From<ObjectMap> for RawValue {
    fn from(value: ObjectMap) -> Self {
        Self::Object(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> ObjectMap {
        let mut server = ObjectMap::new();
        server.insert("port".to_string(), RawValue::Integer(8080));
        server.insert("name".to_string(), RawValue::from("api"));
        let mut root = ObjectMap::new();
        root.insert("server".to_string(), RawValue::Object(server));
        root.insert("mode".to_string(), RawValue::from("prod"));
        root
    }

    #[test]
    fn test_resolve_found() {
        let root = tree();
        assert_eq!(
            resolve(&root, "server.port"),
            Resolution::Found(&RawValue::Integer(8080))
        );
        assert_eq!(resolve(&root, "mode"), Resolution::Found(&RawValue::from("prod")));
    }

    #[test]
    fn test_resolve_missing_intermediate_is_absent() {
        let root = tree();
        assert_eq!(resolve(&root, "database.url"), Resolution::Absent);
        assert_eq!(resolve(&root, "server.tls.cert"), Resolution::Absent);
    }

    #[test]
    fn test_resolve_through_scalar_is_blocked() {
        let root = tree();
        assert_eq!(
            resolve(&root, "mode.level"),
            Resolution::Blocked {
                at: "mode".to_string(),
                kind: ValueKind::String,
            }
        );
        assert_eq!(
            resolve(&root, "server.port.number"),
            Resolution::Blocked {
                at: "server.port".to_string(),
                kind: ValueKind::Integer,
            }
        );
    }

    #[test]
    fn test_insert_creates_parents() {
        let mut root = tree();
        assert!(insert(&mut root, "database.pool.size", RawValue::Integer(4)));
        assert_eq!(
            resolve(&root, "database.pool.size"),
            Resolution::Found(&RawValue::Integer(4))
        );
    }

    #[test]
    fn test_insert_overwrites_leaf() {
        let mut root = tree();
        assert!(insert(&mut root, "server.port", RawValue::Integer(9090)));
        assert_eq!(
            resolve(&root, "server.port"),
            Resolution::Found(&RawValue::Integer(9090))
        );
    }

    #[test]
    fn test_insert_refuses_scalar_parent() {
        let mut root = tree();
        assert!(!insert(&mut root, "mode.level", RawValue::Integer(1)));
        assert_eq!(root, tree());
    }

    #[test]
    fn test_float_accepts_integer() {
        assert!(ValueKind::Float.accepts(ValueKind::Integer));
        assert!(!ValueKind::Integer.accepts(ValueKind::Float));
        assert!(!ValueKind::String.accepts(ValueKind::Null));
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(RawValue::Null.kind().to_string(), "null");
        assert_eq!(RawValue::from(1.5).kind().to_string(), "float");
        assert_eq!(RawValue::Array(vec![]).kind().as_str(), "array");
    }
}
