//! Document reader.
//!
//! Turns the bytes of a [`ByteSource`] into a [`RawValue`] tree. JSON and TOML
//! are both driven through the same [`DeserializeSeed`], which records
//! duplicate object keys (last one wins) and picks integer or float
//! representation from the literal itself.

use std::fmt;
use std::sync::Arc;

use serde::de::{self, DeserializeSeed, MapAccess, SeqAccess, Unexpected, Visitor};

use crate::{ByteSource, DocumentFormat, Event, EventReporter, LoadFailure, ObjectMap, RawValue, ReadFailure};

/// Key toml uses to smuggle datetimes through serde.
const TOML_DATETIME_KEY: &str = "$__toml_private_datetime";

/// A successfully parsed document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// The parsed tree.
    pub value: RawValue,
    /// Paths of object keys that appeared more than once, in discovery order.
    pub duplicate_keys: Vec<String>,
}

/// Parses `bytes` as a document of the given format.
///
/// Never panics on malformed input; every fault becomes a [`ReadFailure`].
///
/// # Example
///
/// ```
/// use lodestar_config::{parse_document, DocumentFormat, RawValue};
///
/// let doc = parse_document(br#"{"port": 80, "port": 8080}"#, DocumentFormat::Json).unwrap();
/// assert_eq!(doc.duplicate_keys, vec!["port".to_string()]);
/// assert_eq!(
///     doc.value.as_object().unwrap().get("port"),
///     Some(&RawValue::Integer(8080))
/// );
/// ```
pub fn parse_document(bytes: &[u8], format: DocumentFormat) -> Result<Document, ReadFailure> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(ReadFailure::EmptyInput);
    }

    match format {
        DocumentFormat::Json => parse_json(bytes),
        DocumentFormat::Toml => parse_toml(bytes),
    }
}

fn parse_json(bytes: &[u8]) -> Result<Document, ReadFailure> {
    let mut duplicate_keys = Vec::new();
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);

    let value = RawValueSeed::root(&mut duplicate_keys)
        .deserialize(&mut deserializer)
        .and_then(|value| deserializer.end().map(|()| value))
        .map_err(|e| json_failure(&e))?;

    Ok(Document {
        value,
        duplicate_keys,
    })
}

fn parse_toml(bytes: &[u8]) -> Result<Document, ReadFailure> {
    let text = std::str::from_utf8(bytes).map_err(|e| {
        let (line, column) = line_column(bytes, e.valid_up_to());
        ReadFailure::malformed(line, column, "invalid UTF-8 sequence")
    })?;

    let mut duplicate_keys = Vec::new();
    let value = RawValueSeed::root(&mut duplicate_keys)
        .deserialize(toml::Deserializer::new(text))
        .map_err(|e| toml_failure(text, &e))?;

    Ok(Document {
        value,
        duplicate_keys,
    })
}

fn json_failure(err: &serde_json::Error) -> ReadFailure {
    // serde_json appends " at line L column C" to its message
    let text = err.to_string();
    let detail = text
        .rsplit_once(" at line ")
        .map_or(text.as_str(), |(head, _)| head);
    ReadFailure::malformed(err.line(), err.column(), detail)
}

fn toml_failure(text: &str, err: &toml::de::Error) -> ReadFailure {
    let offset = err.span().map_or(0, |span| span.start);
    let (line, column) = line_column(text.as_bytes(), offset);
    ReadFailure::malformed(line, column, err.message().trim())
}

/// 1-based line and column of a byte offset.
fn line_column(bytes: &[u8], offset: usize) -> (usize, usize) {
    let head = &bytes[..offset.min(bytes.len())];
    let line = head.iter().filter(|b| **b == b'\n').count() + 1;
    let line_start = head.iter().rposition(|b| *b == b'\n').map_or(0, |i| i + 1);
    (line, offset.min(bytes.len()) - line_start + 1)
}

/// Reads documents from byte sources and reports each attempt.
///
/// Every call to [`read`](Self::read) emits `LoadAttempted`, one `DuplicateKey`
/// per repeated key, and `LoadFailed` if the document could not be parsed.
#[derive(Clone)]
pub struct DocumentReader {
    reporter: Arc<dyn EventReporter>,
}

impl fmt::Debug for DocumentReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentReader").finish_non_exhaustive()
    }
}

impl DocumentReader {
    /// Creates a reader reporting to `reporter`.
    pub fn new(reporter: Arc<dyn EventReporter>) -> Self {
        Self { reporter }
    }

    /// Reads and parses one document.
    pub fn read(&self, source: &dyn ByteSource) -> Result<RawValue, ReadFailure> {
        let name = source.name();
        self.reporter.report(&Event::LoadAttempted {
            source: name.clone(),
        });

        let parsed = source
            .read_bytes()
            .and_then(|bytes| parse_document(&bytes, source.format()));

        match parsed {
            Ok(document) => {
                for path in document.duplicate_keys {
                    self.reporter.report(&Event::DuplicateKey {
                        source: name.clone(),
                        path,
                    });
                }
                Ok(document.value)
            }
            Err(failure) => {
                self.reporter.report(&Event::LoadFailed {
                    source: name,
                    failure: LoadFailure::Read(failure.clone()),
                });
                Err(failure)
            }
        }
    }
}

/// Builds a [`RawValue`] from any self-describing deserializer.
struct RawValueSeed<'a> {
    path: String,
    duplicate_keys: &'a mut Vec<String>,
}

impl<'a> RawValueSeed<'a> {
    fn root(duplicate_keys: &'a mut Vec<String>) -> Self {
        Self {
            path: String::new(),
            duplicate_keys,
        }
    }
}

fn child_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

impl<'de> DeserializeSeed<'de> for RawValueSeed<'_> {
    type Value = RawValue;

    fn deserialize<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        deserializer.deserialize_any(self)
    }
}

impl<'de> Visitor<'de> for RawValueSeed<'_> {
    type Value = RawValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a configuration value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<RawValue, E> {
        Ok(RawValue::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<RawValue, E> {
        Ok(RawValue::Integer(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<RawValue, E> {
        i64::try_from(v)
            .map(RawValue::Integer)
            .map_err(|_| E::invalid_value(Unexpected::Unsigned(v), &"a 64-bit signed integer"))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<RawValue, E> {
        Ok(RawValue::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<RawValue, E> {
        Ok(RawValue::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<RawValue, E> {
        Ok(RawValue::String(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<RawValue, E> {
        Ok(RawValue::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<RawValue, E> {
        Ok(RawValue::Null)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<RawValue, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        self.deserialize(deserializer)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<RawValue, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let Self {
            path,
            duplicate_keys,
        } = self;
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));

        loop {
            let seed = RawValueSeed {
                path: format!("{path}[{}]", items.len()),
                duplicate_keys: &mut *duplicate_keys,
            };
            match seq.next_element_seed(seed)? {
                Some(item) => items.push(item),
                None => break,
            }
        }

        Ok(RawValue::Array(items))
    }

    fn visit_map<A>(self, mut map: A) -> Result<RawValue, A::Error>
    where
        A: MapAccess<'de>,
    {
        let Self {
            path,
            duplicate_keys,
        } = self;
        let mut object = ObjectMap::new();

        while let Some(key) = map.next_key::<String>()? {
            let child = child_path(&path, &key);
            let value = map.next_value_seed(RawValueSeed {
                path: child.clone(),
                duplicate_keys: &mut *duplicate_keys,
            })?;
            if object.insert(key, value).is_some() {
                duplicate_keys.push(child);
            }
        }

        if object.len() == 1 {
            if let Some(RawValue::String(datetime)) = object.get(TOML_DATETIME_KEY) {
                return Ok(RawValue::String(datetime.clone()));
            }
        }

        Ok(RawValue::Object(object))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CapturingReporter, EventKind, MemorySource};

    fn json(text: &str) -> Result<Document, ReadFailure> {
        parse_document(text.as_bytes(), DocumentFormat::Json)
    }

    fn field<'a>(doc: &'a Document, key: &str) -> &'a RawValue {
        doc.value.as_object().unwrap().get(key).unwrap()
    }

    #[test]
    fn test_nested_json() {
        let doc = json(r#"{"server": {"port": 8080, "hosts": ["a", "b"], "tls": null}}"#).unwrap();
        let server = field(&doc, "server").as_object().unwrap();
        assert_eq!(server.get("port"), Some(&RawValue::Integer(8080)));
        assert_eq!(
            server.get("hosts"),
            Some(&RawValue::Array(vec![RawValue::from("a"), RawValue::from("b")]))
        );
        assert_eq!(server.get("tls"), Some(&RawValue::Null));
        assert!(doc.duplicate_keys.is_empty());
    }

    #[test]
    fn test_integer_versus_float() {
        let doc = json(r#"{"a": 1, "b": 1.0, "c": 1e3, "d": -42}"#).unwrap();
        assert_eq!(field(&doc, "a"), &RawValue::Integer(1));
        assert_eq!(field(&doc, "b"), &RawValue::Float(1.0));
        assert_eq!(field(&doc, "c"), &RawValue::Float(1000.0));
        assert_eq!(field(&doc, "d"), &RawValue::Integer(-42));
    }

    #[test]
    fn test_integer_out_of_range_is_malformed() {
        let result = json(r#"{"big": 18446744073709551615}"#);
        assert!(matches!(result, Err(ReadFailure::MalformedSyntax { .. })));
    }

    #[test]
    fn test_whitespace_is_insignificant() {
        let compact = json(r#"{"a":[1,2],"b":{"c":true}}"#).unwrap();
        let spaced = json("\n  {\n \"a\" : [ 1 , 2 ] ,\n\t\"b\" : { \"c\" : true } }\n").unwrap();
        assert_eq!(compact, spaced);
    }

    #[test]
    fn test_duplicate_keys_last_wins() {
        let doc = json(r#"{"a": 1, "nested": {"x": 1, "x": 2}, "a": "two"}"#).unwrap();
        assert_eq!(field(&doc, "a"), &RawValue::from("two"));
        assert_eq!(
            field(&doc, "nested").as_object().unwrap().get("x"),
            Some(&RawValue::Integer(2))
        );
        assert_eq!(doc.duplicate_keys, vec!["nested.x".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_duplicate_key_path_inside_array() {
        let doc = json(r#"{"items": [{"k": 1, "k": 2}]}"#).unwrap();
        assert_eq!(doc.duplicate_keys, vec!["items[0].k".to_string()]);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(json(""), Err(ReadFailure::EmptyInput));
        assert_eq!(json("  \n\t "), Err(ReadFailure::EmptyInput));
        assert_eq!(
            parse_document(b"\n", DocumentFormat::Toml),
            Err(ReadFailure::EmptyInput)
        );
    }

    #[test]
    fn test_missing_value_is_malformed() {
        match json(r#"{"a": }"#) {
            Err(ReadFailure::MalformedSyntax {
                line,
                column,
                detail,
            }) => {
                assert_eq!(line, 1);
                assert!(column > 0);
                assert!(!detail.is_empty());
                assert!(!detail.contains(" at line "));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_malformed_position_on_later_line() {
        match json("{\n  \"a\": 1,\n  \"b\": [1, 2\n}") {
            Err(ReadFailure::MalformedSyntax { line, .. }) => assert_eq!(line, 4),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_trailing_garbage_is_malformed() {
        assert!(matches!(
            json(r#"{"a": 1} extra"#),
            Err(ReadFailure::MalformedSyntax { .. })
        ));
    }

    #[test]
    fn test_toml_document() {
        let text = r#"
            [server]
            port = 8080
            ratio = 0.5
            hosts = ["a", "b"]
            started = 1979-05-27T07:32:00Z
        "#;
        let doc = parse_document(text.as_bytes(), DocumentFormat::Toml).unwrap();
        let server = field(&doc, "server").as_object().unwrap();
        assert_eq!(server.get("port"), Some(&RawValue::Integer(8080)));
        assert_eq!(server.get("ratio"), Some(&RawValue::Float(0.5)));
        assert_eq!(server.get("started").map(RawValue::kind), Some(crate::ValueKind::String));
    }

    #[test]
    fn test_toml_syntax_error_position() {
        let text = "[server]\nport = \n";
        match parse_document(text.as_bytes(), DocumentFormat::Toml) {
            Err(ReadFailure::MalformedSyntax { line, detail, .. }) => {
                assert_eq!(line, 2);
                assert!(!detail.is_empty());
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_toml_invalid_utf8() {
        let bytes = b"name = \"ok\"\nbad = \"\xff\"";
        match parse_document(bytes, DocumentFormat::Toml) {
            Err(ReadFailure::MalformedSyntax { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_line_column() {
        assert_eq!(line_column(b"abc", 0), (1, 1));
        assert_eq!(line_column(b"ab\ncd", 4), (2, 2));
        assert_eq!(line_column(b"ab", 99), (1, 3));
    }

    #[test]
    fn test_reader_reports_attempt_and_duplicates() {
        let reporter = Arc::new(CapturingReporter::new());
        let reader = DocumentReader::new(reporter.clone());

        let value = reader
            .read(&MemorySource::json("dup.json", r#"{"a": 1, "a": 2}"#))
            .unwrap();

        assert_eq!(value.as_object().unwrap().get("a"), Some(&RawValue::Integer(2)));
        assert_eq!(
            reporter.kinds(),
            vec![EventKind::LoadAttempted, EventKind::DuplicateKey]
        );
    }

    #[test]
    fn test_reader_reports_read_failure() {
        let reporter = Arc::new(CapturingReporter::new());
        let reader = DocumentReader::new(reporter.clone());

        let err = reader.read(&MemorySource::json("empty.json", "")).unwrap_err();

        assert_eq!(err, ReadFailure::EmptyInput);
        assert_eq!(
            reporter.events().last(),
            Some(&Event::LoadFailed {
                source: "empty.json".to_string(),
                failure: LoadFailure::Read(ReadFailure::EmptyInput),
            })
        );
    }
}
