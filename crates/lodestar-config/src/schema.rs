//! Declarative field rules and the schema validator.
//!
//! A [`Schema`] is an ordered list of [`FieldRule`]s. Validation walks every
//! rule against the document and collects all violations in declaration order
//! rather than stopping at the first one.
//!
//! # Example
//!
//! ```
//! use lodestar_config::{FieldRule, Schema, ValueKind};
//!
//! let schema = Schema::builder()
//!     .rule(FieldRule::required("server.host", ValueKind::String))
//!     .rule(FieldRule::optional("server.port", ValueKind::Integer).with_default(8080))
//!     .rule(FieldRule::optional("server.tls", ValueKind::Boolean))
//!     .build();
//!
//! assert_eq!(schema.rules().len(), 3);
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use crate::value::{self, Resolution};
use crate::{Configuration, EventReporter, RawValue, ValidationError, ValueKind};

/// Constraint on one dot-delimited field path.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRule {
    path: String,
    kind: ValueKind,
    required: bool,
    default: Option<RawValue>,
}

impl FieldRule {
    /// A field that must be present (unless a default is attached).
    pub fn required(path: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            path: path.into(),
            kind,
            required: true,
            default: None,
        }
    }

    /// A field that may be absent.
    pub fn optional(path: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            path: path.into(),
            kind,
            required: false,
            default: None,
        }
    }

    /// Value injected when the field is absent.
    ///
    /// An absent field with a default is never an error, even on a required
    /// rule. A present field of the wrong kind still is.
    #[must_use]
    pub fn with_default(mut self, value: impl Into<RawValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// The field path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The expected kind.
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Whether absence is an error when there is no default.
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// The default value, if any.
    pub fn default_value(&self) -> Option<&RawValue> {
        self.default.as_ref()
    }
}

/// Ordered set of field rules for one configuration document.
///
/// Schemas are plain data; build one at startup (or in a `static`) and share
/// it between loads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    rules: Vec<FieldRule>,
}

/// Builder for [`Schema`].
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    rules: Vec<FieldRule>,
}

impl SchemaBuilder {
    /// Appends a rule.
    #[must_use]
    pub fn rule(mut self, rule: FieldRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Appends several rules.
    #[must_use]
    pub fn rules(mut self, rules: impl IntoIterator<Item = FieldRule>) -> Self {
        self.rules.extend(rules);
        self
    }

    /// Build the schema.
    #[must_use]
    pub fn build(self) -> Schema {
        Schema { rules: self.rules }
    }
}

impl Schema {
    /// Creates a schema from rules in declaration order.
    pub fn new(rules: impl IntoIterator<Item = FieldRule>) -> Self {
        Self {
            rules: rules.into_iter().collect(),
        }
    }

    /// Create a new schema builder.
    #[must_use]
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// The rules in declaration order.
    pub fn rules(&self) -> &[FieldRule] {
        &self.rules
    }

    /// Returns the last-declared rule for `path`.
    pub fn rule_for(&self, path: &str) -> Option<&FieldRule> {
        self.rules.iter().rev().find(|rule| rule.path == path)
    }

    /// Validates `tree` and wraps it into a [`Configuration`].
    ///
    /// Every rule is evaluated. On failure the errors are in rule-declaration
    /// order; on success absent fields with defaults have been filled in.
    /// The returned configuration reports accessor misuse to `reporter`.
    ///
    /// # Example
    ///
    /// ```
    /// use std::sync::Arc;
    /// use lodestar_config::{FieldRule, RawValue, Schema, TracingReporter, ValueKind};
    ///
    /// let schema = Schema::new([
    ///     FieldRule::optional("server.port", ValueKind::Integer).with_default(8080),
    /// ]);
    /// let tree = RawValue::Object(Default::default());
    ///
    /// let config = schema.validate(tree, Arc::new(TracingReporter)).unwrap();
    /// assert_eq!(config.get_int("server.port", 0), Ok(8080));
    /// ```
    pub fn validate(
        &self,
        tree: RawValue,
        reporter: Arc<dyn EventReporter>,
    ) -> Result<Configuration, Vec<ValidationError>> {
        self.validate_with_faults(tree, &HashMap::new(), reporter)
    }

    /// Like [`validate`](Self::validate), but a rule whose path has an entry
    /// in `faults` reports that error instead of being checked against the
    /// document. Each rule still yields at most one error.
    pub(crate) fn validate_with_faults(
        &self,
        tree: RawValue,
        faults: &HashMap<String, ValidationError>,
        reporter: Arc<dyn EventReporter>,
    ) -> Result<Configuration, Vec<ValidationError>> {
        let mut root = match tree {
            RawValue::Object(root) => root,
            other => {
                let kind = other.kind();
                return Err(vec![ValidationError::mismatch("$", ValueKind::Object, kind)
                    .with_message(format!("document root must be an object, got {kind}"))]);
            }
        };

        let mut errors = Vec::new();
        let mut injections: Vec<(&str, ValueKind, &RawValue)> = Vec::new();
        let mut first_kind: HashMap<&str, ValueKind> = HashMap::new();

        for rule in &self.rules {
            if let Some(first) = first_kind.get(rule.path.as_str()) {
                if *first != rule.kind {
                    errors.push(ValidationError::duplicate_rule(&rule.path, *first, rule.kind));
                }
            } else {
                first_kind.insert(&rule.path, rule.kind);
            }

            if let Some(fault) = faults.get(rule.path.as_str()) {
                errors.push(fault.clone());
                continue;
            }

            match value::resolve(&root, &rule.path) {
                Resolution::Found(found) => {
                    if !rule.kind.accepts(found.kind()) {
                        errors.push(ValidationError::mismatch(&rule.path, rule.kind, found.kind()));
                    }
                }
                Resolution::Absent => match &rule.default {
                    Some(default) if rule.kind.accepts(default.kind()) => {
                        injections.push((rule.path.as_str(), rule.kind, default));
                    }
                    Some(default) => errors.push(
                        ValidationError::mismatch(&rule.path, rule.kind, default.kind())
                            .with_message(format!(
                                "default value is {}, rule expects {}",
                                default.kind(),
                                rule.kind
                            )),
                    ),
                    None if rule.required => {
                        errors.push(ValidationError::missing(&rule.path, rule.kind));
                    }
                    None => {}
                },
                Resolution::Blocked { at, kind } => {
                    if rule.default.is_some() {
                        errors.push(
                            ValidationError::mismatch(at.as_str(), ValueKind::Object, kind)
                                .with_message(format!(
                                    "expected object to hold default for {}, got {kind}",
                                    rule.path
                                )),
                        );
                    } else if rule.required {
                        errors.push(
                            ValidationError::missing(&rule.path, rule.kind).with_message(format!(
                                "missing required field (expected {}); {at} is {kind}, not an object",
                                rule.kind
                            )),
                        );
                    }
                }
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        // Applied after resolution so later rules for a path overwrite earlier ones.
        for (path, _, default) in &injections {
            value::insert(&mut root, path, (*default).clone());
        }

        // A default for `a` can replace the object an earlier default for
        // `a.b` was placed in, and vice versa.
        let mut defaulted: Vec<String> = Vec::new();
        for (path, kind, _) in injections {
            match value::resolve(&root, path) {
                Resolution::Found(found) if kind.accepts(found.kind()) => {
                    if !defaulted.iter().any(|p| p == path) {
                        defaulted.push(path.to_string());
                    }
                }
                Resolution::Found(found) => {
                    errors.push(ValidationError::mismatch(path, kind, found.kind()));
                }
                Resolution::Blocked { at, kind: actual } => errors.push(
                    ValidationError::mismatch(at.as_str(), ValueKind::Object, actual).with_message(
                        format!("cannot place default for {path}: {at} is {actual}, not an object"),
                    ),
                ),
                Resolution::Absent => errors.push(ValidationError::missing(path, kind)),
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Configuration::new(root, defaulted, reporter))
    }
}
