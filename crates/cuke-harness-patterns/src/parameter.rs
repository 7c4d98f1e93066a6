//! Parameter types, their registry, and transformed step values.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::errors::ExpressionError;

/// A value handed to a step function for one matched expression argument.
///
/// Built-in parameter types produce the typed variants; the default
/// behaviour (no transformer) carries the raw matched text. Custom
/// transformers may smuggle arbitrary values through [`StepValue::Other`].
pub enum StepValue {
    /// Raw or unquoted matched text.
    String(String),
    /// An integer produced by the built-in `int` type.
    Int(i64),
    /// A floating-point number produced by the built-in `float` type.
    Float(f64),
    /// A custom value produced by a user transformer.
    Other(Box<dyn Any + Send>),
}

impl StepValue {
    /// Borrow the textual value, when this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Read the integer value, when this is an integer.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Read the floating-point value, when this is a float.
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Downcast a custom transformer value to a concrete type.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Other(value) => value.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl fmt::Debug for StepValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.debug_tuple("String").field(s).finish(),
            Self::Int(n) => f.debug_tuple("Int").field(n).finish(),
            Self::Float(n) => f.debug_tuple("Float").field(n).finish(),
            Self::Other(_) => f.write_str("Other(..)"),
        }
    }
}

impl From<String> for StepValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for StepValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for StepValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// Error produced by a parameter-type transformer.
///
/// Transformer failures are ordinary step failures at execution time, never
/// build-time errors.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TransformError {
    message: String,
}

impl TransformError {
    /// Create a new transform error with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A transformer converting a parameter's capture group values into a
/// [`StepValue`].
///
/// The slice holds the parameter's outermost group value first, followed by
/// any nested groups from the parameter's own regular expression, in group
/// order. Non-participating groups are `None`.
pub type Transform =
    Arc<dyn Fn(&[Option<&str>]) -> Result<StepValue, TransformError> + Send + Sync>;

/// A named, matchable parameter type.
///
/// # Examples
/// ```
/// use cuke_harness_patterns::ParameterType;
///
/// let flight = ParameterType::new("flight", vec![r"[A-Z]{3}-[A-Z]{3}".into()]);
/// assert_eq!(flight.name(), "flight");
/// assert!(flight.use_for_snippets());
/// ```
pub struct ParameterType {
    name: String,
    regexps: Vec<String>,
    transform: Option<Transform>,
    use_for_snippets: bool,
    prefer_for_regexp_match: bool,
}

impl ParameterType {
    /// Create a parameter type from a name and one or more regular
    /// expression sources.
    ///
    /// Defaults: no transformer (the raw matched text is passed through),
    /// eligible for snippets, no regexp-match preference.
    #[must_use]
    pub fn new(name: impl Into<String>, regexps: Vec<String>) -> Self {
        Self {
            name: name.into(),
            regexps,
            transform: None,
            use_for_snippets: true,
            prefer_for_regexp_match: false,
        }
    }

    /// Attach a transformer applied to matched values before step invocation.
    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Control whether the type participates in snippet suggestion.
    #[must_use]
    pub fn with_use_for_snippets(mut self, use_for_snippets: bool) -> Self {
        self.use_for_snippets = use_for_snippets;
        self
    }

    /// Control whether the type takes precedence when several types could
    /// generalize the same text fragment.
    #[must_use]
    pub fn with_prefer_for_regexp_match(mut self, prefer: bool) -> Self {
        self.prefer_for_regexp_match = prefer;
        self
    }

    /// The parameter type name (empty for the anonymous type).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The regular expression sources matched by this type.
    #[must_use]
    pub fn regexps(&self) -> &[String] {
        &self.regexps
    }

    /// Whether the type participates in snippet suggestion.
    #[must_use]
    pub fn use_for_snippets(&self) -> bool {
        self.use_for_snippets
    }

    /// Whether the type is preferred when generalizing text fragments.
    #[must_use]
    pub fn prefer_for_regexp_match(&self) -> bool {
        self.prefer_for_regexp_match
    }

    /// Resolve the matched group values into a step value, applying the
    /// transformer when one is registered.
    ///
    /// # Errors
    /// Returns the transformer's [`TransformError`] when conversion fails.
    pub fn resolve(&self, groups: &[Option<&str>]) -> Result<StepValue, TransformError> {
        match &self.transform {
            Some(transform) => transform(groups),
            None => Ok(StepValue::String(
                groups.first().copied().flatten().unwrap_or("").to_string(),
            )),
        }
    }
}

impl fmt::Debug for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterType")
            .field("name", &self.name)
            .field("regexps", &self.regexps)
            .field("use_for_snippets", &self.use_for_snippets)
            .field("prefer_for_regexp_match", &self.prefer_for_regexp_match)
            .finish_non_exhaustive()
    }
}

/// An ordered registry of parameter types consulted during expression
/// compilation.
///
/// Registration order is preserved: it drives both the deterministic order of
/// protocol envelopes and the first-registered-wins tie-break during snippet
/// generation. The registry is built once and treated as immutable afterwards.
#[derive(Debug)]
pub struct ParameterTypeRegistry {
    types: Vec<Arc<ParameterType>>,
}

impl Default for ParameterTypeRegistry {
    fn default() -> Self {
        let mut registry = Self { types: Vec::new() };
        for builtin in builtins() {
            // Built-in definitions are statically known to be valid.
            if let Err(err) = registry.define(builtin) {
                unreachable!("built-in parameter type failed to register: {err}");
            }
        }
        registry
    }
}

impl ParameterTypeRegistry {
    /// Register a parameter type.
    ///
    /// # Errors
    /// Returns [`ExpressionError::DuplicateParameterType`] when the name is
    /// taken and [`ExpressionError::Regex`] when any of its regular
    /// expressions fails to compile.
    pub fn define(&mut self, parameter_type: ParameterType) -> Result<(), ExpressionError> {
        if self
            .types
            .iter()
            .any(|existing| existing.name() == parameter_type.name())
        {
            return Err(ExpressionError::DuplicateParameterType {
                name: parameter_type.name().to_string(),
            });
        }
        for source in parameter_type.regexps() {
            regex::Regex::new(source)?;
        }
        self.types.push(Arc::new(parameter_type));
        Ok(())
    }

    /// Look up a parameter type by name.
    ///
    /// # Errors
    /// Returns [`ExpressionError::UndefinedParameterType`] when no type with
    /// that name is registered.
    pub fn lookup(&self, name: &str) -> Result<Arc<ParameterType>, ExpressionError> {
        self.types
            .iter()
            .find(|parameter_type| parameter_type.name() == name)
            .cloned()
            .ok_or_else(|| ExpressionError::UndefinedParameterType {
                name: name.to_string(),
            })
    }

    /// Iterate over all registered types in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ParameterType>> {
        self.types.iter()
    }
}

const INT_REGEXP: &str = r"-?\d+";
const FLOAT_REGEXP: &str = r"[+-]?\d*\.?\d+";
const WORD_REGEXP: &str = r"[^\s]+";
const STRING_DOUBLE_QUOTED: &str = r#""([^"\\]*(?:\\.[^"\\]*)*)""#;
const STRING_SINGLE_QUOTED: &str = r"'([^'\\]*(?:\\.[^'\\]*)*)'";
const ANONYMOUS_REGEXP: &str = ".*";

fn builtins() -> Vec<ParameterType> {
    vec![
        ParameterType::new("int", vec![INT_REGEXP.into()]).with_transform(Arc::new(int_transform)),
        ParameterType::new("float", vec![FLOAT_REGEXP.into()])
            .with_transform(Arc::new(float_transform)),
        ParameterType::new("word", vec![WORD_REGEXP.into()]).with_use_for_snippets(false),
        ParameterType::new(
            "string",
            vec![STRING_DOUBLE_QUOTED.into(), STRING_SINGLE_QUOTED.into()],
        )
        .with_transform(Arc::new(string_transform)),
        ParameterType::new("", vec![ANONYMOUS_REGEXP.into()]).with_use_for_snippets(false),
    ]
}

fn outer_value<'a>(groups: &'a [Option<&str>]) -> &'a str {
    groups.first().copied().flatten().unwrap_or("")
}

fn int_transform(groups: &[Option<&str>]) -> Result<StepValue, TransformError> {
    let raw = outer_value(groups);
    raw.parse::<i64>()
        .map(StepValue::Int)
        .map_err(|_| TransformError::new(format!("failed to parse integer from '{raw}'")))
}

fn float_transform(groups: &[Option<&str>]) -> Result<StepValue, TransformError> {
    let raw = outer_value(groups);
    raw.parse::<f64>()
        .map(StepValue::Float)
        .map_err(|_| TransformError::new(format!("failed to parse float from '{raw}'")))
}

/// The `string` type carries one inner group per quoting style; the
/// participating group holds the unquoted content.
fn string_transform(groups: &[Option<&str>]) -> Result<StepValue, TransformError> {
    let content = groups
        .iter()
        .skip(1)
        .copied()
        .flatten()
        .next()
        .unwrap_or_else(|| outer_value(groups));
    Ok(StepValue::String(unescape_quotes(content)))
}

fn unescape_quotes(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut chars = content.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some(next @ ('"' | '\'' | '\\')) => out.push(next),
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn registry() -> ParameterTypeRegistry {
        ParameterTypeRegistry::default()
    }

    #[rstest]
    #[case("int")]
    #[case("float")]
    #[case("word")]
    #[case("string")]
    #[case("")]
    fn registers_builtin(#[case] name: &str) {
        let found = registry().lookup(name);
        assert!(found.is_ok(), "built-in '{name}' should be registered");
    }

    #[test]
    fn lookup_of_unknown_name_is_undefined() {
        let Err(err) = registry().lookup("flight") else {
            panic!("lookup should fail");
        };
        assert!(matches!(
            err,
            ExpressionError::UndefinedParameterType { name } if name == "flight"
        ));
    }

    #[test]
    fn rejects_duplicate_names() {
        let mut registry = registry();
        let Err(err) = registry.define(ParameterType::new("int", vec!["x".into()])) else {
            panic!("duplicate definition should fail");
        };
        assert!(matches!(
            err,
            ExpressionError::DuplicateParameterType { name } if name == "int"
        ));
    }

    #[test]
    fn rejects_invalid_regexp_at_definition() {
        let mut registry = registry();
        let result = registry.define(ParameterType::new("broken", vec!["(".into()]));
        assert!(matches!(result, Err(ExpressionError::Regex(_))));
    }

    #[test]
    fn int_transform_parses() {
        let value = int_transform(&[Some("-42")]).unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(value.as_int(), Some(-42));
    }

    #[test]
    fn int_transform_reports_bad_input() {
        let Err(err) = int_transform(&[Some("many")]) else {
            panic!("transform should fail");
        };
        assert_eq!(err.to_string(), "failed to parse integer from 'many'");
    }

    #[test]
    fn string_transform_unescapes_inner_group() {
        let value = string_transform(&[Some(r#""say \"hi\"""#), Some(r#"say \"hi\""#), None])
            .unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(value.as_str(), Some(r#"say "hi""#));
    }

    #[test]
    fn default_resolution_passes_raw_text() {
        let word = ParameterType::new("word", vec![WORD_REGEXP.into()]);
        let value = word
            .resolve(&[Some("cucumber")])
            .unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(value.as_str(), Some("cucumber"));
    }
}
