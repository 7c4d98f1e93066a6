//! Error types shared by the expression modules.

use std::fmt;
use thiserror::Error;

/// Position-annotated context for expression syntax failures.
///
/// # Examples
/// ```
/// use cuke_harness_patterns::SyntaxErrorInfo;
/// let info = SyntaxErrorInfo::new("missing closing '}' for parameter", 4);
/// assert_eq!(info.position, 4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxErrorInfo {
    /// Human-readable reason for the failure.
    pub message: &'static str,
    /// Zero-based byte offset in the expression source where parsing failed.
    pub position: usize,
}

impl SyntaxErrorInfo {
    /// Create a new syntax error description.
    #[must_use]
    pub fn new(message: &'static str, position: usize) -> Self {
        Self { message, position }
    }
}

impl fmt::Display for SyntaxErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at byte {} (zero-based)", self.message, self.position)
    }
}

/// Errors surfaced while compiling or registering step expressions.
///
/// [`ExpressionError::UndefinedParameterType`] is special-cased by the
/// support-code builder: steps whose expressions reference an unknown
/// parameter type are deferred as diagnostics rather than failing the build.
/// Every other variant is fatal at build time.
#[derive(Debug, Error)]
pub enum ExpressionError {
    /// The expression source is malformed.
    #[error("{0}")]
    Syntax(SyntaxErrorInfo),
    /// The expression references a parameter type name that is not registered.
    #[error("undefined parameter type {{{name}}}")]
    UndefinedParameterType {
        /// Name of the missing parameter type.
        name: String,
    },
    /// A parameter type with the same name is already registered.
    #[error("duplicate parameter type name '{name}'")]
    DuplicateParameterType {
        /// Name that was registered twice.
        name: String,
    },
    /// The generated regular expression failed to compile.
    #[error(transparent)]
    Regex(#[from] regex::Error),
}

pub(crate) fn syntax_error(message: &'static str, position: usize) -> ExpressionError {
    ExpressionError::Syntax(SyntaxErrorInfo::new(message, position))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_position_in_message() {
        let info = SyntaxErrorInfo::new("unmatched closing brace '}'", 7);
        assert_eq!(
            info.to_string(),
            "unmatched closing brace '}' at byte 7 (zero-based)"
        );
    }

    #[test]
    fn undefined_parameter_type_names_the_type() {
        let err = ExpressionError::UndefinedParameterType {
            name: "thing".into(),
        };
        assert_eq!(err.to_string(), "undefined parameter type {thing}");
    }
}
