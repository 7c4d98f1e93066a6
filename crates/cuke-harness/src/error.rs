//! The error taxonomy for step resolution and library builds.
//!
//! The undefined and ambiguous message texts are part of the protocol
//! surface: reporters and the result mapper recognize steps by these exact
//! wordings, so they must not drift.

use std::fmt;

use thiserror::Error;

use cuke_harness_messages::SourceReference;
use cuke_harness_patterns::ExpressionError;

use crate::tags::TagExpressionError;

/// No step definition matched a pickle step's text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("No matching step definitions found for text \"{text}\"")]
pub struct UndefinedStepError {
    /// The unmatched step text.
    pub text: String,
}

impl UndefinedStepError {
    /// Create the error for the given step text.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// More than one step definition matched a pickle step's text.
///
/// The message enumerates every matching definition's source location,
/// 1-indexed, in registration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmbiguousStepError {
    /// The step text with multiple matches.
    pub text: String,
    /// Source references of every matching definition, in registration
    /// order.
    pub locations: Vec<SourceReference>,
}

impl AmbiguousStepError {
    /// Create the error for a step text and its matching locations.
    #[must_use]
    pub fn new(text: impl Into<String>, locations: Vec<SourceReference>) -> Self {
        Self {
            text: text.into(),
            locations,
        }
    }
}

impl fmt::Display for AmbiguousStepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Multiple matching step definitions found for text \"{}\":",
            self.text
        )?;
        for (index, reference) in self.locations.iter().enumerate() {
            let uri = reference.uri.as_deref().unwrap_or("?");
            let line = reference
                .location
                .map_or_else(|| "?".to_string(), |location| location.line.to_string());
            let column = reference
                .location
                .and_then(|location| location.column)
                .map_or_else(|| "?".to_string(), |column| column.to_string());
            write!(f, "\n{}) {uri}:{line}:{column}", index + 1)?;
        }
        Ok(())
    }
}

impl std::error::Error for AmbiguousStepError {}

/// Fatal errors raised while building the support-code library.
///
/// Unlike undefined parameter types, which are deferred as diagnostics,
/// these abort the entire run.
#[derive(Debug, Error)]
pub enum BuildError {
    /// A step expression could not be compiled.
    #[error("invalid step expression '{expression}': {source}")]
    Expression {
        /// The offending expression source.
        expression: String,
        /// The underlying compilation error.
        #[source]
        source: ExpressionError,
    },
    /// A parameter type could not be registered.
    #[error("invalid parameter type '{name}': {source}")]
    ParameterType {
        /// The parameter type name.
        name: String,
        /// The underlying registration error.
        #[source]
        source: ExpressionError,
    },
    /// A hook's tag filter could not be parsed.
    #[error("invalid tag expression '{expression}': {source}")]
    TagExpression {
        /// The offending tag filter source.
        expression: String,
        /// The underlying parse error.
        #[source]
        source: TagExpressionError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use cuke_harness_messages::Location;

    #[test]
    fn undefined_message_is_exact() {
        let error = UndefinedStepError::new("I do something unknown");
        assert_eq!(
            error.to_string(),
            "No matching step definitions found for text \"I do something unknown\""
        );
    }

    #[test]
    fn ambiguous_message_lists_locations_one_indexed() {
        let error = AmbiguousStepError::new(
            "a step",
            vec![
                SourceReference::from_call_site("steps/a.rs", 10, 5),
                SourceReference::from_call_site("steps/b.rs", 20, 1),
            ],
        );
        assert_eq!(
            error.to_string(),
            "Multiple matching step definitions found for text \"a step\":\n\
             1) steps/a.rs:10:5\n\
             2) steps/b.rs:20:1"
        );
    }

    #[test]
    fn missing_location_detail_renders_question_marks() {
        let error = AmbiguousStepError::new(
            "a step",
            vec![SourceReference {
                uri: Some("steps/a.rs".into()),
                location: Some(Location {
                    line: 3,
                    column: None,
                }),
            }],
        );
        assert!(error.to_string().ends_with("1) steps/a.rs:3:?"));
    }
}
