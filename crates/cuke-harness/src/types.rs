//! Shared function types and values for steps and hooks.

use std::fmt;
use std::sync::Arc;

use derive_more::From;

use crate::context::StepContext;
use crate::datatable::DataTable;

pub use cuke_harness_patterns::{StepValue, TransformError};

/// Outcome returned by a step or hook function.
///
/// Returning [`StepReturn::Skipped`] or [`StepReturn::Pending`] is equivalent
/// to calling [`StepContext::skip`] or [`StepContext::todo`] before returning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepReturn {
    /// The step completed normally.
    Done,
    /// The step decided the scenario should be skipped.
    Skipped,
    /// The step is pending implementation.
    Pending,
}

/// The trailing argument of a step, when its pickle step carries one.
#[derive(Debug, Clone, PartialEq, Eq, From)]
pub enum StepArgument {
    /// A data table, wrapped read-only.
    Table(DataTable),
    /// The raw text of a doc string.
    DocString(String),
}

/// The resolved inputs of one step or hook invocation.
///
/// Hooks receive an empty value list and no trailing argument.
#[derive(Debug)]
pub struct StepInvocation<'a> {
    /// Values extracted by the matched expression, in parameter order.
    pub values: &'a [StepValue],
    /// The trailing data table or doc string, when present.
    pub argument: Option<&'a StepArgument>,
}

/// A registered step or hook function.
pub type SupportCodeFn = Arc<
    dyn Fn(&mut StepContext<'_>, StepInvocation<'_>) -> Result<StepReturn, StepFailure>
        + Send
        + Sync,
>;

/// A failure raised by user support code or argument resolution.
///
/// Only the concrete error type name is part of the stable result surfaced
/// to reporters; the message exists for human diagnostics.
#[derive(Debug, Clone)]
pub struct StepFailure {
    type_name: String,
    message: String,
}

impl StepFailure {
    /// Create an ad-hoc failure from a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            type_name: "StepFailure".to_string(),
            message: message.into(),
        }
    }

    /// Wrap a concrete error, retaining its type name.
    #[must_use]
    pub fn from_error<E: std::error::Error>(error: &E) -> Self {
        let full = std::any::type_name::<E>();
        let type_name = full.rsplit("::").next().unwrap_or(full);
        Self {
            type_name: type_name.to_string(),
            message: error.to_string(),
        }
    }

    /// The failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The concrete error type name, without its module path.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for StepFailure {}

impl From<String> for StepFailure {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for StepFailure {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_error_retains_the_short_type_name() {
        let Err(parse_error) = "many".parse::<i64>() else {
            panic!("parse should fail");
        };
        let failure = StepFailure::from_error(&parse_error);
        assert_eq!(failure.type_name(), "ParseIntError");
        assert!(!failure.message().is_empty());
    }

    #[test]
    fn ad_hoc_failures_use_the_generic_type_name() {
        let failure = StepFailure::new("database unavailable");
        assert_eq!(failure.type_name(), "StepFailure");
        assert_eq!(failure.to_string(), "database unavailable");
    }

    #[test]
    fn step_argument_converts_from_table_and_text() {
        let table = DataTable::new(vec![vec!["a".to_string()]]);
        assert!(matches!(StepArgument::from(table), StepArgument::Table(_)));
        assert!(matches!(
            StepArgument::from("content".to_string()),
            StepArgument::DocString(_)
        ));
    }
}
