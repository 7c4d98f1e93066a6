//! Step-expression and parameter-type engine for `cuke-harness`.
//!
//! The crate compiles step-expression strings (literal text with `{param}`
//! placeholders, `(optional)` fragments and `one/two` alternation) into
//! anchored regular expressions, resolves placeholder names against a
//! [`ParameterTypeRegistry`], and exposes match results as recursive capture
//! group trees so callers can report *why* a step matched. It also hosts the
//! expression generator used to suggest step definitions for unmatched text.
//!
//! Matching is deliberately kept behind [`Expression`] so an alternative
//! pattern engine could be swapped in without touching the support-code
//! layers above.

mod errors;
mod expression;
mod generator;
mod group;
mod lexer;
mod parameter;

pub use errors::{ExpressionError, SyntaxErrorInfo};
pub use expression::{Expression, ExpressionArgument};
pub use generator::{GeneratedExpression, ParameterInfo, generate_expressions};
pub use group::CaptureGroup;
pub use parameter::{
    ParameterType, ParameterTypeRegistry, StepValue, Transform, TransformError,
};
