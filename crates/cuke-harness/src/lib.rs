//! Core support-code and test-plan machinery for `cuke-harness`.
//!
//! The crate accumulates user-registered step definitions, hooks, parameter
//! types and the world factory into an immutable [`SupportCodeLibrary`],
//! binds compiled pickles against it into an [`AssembledTestPlan`], and owns
//! the shared vocabulary the execution layer builds on: the per-scenario
//! [`StepContext`], data tables, tag expressions, the error taxonomy for
//! undefined and ambiguous steps, and snippet suggestions for steps that have
//! no definition yet.
//!
//! Registration happens while user support code loads; `build()` compiles
//! everything exactly once and the result is read-only for the rest of the
//! process.

mod context;
mod datatable;
mod error;
mod plan;
mod snippets;
pub mod support;
mod tags;
mod types;

pub use context::{
    AttachmentData, AttachmentOptions, AttachmentSink, NoopAttachmentSink, RequestedOutcome,
    StepContext,
};
pub use cuke_harness_messages::SourceReference;
pub use datatable::DataTable;
pub use error::{AmbiguousStepError, BuildError, UndefinedStepError};
pub use plan::{
    AssembledStep, AssembledTestCase, AssembledTestPlan, PreparedStep, Runnable, make_test_plan,
};
pub use snippets::make_snippets;
pub use support::{
    DefinedHook, DefinedParameterType, DefinedStep, HookOptions, MatchedStep,
    ParameterTypeOptions, SupportCodeBuilder, SupportCodeLibrary, World, WorldCreator,
    WorldDestroyer, WorldFactory,
};
pub use tags::{TagExpression, TagExpressionError};
pub use types::{
    StepArgument, StepFailure, StepInvocation, StepReturn, StepValue, SupportCodeFn,
    TransformError,
};

/// Build a [`SourceReference`] for the invoking call site.
///
/// # Examples
/// ```
/// use cuke_harness::source_reference;
///
/// let reference = source_reference!();
/// assert!(reference.uri.is_some());
/// ```
#[macro_export]
macro_rules! source_reference {
    () => {
        $crate::SourceReference::from_call_site(file!(), line!(), column!())
    };
}

/// Wrap a step or hook closure into a [`SupportCodeFn`].
///
/// The macro pins the closure's argument and return types so type inference
/// never fights the trait object coercion.
///
/// # Examples
/// ```
/// use cuke_harness::{StepReturn, step_fn};
///
/// let step = step_fn!(|_t, args| {
///     assert!(args.values.is_empty());
///     Ok(StepReturn::Done)
/// });
/// let _ = step;
/// ```
#[macro_export]
macro_rules! step_fn {
    (|$ctx:ident, $invocation:ident| $body:expr) => {
        ::std::sync::Arc::new(
            move |$ctx: &mut $crate::StepContext<'_>,
                  $invocation: $crate::StepInvocation<'_>|
                  -> ::std::result::Result<$crate::StepReturn, $crate::StepFailure> {
                $body
            },
        ) as $crate::SupportCodeFn
    };
}
