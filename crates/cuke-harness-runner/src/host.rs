//! The host test-runner capability consumed by the execution engine.
//!
//! The engine only needs one thing from the runner it sits on: run a named
//! sub-test with a skip flag and a body, and report the verdict through the
//! runner's own event channel. [`InlineHost`] is the in-process
//! implementation; process-isolating runners implement [`StepHost`] over
//! their own scheduling.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Instant;

/// Nesting depth of step-level tests in the host's event stream: file,
/// test case, step.
pub const STEP_NESTING: u32 = 2;

/// A verdict reported by the host for one sub-test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeVerdict {
    /// The body completed normally.
    Passed,
    /// The body failed.
    Failed {
        /// The failure message.
        message: String,
        /// Concrete error type name, when one is known.
        exception_type: Option<String>,
    },
    /// The body was skipped, either by the skip flag or explicitly.
    Skipped,
    /// The body declared itself pending implementation.
    Pending,
}

/// One entry of the host's native event channel.
///
/// These events are the second, independently ordered stream the
/// [`EventEnricher`](crate::EventEnricher) correlates with `testStepFinished`
/// envelopes by position per file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeEvent {
    /// The feature file the sub-test belongs to.
    pub file: String,
    /// Nesting depth; step events sit at [`STEP_NESTING`].
    pub nesting: u32,
    /// The sub-test name.
    pub name: String,
    /// The verdict.
    pub verdict: NativeVerdict,
    /// Wall-clock duration in milliseconds.
    pub duration_millis: u128,
}

/// The outcome a step body hands back to its host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepBodyOutcome {
    /// The step passed.
    Passed,
    /// The step requested a skip.
    Skipped,
    /// The step declared itself pending.
    Pending,
    /// The step failed.
    Failed {
        /// The failure message.
        message: String,
        /// Concrete error type name, when one is known.
        exception_type: Option<String>,
    },
}

/// A host test runner able to run named, skippable sub-tests.
pub trait StepHost {
    /// Run one step as a sub-test.
    ///
    /// When `skip` is set the body must not be invoked and the verdict is
    /// skipped. The host records a native event for every step, skipped or
    /// not, so positional correlation stays aligned.
    fn run_step(
        &mut self,
        file: &str,
        name: &str,
        skip: bool,
        body: &mut dyn FnMut() -> StepBodyOutcome,
    ) -> NativeVerdict;

    /// Remove and return the native events recorded so far.
    fn drain_events(&mut self) -> Vec<NativeEvent>;
}

/// Synchronous in-process host: bodies run inline, panics are caught and
/// reported as failures.
#[derive(Debug, Default)]
pub struct InlineHost {
    events: Vec<NativeEvent>,
}

impl InlineHost {
    /// Create a host with an empty event channel.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl StepHost for InlineHost {
    fn run_step(
        &mut self,
        file: &str,
        name: &str,
        skip: bool,
        body: &mut dyn FnMut() -> StepBodyOutcome,
    ) -> NativeVerdict {
        if skip {
            self.events.push(NativeEvent {
                file: file.to_string(),
                nesting: STEP_NESTING,
                name: name.to_string(),
                verdict: NativeVerdict::Skipped,
                duration_millis: 0,
            });
            return NativeVerdict::Skipped;
        }

        let started = Instant::now();
        let outcome = catch_unwind(AssertUnwindSafe(|| body()));
        let verdict = match outcome {
            Ok(StepBodyOutcome::Passed) => NativeVerdict::Passed,
            Ok(StepBodyOutcome::Skipped) => NativeVerdict::Skipped,
            Ok(StepBodyOutcome::Pending) => NativeVerdict::Pending,
            Ok(StepBodyOutcome::Failed {
                message,
                exception_type,
            }) => NativeVerdict::Failed {
                message,
                exception_type,
            },
            Err(payload) => NativeVerdict::Failed {
                message: panic_message(payload.as_ref()),
                exception_type: None,
            },
        };
        self.events.push(NativeEvent {
            file: file.to_string(),
            nesting: STEP_NESTING,
            name: name.to_string(),
            verdict: verdict.clone(),
            duration_millis: started.elapsed().as_millis(),
        });
        verdict
    }

    fn drain_events(&mut self) -> Vec<NativeEvent> {
        std::mem::take(&mut self.events)
    }
}

/// Format a panic payload into a readable message.
///
/// String payloads are extracted directly; other payload types fall back to
/// a generic description.
#[must_use]
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_flag_suppresses_the_body() {
        let mut host = InlineHost::new();
        let mut invoked = false;
        let verdict = host.run_step("a.feature", "step", true, &mut || {
            invoked = true;
            StepBodyOutcome::Passed
        });
        assert_eq!(verdict, NativeVerdict::Skipped);
        assert!(!invoked, "a skipped body must not run");
        assert_eq!(host.drain_events().len(), 1);
    }

    #[test]
    fn panics_become_failures_with_the_payload_message() {
        let mut host = InlineHost::new();
        let verdict = host.run_step("a.feature", "step", false, &mut || {
            panic!("assertion went sideways")
        });
        let NativeVerdict::Failed { message, .. } = verdict else {
            panic!("expected a failure, got {verdict:?}");
        };
        assert_eq!(message, "assertion went sideways");
    }

    #[test]
    fn events_record_every_step_in_order() {
        let mut host = InlineHost::new();
        host.run_step("a.feature", "first", false, &mut || {
            StepBodyOutcome::Passed
        });
        host.run_step("a.feature", "second", true, &mut || StepBodyOutcome::Passed);
        let events = host.drain_events();
        let names: Vec<&str> = events.iter().map(|event| event.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert!(events.iter().all(|event| event.nesting == STEP_NESTING));
        assert!(host.drain_events().is_empty(), "drain must consume");
    }
}
