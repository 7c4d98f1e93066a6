//! Driving one assembled test case through its host.
//!
//! State machine per case: emit `testCaseStarted`, construct the world, run
//! every assembled step in order as a host sub-test, tear the world down,
//! emit `testCaseFinished`. Once any non-always step's outcome is decided,
//! all subsequent non-always steps are skipped; after hooks carry the
//! `always` flag and run regardless.

use cuke_harness::{
    AssembledStep, AssembledTestCase, AttachmentData, AttachmentOptions, AttachmentSink,
    AmbiguousStepError, PreparedStep, RequestedOutcome, StepContext, StepInvocation, StepReturn,
    SupportCodeLibrary, UndefinedStepError, make_snippets,
};
use cuke_harness_messages::{
    Envelope, IdGenerator, MessagesCollector, Suggestion, TestCaseFinished, TestCaseStarted,
    TestStepFinished, TestStepResult, TestStepStarted, Timestamp,
};

use crate::attachment::{make_attachment, make_link, make_log};
use crate::host::{NativeVerdict, StepBodyOutcome, StepHost};

/// Stamps captured attachments with the identity of the step currently
/// executing, so correlation survives even when capture happens deep inside
/// user code.
pub struct ContextTracker<'a> {
    test_case_started_id: &'a str,
    test_step_id: &'a str,
    collector: &'a MessagesCollector,
}

impl<'a> ContextTracker<'a> {
    /// Create a tracker for one step of one test case attempt.
    #[must_use]
    pub fn new(
        test_case_started_id: &'a str,
        test_step_id: &'a str,
        collector: &'a MessagesCollector,
    ) -> Self {
        Self {
            test_case_started_id,
            test_step_id,
            collector,
        }
    }

    fn emit(&self, mut attachment: cuke_harness_messages::Attachment) {
        attachment.test_case_started_id = Some(self.test_case_started_id.to_string());
        attachment.test_step_id = Some(self.test_step_id.to_string());
        self.collector.push(Envelope::Attachment(attachment));
    }
}

impl AttachmentSink for ContextTracker<'_> {
    fn attach(&self, data: AttachmentData<'_>, options: AttachmentOptions<'_>) {
        match make_attachment(data, options) {
            Ok(attachment) => self.emit(attachment),
            Err(err) => log::warn!("could not capture an attachment: {err}"),
        }
    }

    fn log(&self, text: &str) {
        self.emit(make_log(text));
    }

    fn link(&self, url: &str, title: Option<&str>) {
        self.emit(make_link(url, title));
    }
}

impl std::fmt::Debug for ContextTracker<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextTracker")
            .field("test_case_started_id", &self.test_case_started_id)
            .field("test_step_id", &self.test_step_id)
            .finish_non_exhaustive()
    }
}

/// Execute one assembled test case against a host.
///
/// Emits the case and step lifecycle envelopes through the collector. Step
/// results are left `UNKNOWN` here; the stream merger fills them in from
/// the host's native events.
pub fn execute_test_case(
    case: &AssembledTestCase,
    library: &SupportCodeLibrary,
    ids: &IdGenerator,
    collector: &MessagesCollector,
    host: &mut dyn StepHost,
) {
    let test_case_started_id = ids.next_id();
    collector.push(Envelope::TestCaseStarted(TestCaseStarted {
        id: test_case_started_id.clone(),
        test_case_id: case.id.clone(),
        attempt: 0,
        timestamp: Timestamp::now(),
    }));

    let mut world = library.world_factory().create();
    let mut outcome_known = false;

    for step in &case.steps {
        collector.push(Envelope::TestStepStarted(TestStepStarted {
            test_case_started_id: test_case_started_id.clone(),
            test_step_id: step.id.clone(),
            timestamp: Timestamp::now(),
        }));

        let skip = outcome_known && !step.always;
        let tracker = ContextTracker::new(&test_case_started_id, &step.id, collector);
        let verdict = host.run_step(&case.uri, &step.name, skip, &mut || {
            run_step_body(step, library, world.as_mut(), &tracker, ids, collector)
        });
        if !skip && !matches!(verdict, NativeVerdict::Passed) {
            outcome_known = true;
        }

        collector.push(Envelope::TestStepFinished(TestStepFinished {
            test_case_started_id: test_case_started_id.clone(),
            test_step_id: step.id.clone(),
            test_step_result: TestStepResult::default(),
            timestamp: Timestamp::now(),
        }));
    }

    library.world_factory().destroy(world);
    collector.push(Envelope::TestCaseFinished(TestCaseFinished {
        test_case_started_id,
        will_be_retried: false,
        timestamp: Timestamp::now(),
    }));
}

fn run_step_body(
    step: &AssembledStep,
    library: &SupportCodeLibrary,
    world: &mut dyn std::any::Any,
    tracker: &ContextTracker<'_>,
    ids: &IdGenerator,
    collector: &MessagesCollector,
) -> StepBodyOutcome {
    let prepared = match step.prepare() {
        Ok(prepared) => prepared,
        Err(failure) => {
            return StepBodyOutcome::Failed {
                message: failure.to_string(),
                exception_type: Some(failure.type_name().to_string()),
            };
        }
    };

    match prepared {
        PreparedStep::Undefined { pickle_step } => {
            let snippets = make_snippets(&pickle_step, library);
            collector.push(Envelope::Suggestion(Suggestion {
                id: ids.next_id(),
                pickle_step_id: pickle_step.id.clone(),
                snippets,
            }));
            let error = UndefinedStepError::new(pickle_step.text);
            StepBodyOutcome::Failed {
                message: error.to_string(),
                exception_type: Some("UndefinedStepError".to_string()),
            }
        }
        PreparedStep::Ambiguous { text, locations } => {
            let error = AmbiguousStepError::new(text, locations);
            StepBodyOutcome::Failed {
                message: error.to_string(),
                exception_type: Some("AmbiguousStepError".to_string()),
            }
        }
        PreparedStep::Ready(runnable) => {
            let mut ctx = StepContext::new(world, tracker);
            let invocation = StepInvocation {
                values: &runnable.values,
                argument: runnable.argument.as_ref(),
            };
            match (runnable.function)(&mut ctx, invocation) {
                Ok(returned) => match (ctx.requested_outcome(), returned) {
                    (RequestedOutcome::Skip, _) | (_, StepReturn::Skipped) => {
                        StepBodyOutcome::Skipped
                    }
                    (RequestedOutcome::Todo, _) | (_, StepReturn::Pending) => {
                        StepBodyOutcome::Pending
                    }
                    (RequestedOutcome::Proceed, StepReturn::Done) => StepBodyOutcome::Passed,
                },
                Err(failure) => StepBodyOutcome::Failed {
                    message: failure.to_string(),
                    exception_type: Some(failure.type_name().to_string()),
                },
            }
        }
    }
}
