//! Execution engine and event correlation for `cuke-harness`.
//!
//! The crate drives assembled test cases against a host test runner
//! abstracted behind [`StepHost`], captures attachments with correct step
//! correlation, merges the host's native pass/fail events with the envelope
//! stream, and exposes [`TestRun`] as the front door producing one complete,
//! canonically ordered message stream per run.

mod attachment;
mod enrich;
mod execution;
mod host;
mod result;
mod run;

pub use attachment::{LINK_MEDIA_TYPE, LOG_MEDIA_TYPE, make_attachment, make_link, make_log};
pub use enrich::EventEnricher;
pub use execution::{ContextTracker, execute_test_case};
pub use host::{
    InlineHost, NativeEvent, NativeVerdict, STEP_NESTING, StepBodyOutcome, StepHost, panic_message,
};
pub use result::{is_non_success, map_step_result};
pub use run::TestRun;
