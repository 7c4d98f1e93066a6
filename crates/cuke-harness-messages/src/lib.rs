//! Envelope protocol model and local message relay for `cuke-harness`.
//!
//! The crate owns the canonical message stream contract: the discriminated
//! [`Envelope`] type and its payload structs, timestamp and id plumbing, the
//! chunk-tolerant NDJSON [`MessagesDeframer`], the replay-buffering
//! [`EnvelopeSubject`] that late subscribers attach to, and the local
//! socket relay used when test execution and reporting happen in separate
//! processes.
//!
//! Reporters consume this crate's types; they never reach into the runner.

mod collector;
mod deframer;
mod envelope;
mod ids;
mod meta;
#[cfg(unix)]
mod relay;
mod router;
mod socket;
mod subject;
mod time;

pub use collector::{EnvelopeFromFile, MessagesCollector};
pub use deframer::MessagesDeframer;
pub use envelope::{
    Attachment, AttachmentContentEncoding, CompiledGherkin, Envelope, ExceptionSummary, Group,
    Hook, HookType, Location, MessageDuration, Meta, ParameterTypeMessage, Pickle,
    PickleDocString, PickleStep, PickleStepArgument, PickleStepType, PickleTable, PickleTableCell,
    PickleTableRow, PickleTag, Product, Snippet, Source, SourceMediaType, SourceReference,
    StepDefinition, StepDefinitionPattern, StepDefinitionPatternType, StepMatchArgument,
    StepMatchArgumentsList, Suggestion, TestCase, TestCaseFinished, TestCaseStarted,
    TestRunFinished, TestRunStarted, TestStep, TestStepFinished, TestStepResult,
    TestStepResultStatus, TestStepStarted, Timestamp, UndefinedParameterType,
};
pub use ids::IdGenerator;
pub use meta::{PROTOCOL_VERSION, make_meta};
#[cfg(unix)]
pub use relay::{RelayError, RelayListener, RelayRole, RelayWriter, setup_message_writing};
pub use router::{DiagnosticRouter, PROTOCOL_PREFIX, from_prefixed};
pub use socket::derive_socket_path;
pub use subject::EnvelopeSubject;
