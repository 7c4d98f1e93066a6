//! The discriminated envelope type and its payload structs.
//!
//! One envelope carries exactly one message kind; the NDJSON wire form of an
//! envelope is a single-key object such as `{"testCaseStarted":{...}}`, which
//! the externally tagged serde representation produces directly.

use serde::{Deserialize, Serialize};

pub use crate::time::{MessageDuration, Timestamp};

/// One message in the canonical event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Envelope {
    /// Run-level metadata, emitted first.
    Meta(Meta),
    /// The raw content of one feature file.
    Source(Source),
    /// The parsed Gherkin document for one feature file, relayed verbatim
    /// from the external Gherkin compiler.
    GherkinDocument(serde_json::Value),
    /// One fully-resolved scenario instance.
    Pickle(Pickle),
    /// A registered step definition.
    StepDefinition(StepDefinition),
    /// A registered before/after hook.
    Hook(Hook),
    /// A registered parameter type.
    ParameterType(ParameterTypeMessage),
    /// A step expression referencing an unregistered parameter type.
    UndefinedParameterType(UndefinedParameterType),
    /// The run has started.
    TestRunStarted(TestRunStarted),
    /// An assembled test case.
    TestCase(TestCase),
    /// One execution attempt of a test case has started.
    TestCaseStarted(TestCaseStarted),
    /// A test step has started.
    TestStepStarted(TestStepStarted),
    /// A test step has finished.
    TestStepFinished(TestStepFinished),
    /// An attachment captured during a step.
    Attachment(Attachment),
    /// A test case execution attempt has finished.
    TestCaseFinished(TestCaseFinished),
    /// The run has finished.
    TestRunFinished(TestRunFinished),
    /// Suggested step definitions for an undefined step.
    Suggestion(Suggestion),
}

impl Envelope {
    /// Whether this envelope marks the start of a test case execution, the
    /// point at which replay buffering stops.
    #[must_use]
    pub fn is_test_case_started(&self) -> bool {
        matches!(self, Self::TestCaseStarted(_))
    }
}

/// Identification of the implementation and platform producing a stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    /// Version of the message protocol this stream conforms to.
    pub protocol_version: String,
    /// The producing implementation.
    pub implementation: Product,
    /// The language runtime.
    pub runtime: Product,
    /// The operating system.
    pub os: Product,
    /// The CPU architecture.
    pub cpu: Product,
}

/// A named product with an optional version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Product name.
    pub name: String,
    /// Product version, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Media types for feature file sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceMediaType {
    /// Classic Gherkin.
    #[serde(rename = "text/x.cucumber.gherkin+plain")]
    GherkinPlain,
    /// Gherkin embedded in Markdown.
    #[serde(rename = "text/x.cucumber.gherkin+markdown")]
    GherkinMarkdown,
}

/// The raw content of one feature file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    /// Identifier of the source, typically a relative file path.
    pub uri: String,
    /// The raw file content.
    pub data: String,
    /// The source media type.
    pub media_type: SourceMediaType,
}

/// A fully-resolved scenario instance derived from a Gherkin scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pickle {
    /// Unique pickle id.
    pub id: String,
    /// URI of the source feature file.
    pub uri: String,
    /// Scenario name.
    pub name: String,
    /// Spoken language of the source.
    pub language: String,
    /// The resolved steps, in document order.
    pub steps: Vec<PickleStep>,
    /// The effective tags.
    pub tags: Vec<PickleTag>,
    /// Ids of the AST nodes this pickle derives from.
    pub ast_node_ids: Vec<String>,
}

/// A tag applied to a pickle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickleTag {
    /// Tag name including the leading `@`.
    pub name: String,
    /// Id of the tag's AST node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ast_node_id: Option<String>,
}

/// The kind of keyword a pickle step was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickleStepType {
    /// Keyword could not be classified.
    Unknown,
    /// A `Given`-style step.
    Context,
    /// A `When`-style step.
    Action,
    /// A `Then`-style step.
    Outcome,
}

/// One resolved step of a pickle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickleStep {
    /// Unique step id.
    pub id: String,
    /// The literal step text.
    pub text: String,
    /// Keyword classification, when known.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub step_type: Option<PickleStepType>,
    /// Trailing doc string or data table, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub argument: Option<PickleStepArgument>,
    /// Ids of the AST nodes this step derives from.
    pub ast_node_ids: Vec<String>,
}

/// The trailing argument of a pickle step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickleStepArgument {
    /// A doc string argument.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_string: Option<PickleDocString>,
    /// A data table argument.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_table: Option<PickleTable>,
}

/// A doc string attached to a pickle step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickleDocString {
    /// Declared media type of the content, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    /// The doc string content.
    pub content: String,
}

/// A data table attached to a pickle step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickleTable {
    /// The table rows.
    pub rows: Vec<PickleTableRow>,
}

/// One row of a pickle data table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickleTableRow {
    /// The row cells.
    pub cells: Vec<PickleTableCell>,
}

/// One cell of a pickle data table row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickleTableCell {
    /// The cell value.
    pub value: String,
}

/// A line/column position in a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
}

/// A pointer to the source location of a registered definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceReference {
    /// Source file, typically a relative path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// Position within the source file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl SourceReference {
    /// Build a reference from the invoking call site, as captured by
    /// `file!()`, `line!()` and `column!()`.
    #[must_use]
    pub fn from_call_site(uri: &str, line: u32, column: u32) -> Self {
        Self {
            uri: Some(uri.to_string()),
            location: Some(Location {
                line,
                column: Some(column),
            }),
        }
    }
}

/// How a step definition pattern should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepDefinitionPatternType {
    /// A step expression with `{name}` placeholders.
    CucumberExpression,
    /// A plain regular expression.
    RegularExpression,
}

/// The matchable pattern of a step definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDefinitionPattern {
    /// Pattern interpretation.
    #[serde(rename = "type")]
    pub pattern_type: StepDefinitionPatternType,
    /// The pattern source text.
    pub source: String,
}

/// A registered step definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDefinition {
    /// Unique definition id.
    pub id: String,
    /// The matchable pattern.
    pub pattern: StepDefinitionPattern,
    /// Where the definition was registered.
    pub source_reference: SourceReference,
}

/// The lifecycle position of a hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HookType {
    /// Runs before a test case's pickle steps.
    BeforeTestCase,
    /// Runs after a test case's pickle steps.
    AfterTestCase,
}

/// A registered hook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hook {
    /// Unique hook id.
    pub id: String,
    /// Lifecycle position.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub hook_type: Option<HookType>,
    /// Optional display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Raw tag expression gating the hook, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_expression: Option<String>,
    /// Where the hook was registered.
    pub source_reference: SourceReference,
}

/// A registered parameter type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterTypeMessage {
    /// Unique parameter type id.
    pub id: String,
    /// Parameter type name.
    pub name: String,
    /// The regular expressions matched by the type.
    pub regular_expressions: Vec<String>,
    /// Whether the type takes precedence in regexp generalization.
    pub prefer_for_regular_expression_match: bool,
    /// Whether the type participates in snippet suggestion.
    pub use_for_snippets: bool,
    /// Where the type was registered, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_reference: Option<SourceReference>,
}

/// Diagnostic for a step expression referencing an unregistered parameter
/// type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndefinedParameterType {
    /// Name of the missing parameter type.
    pub name: String,
    /// The step expression that referenced it.
    pub expression: String,
}

/// The run has started.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRunStarted {
    /// Unique run id, echoed by `testCase` and `testRunFinished`.
    pub id: String,
    /// When the run started.
    pub timestamp: Timestamp,
}

/// An assembled test case binding a pickle to support code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    /// Unique test case id.
    pub id: String,
    /// Id of the run this case belongs to, stamped by the stream merger.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_run_started_id: Option<String>,
    /// Id of the pickle this case executes.
    pub pickle_id: String,
    /// The ordered steps: before hooks, pickle steps, after hooks.
    pub test_steps: Vec<TestStep>,
}

/// One step of an assembled test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestStep {
    /// Unique step id.
    pub id: String,
    /// The hook this step executes, for hook steps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hook_id: Option<String>,
    /// The pickle step this step executes, for pickle steps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pickle_step_id: Option<String>,
    /// Ids of every step definition that matched, for pickle steps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_definition_ids: Option<Vec<String>>,
    /// Match argument lists, one per matching definition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_match_arguments_lists: Option<Vec<StepMatchArgumentsList>>,
}

/// The matched arguments of one step definition match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepMatchArgumentsList {
    /// One entry per expression parameter.
    pub step_match_arguments: Vec<StepMatchArgument>,
}

/// One matched expression argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepMatchArgument {
    /// The capture group tree for this argument.
    pub group: Group,
    /// Name of the parameter type that produced the argument.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter_type_name: Option<String>,
}

/// A recursive capture group, mirroring the underlying match structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    /// Byte offset of the group in the matched text, when it participated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<usize>,
    /// The matched text, when the group participated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Nested groups.
    pub children: Vec<Group>,
}

/// One execution attempt of a test case has started.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseStarted {
    /// Unique id of this attempt, echoed by step and attachment messages.
    pub id: String,
    /// Id of the assembled test case.
    pub test_case_id: String,
    /// 0-based attempt counter; retries are not modelled, so always 0.
    pub attempt: u32,
    /// When the attempt started.
    pub timestamp: Timestamp,
}

/// A test step has started.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestStepStarted {
    /// Id of the test case attempt.
    pub test_case_started_id: String,
    /// Id of the step within the assembled case.
    pub test_step_id: String,
    /// When the step started.
    pub timestamp: Timestamp,
}

/// Result statuses for a finished test step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestStepResultStatus {
    /// No result has been correlated yet.
    #[default]
    Unknown,
    /// The step passed.
    Passed,
    /// The step was skipped.
    Skipped,
    /// The step is pending implementation.
    Pending,
    /// No step definition matched.
    Undefined,
    /// More than one step definition matched.
    Ambiguous,
    /// The step failed.
    Failed,
}

/// Summary of the error behind a failed step.
///
/// Only the concrete error type name is part of the stable result; message
/// and stack detail are reporter-level concerns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionSummary {
    /// The error's concrete type name.
    #[serde(rename = "type")]
    pub exception_type: String,
}

/// The correlated result of a finished test step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TestStepResult {
    /// Wall-clock duration of the step.
    pub duration: MessageDuration,
    /// The step status.
    pub status: TestStepResultStatus,
    /// Error summary, for failed steps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception: Option<ExceptionSummary>,
}

/// A test step has finished.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestStepFinished {
    /// Id of the test case attempt.
    pub test_case_started_id: String,
    /// Id of the step within the assembled case.
    pub test_step_id: String,
    /// The step result; `UNKNOWN` until the stream merger correlates the
    /// native runner's verdict.
    pub test_step_result: TestStepResult,
    /// When the step finished.
    pub timestamp: Timestamp,
}

/// How an attachment body is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttachmentContentEncoding {
    /// The body is the verbatim text.
    Identity,
    /// The body is base64-encoded binary content.
    Base64,
}

/// Content captured during a step and associated with it in reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// The attachment body.
    pub body: String,
    /// Body encoding.
    pub content_encoding: AttachmentContentEncoding,
    /// MIME type of the content.
    pub media_type: String,
    /// Suggested file name, when the content is exported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Id of the test case attempt the attachment belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_case_started_id: Option<String>,
    /// Id of the step the attachment belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_step_id: Option<String>,
}

/// A test case execution attempt has finished.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseFinished {
    /// Id of the test case attempt.
    pub test_case_started_id: String,
    /// Whether another attempt will follow; retries are not modelled, so
    /// always false.
    pub will_be_retried: bool,
    /// When the attempt finished.
    pub timestamp: Timestamp,
}

/// The run has finished.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRunFinished {
    /// Id of the run that finished.
    pub test_run_started_id: String,
    /// When the run finished.
    pub timestamp: Timestamp,
    /// False when any correlated step result is neither passed, skipped nor
    /// unknown.
    pub success: bool,
}

/// Suggested step definitions for an undefined pickle step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    /// Unique suggestion id.
    pub id: String,
    /// The pickle step the suggestion is for.
    pub pickle_step_id: String,
    /// One snippet per generated expression.
    pub snippets: Vec<Snippet>,
}

/// A single suggested step implementation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    /// Language of the snippet code.
    pub language: String,
    /// The snippet source code.
    pub code: String,
}

/// One compiled feature file as delivered by the external Gherkin compiler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledGherkin {
    /// The raw source.
    pub source: Source,
    /// The parsed document, relayed verbatim.
    pub gherkin_document: serde_json::Value,
    /// The compiled pickles.
    pub pickles: Vec<Pickle>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timestamp() -> Timestamp {
        Timestamp {
            seconds: 12,
            nanos: 340_000_000,
        }
    }

    #[test]
    fn envelope_serializes_externally_tagged() {
        let envelope = Envelope::TestCaseStarted(TestCaseStarted {
            id: "tcs-1".into(),
            test_case_id: "tc-1".into(),
            attempt: 0,
            timestamp: timestamp(),
        });
        let json = serde_json::to_value(&envelope).unwrap_or_else(|err| panic!("{err}"));
        let started = json
            .get("testCaseStarted")
            .unwrap_or_else(|| panic!("expected testCaseStarted key, got {json}"));
        assert_eq!(
            started.get("testCaseId").and_then(|v| v.as_str()),
            Some("tc-1")
        );
    }

    #[test]
    fn envelope_round_trips_through_json() {
        let envelope = Envelope::UndefinedParameterType(UndefinedParameterType {
            name: "thing".into(),
            expression: "a {thing}".into(),
        });
        let line = serde_json::to_string(&envelope).unwrap_or_else(|err| panic!("{err}"));
        let back: Envelope = serde_json::from_str(&line).unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(back, envelope);
    }

    #[test]
    fn result_status_uses_screaming_snake_case() {
        let json = serde_json::to_string(&TestStepResultStatus::Undefined)
            .unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(json, "\"UNDEFINED\"");
    }

    #[test]
    fn optional_fields_are_omitted() {
        let step = TestStep {
            id: "ts-1".into(),
            hook_id: Some("h-1".into()),
            pickle_step_id: None,
            step_definition_ids: None,
            step_match_arguments_lists: None,
        };
        let json = serde_json::to_string(&step).unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(json, r#"{"id":"ts-1","hookId":"h-1"}"#);
    }

    #[test]
    fn default_result_is_unknown() {
        let result = TestStepResult::default();
        assert_eq!(result.status, TestStepResultStatus::Unknown);
        assert!(result.exception.is_none());
    }

    #[test]
    fn source_reference_captures_call_site_shape() {
        let reference = SourceReference::from_call_site("steps.rs", 10, 5);
        assert_eq!(reference.uri.as_deref(), Some("steps.rs"));
        let location = reference
            .location
            .unwrap_or_else(|| panic!("location should be set"));
        assert_eq!(location.line, 10);
        assert_eq!(location.column, Some(5));
    }
}
