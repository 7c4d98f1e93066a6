//! Binding compiled pickles to support code: the assembled test plan.
//!
//! Assembly is eager about *matching* (every pickle step knows its matching
//! definitions up front, so `toMessage` can describe them) but lazy about
//! *resolution*: undefined and ambiguous steps still produce normal-looking
//! plan entries, and only fail when the execution engine actually prepares
//! them.

use std::sync::Arc;

use cuke_harness_messages::{
    Envelope, Group, IdGenerator, Pickle, PickleStep, SourceReference, StepMatchArgument,
    StepMatchArgumentsList, TestCase, TestStep,
};
use cuke_harness_patterns::CaptureGroup;

use crate::datatable::DataTable;
use crate::support::{DefinedHook, MatchedStep, SupportCodeLibrary};
use crate::types::{StepArgument, StepFailure, StepValue, SupportCodeFn};

/// The ordered, executable shape of a whole run.
#[derive(Debug)]
pub struct AssembledTestPlan {
    /// One assembled case per pickle, in pickle order.
    pub test_cases: Vec<AssembledTestCase>,
}

impl AssembledTestPlan {
    /// Render one `testCase` envelope per assembled case.
    #[must_use]
    pub fn to_envelopes(&self) -> Vec<Envelope> {
        self.test_cases
            .iter()
            .map(|test_case| Envelope::TestCase(test_case.to_message()))
            .collect()
    }
}

/// One pickle bound to the support-code library.
#[derive(Debug)]
pub struct AssembledTestCase {
    /// Stable case id.
    pub id: String,
    /// Id of the pickle this case executes.
    pub pickle_id: String,
    /// Scenario name.
    pub name: String,
    /// URI of the originating feature file.
    pub uri: String,
    /// The scenario's effective tag names.
    pub tags: Vec<String>,
    /// Before hooks, pickle steps, then after hooks (reversed).
    pub steps: Vec<AssembledStep>,
}

impl AssembledTestCase {
    /// Render the protocol `testCase` shape.
    #[must_use]
    pub fn to_message(&self) -> TestCase {
        TestCase {
            id: self.id.clone(),
            test_run_started_id: None,
            pickle_id: self.pickle_id.clone(),
            test_steps: self.steps.iter().map(AssembledStep::to_message).collect(),
        }
    }
}

#[derive(Debug)]
enum StepKind {
    Hook(Arc<DefinedHook>),
    Pickle {
        pickle_step: PickleStep,
        matched: Vec<MatchedStep>,
    },
}

/// One step of an assembled case, resolvable at execution time.
#[derive(Debug)]
pub struct AssembledStep {
    /// Stable step id.
    pub id: String,
    /// Display name: the step text, or the hook's name.
    pub name: String,
    /// True only for after hooks, which run even once the case outcome is
    /// known.
    pub always: bool,
    kind: StepKind,
}

impl AssembledStep {
    /// The pickle step behind this assembled step, for pickle steps.
    #[must_use]
    pub fn pickle_step(&self) -> Option<&PickleStep> {
        match &self.kind {
            StepKind::Pickle { pickle_step, .. } => Some(pickle_step),
            StepKind::Hook(_) => None,
        }
    }

    /// Resolve this step into something runnable.
    ///
    /// Matching already happened at assembly time; this applies the deferred
    /// failure modes (no match, several matches) and resolves argument
    /// values, which may invoke user transformers.
    ///
    /// # Errors
    /// Returns a [`StepFailure`] when a parameter transformer rejects a
    /// matched value; that failure belongs to this step's execution, not to
    /// assembly.
    pub fn prepare(&self) -> Result<PreparedStep, StepFailure> {
        match &self.kind {
            StepKind::Hook(hook) => Ok(PreparedStep::Ready(Runnable {
                function: hook.function(),
                values: Vec::new(),
                argument: None,
            })),
            StepKind::Pickle {
                pickle_step,
                matched,
            } => match matched.as_slice() {
                [] => Ok(PreparedStep::Undefined {
                    pickle_step: pickle_step.clone(),
                }),
                [only] => {
                    let mut values = Vec::with_capacity(only.arguments.len());
                    for argument in &only.arguments {
                        values.push(
                            argument
                                .resolve()
                                .map_err(|err| StepFailure::from_error(&err))?,
                        );
                    }
                    Ok(PreparedStep::Ready(Runnable {
                        function: only.step.function(),
                        values,
                        argument: trailing_argument(pickle_step),
                    }))
                }
                many => Ok(PreparedStep::Ambiguous {
                    text: pickle_step.text.clone(),
                    locations: many
                        .iter()
                        .map(|matched| matched.step.source_reference().clone())
                        .collect(),
                }),
            },
        }
    }

    /// Render the protocol `testStep` shape, including, for pickle steps,
    /// every matching definition id and its argument capture-group tree.
    #[must_use]
    pub fn to_message(&self) -> TestStep {
        match &self.kind {
            StepKind::Hook(hook) => TestStep {
                id: self.id.clone(),
                hook_id: Some(hook.id().to_string()),
                pickle_step_id: None,
                step_definition_ids: None,
                step_match_arguments_lists: None,
            },
            StepKind::Pickle {
                pickle_step,
                matched,
            } => TestStep {
                id: self.id.clone(),
                hook_id: None,
                pickle_step_id: Some(pickle_step.id.clone()),
                step_definition_ids: Some(
                    matched
                        .iter()
                        .map(|matched| matched.step.id().to_string())
                        .collect(),
                ),
                step_match_arguments_lists: Some(
                    matched
                        .iter()
                        .map(|matched| StepMatchArgumentsList {
                            step_match_arguments: matched
                                .arguments
                                .iter()
                                .map(|argument| StepMatchArgument {
                                    group: to_group(argument.group()),
                                    parameter_type_name: Some(
                                        argument.parameter_type_name().to_string(),
                                    ),
                                })
                                .collect(),
                        })
                        .collect(),
                ),
            },
        }
    }
}

/// A fully-resolved invocation, produced by [`AssembledStep::prepare`].
pub struct Runnable {
    /// The user function to invoke.
    pub function: SupportCodeFn,
    /// Resolved expression argument values, in parameter order.
    pub values: Vec<StepValue>,
    /// The trailing table or doc string, when the pickle step carries one.
    pub argument: Option<StepArgument>,
}

impl std::fmt::Debug for Runnable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runnable")
            .field("values", &self.values)
            .field("argument", &self.argument)
            .finish_non_exhaustive()
    }
}

/// The tagged result of resolving an assembled step.
#[derive(Debug)]
pub enum PreparedStep {
    /// Exactly one definition matched; the step can run.
    Ready(Runnable),
    /// No definition matched; running the step fails as undefined.
    Undefined {
        /// The unmatched pickle step, carried for diagnostics and snippet
        /// generation.
        pickle_step: PickleStep,
    },
    /// Several definitions matched; running the step fails as ambiguous.
    Ambiguous {
        /// The ambiguous step text.
        text: String,
        /// Source references of every match, in registration order.
        locations: Vec<SourceReference>,
    },
}

fn trailing_argument(pickle_step: &PickleStep) -> Option<StepArgument> {
    let argument = pickle_step.argument.as_ref()?;
    if let Some(doc_string) = &argument.doc_string {
        Some(StepArgument::DocString(doc_string.content.clone()))
    } else {
        argument
            .data_table
            .as_ref()
            .map(|table| StepArgument::Table(DataTable::from_pickle_table(table)))
    }
}

fn to_group(group: &CaptureGroup) -> Group {
    Group {
        start: group.start,
        value: group.value.clone(),
        children: group.children.iter().map(to_group).collect(),
    }
}

/// Assemble a test plan: for each pickle, applicable before hooks in
/// registration order, pickle steps in document order, then applicable
/// after hooks in reverse registration order.
#[must_use]
pub fn make_test_plan(
    ids: &IdGenerator,
    pickles: &[Pickle],
    library: &SupportCodeLibrary,
) -> AssembledTestPlan {
    let test_cases = pickles
        .iter()
        .map(|pickle| {
            let id = ids.next_id();
            let tags: Vec<String> = pickle.tags.iter().map(|tag| tag.name.clone()).collect();
            let mut steps = Vec::new();
            for hook in library.find_all_before_hooks_by(&tags) {
                steps.push(AssembledStep {
                    id: ids.next_id(),
                    name: hook.name().unwrap_or("").to_string(),
                    always: false,
                    kind: StepKind::Hook(hook),
                });
            }
            for pickle_step in &pickle.steps {
                let matched = library.find_all_steps_by(&pickle_step.text);
                steps.push(AssembledStep {
                    id: ids.next_id(),
                    name: pickle_step.text.clone(),
                    always: false,
                    kind: StepKind::Pickle {
                        pickle_step: pickle_step.clone(),
                        matched,
                    },
                });
            }
            let mut after_hooks = library.find_all_after_hooks_by(&tags);
            after_hooks.reverse();
            for hook in after_hooks {
                steps.push(AssembledStep {
                    id: ids.next_id(),
                    name: hook.name().unwrap_or("").to_string(),
                    always: true,
                    kind: StepKind::Hook(hook),
                });
            }
            AssembledTestCase {
                id,
                pickle_id: pickle.id.clone(),
                name: pickle.name.clone(),
                uri: pickle.uri.clone(),
                tags,
                steps,
            }
        })
        .collect();
    AssembledTestPlan { test_cases }
}
