//! The immutable, queryable support-code library.

use std::sync::Arc;

use cuke_harness_messages::{
    Envelope, Hook, HookType, ParameterTypeMessage, SourceReference, StepDefinition,
    StepDefinitionPattern, StepDefinitionPatternType, UndefinedParameterType,
};
use cuke_harness_patterns::{Expression, ExpressionArgument, ParameterTypeRegistry};

use crate::support::world::WorldFactory;
use crate::tags::TagExpression;
use crate::types::SupportCodeFn;

/// A parameter type as registered, retained for envelope serialization.
#[derive(Clone)]
pub struct DefinedParameterType {
    /// Unique id.
    pub id: String,
    /// The type name.
    pub name: String,
    /// The regular expressions matched by the type.
    pub regular_expressions: Vec<String>,
    /// Whether the type takes precedence when generalizing text fragments.
    pub prefer_for_regexp_match: bool,
    /// Whether the type participates in snippet suggestion.
    pub use_for_snippets: bool,
    /// Where the type was registered.
    pub source_reference: SourceReference,
}

/// A compiled, matchable step definition.
pub struct DefinedStep {
    id: String,
    source_text: String,
    expression: Expression,
    function: SupportCodeFn,
    source_reference: SourceReference,
}

impl DefinedStep {
    pub(crate) fn new(
        id: String,
        source_text: String,
        expression: Expression,
        function: SupportCodeFn,
        source_reference: SourceReference,
    ) -> Self {
        Self {
            id,
            source_text,
            expression,
            function,
            source_reference,
        }
    }

    /// Unique definition id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The expression source the definition was registered with.
    #[must_use]
    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    /// Where the definition was registered.
    #[must_use]
    pub fn source_reference(&self) -> &SourceReference {
        &self.source_reference
    }

    /// The function to invoke when the definition runs.
    #[must_use]
    pub fn function(&self) -> SupportCodeFn {
        Arc::clone(&self.function)
    }
}

impl std::fmt::Debug for DefinedStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefinedStep")
            .field("id", &self.id)
            .field("source_text", &self.source_text)
            .finish_non_exhaustive()
    }
}

/// A registered hook with its compiled tag filter.
pub struct DefinedHook {
    id: String,
    name: Option<String>,
    raw_tag_expression: Option<String>,
    tag_expression: Option<TagExpression>,
    function: SupportCodeFn,
    source_reference: SourceReference,
}

impl DefinedHook {
    pub(crate) fn new(
        id: String,
        name: Option<String>,
        raw_tag_expression: Option<String>,
        tag_expression: Option<TagExpression>,
        function: SupportCodeFn,
        source_reference: SourceReference,
    ) -> Self {
        Self {
            id,
            name,
            raw_tag_expression,
            tag_expression,
            function,
            source_reference,
        }
    }

    /// Unique hook id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name, when one was registered.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Where the hook was registered.
    #[must_use]
    pub fn source_reference(&self) -> &SourceReference {
        &self.source_reference
    }

    /// The function to invoke when the hook runs.
    #[must_use]
    pub fn function(&self) -> SupportCodeFn {
        Arc::clone(&self.function)
    }

    /// Whether the hook applies to a scenario with the given tags.
    #[must_use]
    pub fn applies_to(&self, tags: &[String]) -> bool {
        self.tag_expression
            .as_ref()
            .is_none_or(|expression| expression.evaluate(tags))
    }
}

impl std::fmt::Debug for DefinedHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefinedHook")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("tag_expression", &self.raw_tag_expression)
            .finish_non_exhaustive()
    }
}

/// A step definition paired with the arguments it extracted from a step
/// text.
#[derive(Debug, Clone)]
pub struct MatchedStep {
    /// The matching definition.
    pub step: Arc<DefinedStep>,
    /// One extracted argument per expression parameter.
    pub arguments: Vec<ExpressionArgument>,
}

/// The support code of a run, built once and queried read-only.
///
/// Matching queries return *all* matches; zero and more-than-one are valid
/// results interpreted by the test-plan assembler, not errors at this layer.
pub struct SupportCodeLibrary {
    parameter_types: Vec<DefinedParameterType>,
    steps: Vec<Arc<DefinedStep>>,
    undefined_parameter_types: Vec<UndefinedParameterType>,
    before_hooks: Vec<Arc<DefinedHook>>,
    after_hooks: Vec<Arc<DefinedHook>>,
    registry: ParameterTypeRegistry,
    world_factory: WorldFactory,
}

impl SupportCodeLibrary {
    pub(crate) fn new(
        parameter_types: Vec<DefinedParameterType>,
        steps: Vec<Arc<DefinedStep>>,
        undefined_parameter_types: Vec<UndefinedParameterType>,
        before_hooks: Vec<Arc<DefinedHook>>,
        after_hooks: Vec<Arc<DefinedHook>>,
        registry: ParameterTypeRegistry,
        world_factory: WorldFactory,
    ) -> Self {
        Self {
            parameter_types,
            steps,
            undefined_parameter_types,
            before_hooks,
            after_hooks,
            registry,
            world_factory,
        }
    }

    /// Every step definition whose expression matches the given text, with
    /// the extracted arguments, in registration order.
    #[must_use]
    pub fn find_all_steps_by(&self, text: &str) -> Vec<MatchedStep> {
        self.steps
            .iter()
            .filter_map(|step| {
                step.expression.match_text(text).map(|arguments| MatchedStep {
                    step: Arc::clone(step),
                    arguments,
                })
            })
            .collect()
    }

    /// Before hooks applicable to a scenario with the given tags, in
    /// registration order.
    #[must_use]
    pub fn find_all_before_hooks_by(&self, tags: &[String]) -> Vec<Arc<DefinedHook>> {
        self.before_hooks
            .iter()
            .filter(|hook| hook.applies_to(tags))
            .cloned()
            .collect()
    }

    /// After hooks applicable to a scenario with the given tags, in
    /// registration order. The assembler reverses these so the
    /// last-registered hook runs first.
    #[must_use]
    pub fn find_all_after_hooks_by(&self, tags: &[String]) -> Vec<Arc<DefinedHook>> {
        self.after_hooks
            .iter()
            .filter(|hook| hook.applies_to(tags))
            .cloned()
            .collect()
    }

    /// The undefined-parameter-type diagnostics collected at build time.
    #[must_use]
    pub fn undefined_parameter_types(&self) -> &[UndefinedParameterType] {
        &self.undefined_parameter_types
    }

    /// The parameter-type registry, consulted for snippet generation.
    #[must_use]
    pub fn parameter_registry(&self) -> &ParameterTypeRegistry {
        &self.registry
    }

    /// The factory creating and destroying per-scenario worlds.
    #[must_use]
    pub fn world_factory(&self) -> &WorldFactory {
        &self.world_factory
    }

    /// Serialize the library's static metadata as protocol envelopes:
    /// parameter types, step definitions, undefined parameter types, before
    /// hooks, then after hooks.
    #[must_use]
    pub fn to_envelopes(&self) -> Vec<Envelope> {
        let mut envelopes = Vec::new();
        for parameter_type in &self.parameter_types {
            envelopes.push(Envelope::ParameterType(ParameterTypeMessage {
                id: parameter_type.id.clone(),
                name: parameter_type.name.clone(),
                regular_expressions: parameter_type.regular_expressions.clone(),
                prefer_for_regular_expression_match: parameter_type.prefer_for_regexp_match,
                use_for_snippets: parameter_type.use_for_snippets,
                source_reference: Some(parameter_type.source_reference.clone()),
            }));
        }
        for step in &self.steps {
            envelopes.push(Envelope::StepDefinition(StepDefinition {
                id: step.id().to_string(),
                pattern: StepDefinitionPattern {
                    pattern_type: StepDefinitionPatternType::CucumberExpression,
                    source: step.source_text().to_string(),
                },
                source_reference: step.source_reference().clone(),
            }));
        }
        for undefined in &self.undefined_parameter_types {
            envelopes.push(Envelope::UndefinedParameterType(undefined.clone()));
        }
        for (hooks, hook_type) in [
            (&self.before_hooks, HookType::BeforeTestCase),
            (&self.after_hooks, HookType::AfterTestCase),
        ] {
            for hook in hooks.iter() {
                envelopes.push(Envelope::Hook(Hook {
                    id: hook.id().to_string(),
                    hook_type: Some(hook_type),
                    name: hook.name.clone(),
                    tag_expression: hook.raw_tag_expression.clone(),
                    source_reference: hook.source_reference().clone(),
                }));
            }
        }
        envelopes
    }
}

impl std::fmt::Debug for SupportCodeLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupportCodeLibrary")
            .field("parameter_types", &self.parameter_types.len())
            .field("steps", &self.steps.len())
            .field(
                "undefined_parameter_types",
                &self.undefined_parameter_types.len(),
            )
            .field("before_hooks", &self.before_hooks.len())
            .field("after_hooks", &self.after_hooks.len())
            .finish_non_exhaustive()
    }
}
