//! Accumulation of registered support code and the one-shot library build.

use std::sync::Arc;

use cuke_harness_messages::{IdGenerator, SourceReference, UndefinedParameterType};
use cuke_harness_patterns::{
    Expression, ExpressionError, ParameterType, ParameterTypeRegistry, Transform,
};

use crate::error::BuildError;
use crate::support::library::{DefinedHook, DefinedParameterType, DefinedStep, SupportCodeLibrary};
use crate::support::world::WorldFactory;
use crate::tags::TagExpression;
use crate::types::SupportCodeFn;

/// Options for defining a custom parameter type.
pub struct ParameterTypeOptions {
    /// The parameter type name.
    pub name: String,
    /// One or more regular expressions matching the type.
    pub regexps: Vec<String>,
    /// Optional transformer applied to matched values before the step runs.
    pub transformer: Option<Transform>,
    /// Whether the type participates in snippet suggestion.
    pub use_for_snippets: bool,
    /// Whether the type takes precedence when generalizing text fragments.
    pub prefer_for_regexp_match: bool,
}

impl ParameterTypeOptions {
    /// Create options with the defaults: no transformer, snippet-eligible,
    /// no regexp-match preference.
    #[must_use]
    pub fn new(name: impl Into<String>, regexps: Vec<String>) -> Self {
        Self {
            name: name.into(),
            regexps,
            transformer: None,
            use_for_snippets: true,
            prefer_for_regexp_match: false,
        }
    }

    /// Attach a transformer.
    #[must_use]
    pub fn with_transformer(mut self, transformer: Transform) -> Self {
        self.transformer = Some(transformer);
        self
    }

    /// Control snippet participation.
    #[must_use]
    pub fn with_use_for_snippets(mut self, use_for_snippets: bool) -> Self {
        self.use_for_snippets = use_for_snippets;
        self
    }

    /// Control regexp-match precedence.
    #[must_use]
    pub fn with_prefer_for_regexp_match(mut self, prefer: bool) -> Self {
        self.prefer_for_regexp_match = prefer;
        self
    }
}

impl std::fmt::Debug for ParameterTypeOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParameterTypeOptions")
            .field("name", &self.name)
            .field("regexps", &self.regexps)
            .field("use_for_snippets", &self.use_for_snippets)
            .field("prefer_for_regexp_match", &self.prefer_for_regexp_match)
            .finish_non_exhaustive()
    }
}

/// Options for defining hooks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookOptions {
    /// Optional name surfaced in reports.
    pub name: Option<String>,
    /// Optional tag expression; scenarios not matching it omit the hook.
    pub tag_filter: Option<String>,
}

impl HookOptions {
    /// Options carrying only a display name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            tag_filter: None,
        }
    }

    /// Add a tag filter to the options.
    #[must_use]
    pub fn with_tag_filter(mut self, tag_filter: impl Into<String>) -> Self {
        self.tag_filter = Some(tag_filter.into());
        self
    }
}

struct RegisteredParameterType {
    id: String,
    options: ParameterTypeOptions,
    source_reference: SourceReference,
}

struct RegisteredStep {
    id: String,
    text: String,
    function: SupportCodeFn,
    source_reference: SourceReference,
}

struct RegisteredHook {
    id: String,
    options: HookOptions,
    function: SupportCodeFn,
    source_reference: SourceReference,
}

/// Accumulates registered support code and compiles it into a
/// [`SupportCodeLibrary`].
///
/// Registration order is semantically significant for hooks: before hooks
/// run in registration order, after hooks in reverse registration order.
/// The builder is consumed by [`SupportCodeBuilder::build`]; the library it
/// produces is immutable for the rest of the process.
///
/// # Examples
/// ```
/// use cuke_harness_messages::IdGenerator;
/// use cuke_harness::{StepReturn, SupportCodeBuilder, step_fn};
///
/// let mut builder = SupportCodeBuilder::new(IdGenerator::incrementing());
/// builder.given("I have {int} cukes", step_fn!(|_t, _args| Ok(StepReturn::Done)));
/// let library = builder.build().unwrap_or_else(|err| panic!("{err}"));
/// assert_eq!(library.find_all_steps_by("I have 3 cukes").len(), 1);
/// ```
pub struct SupportCodeBuilder {
    ids: IdGenerator,
    parameter_types: Vec<RegisteredParameterType>,
    steps: Vec<RegisteredStep>,
    before_hooks: Vec<RegisteredHook>,
    after_hooks: Vec<RegisteredHook>,
    world_factory: WorldFactory,
}

impl SupportCodeBuilder {
    /// Create an empty builder drawing ids from the given generator.
    #[must_use]
    pub fn new(ids: IdGenerator) -> Self {
        Self {
            ids,
            parameter_types: Vec::new(),
            steps: Vec::new(),
            before_hooks: Vec::new(),
            after_hooks: Vec::new(),
            world_factory: WorldFactory::default(),
        }
    }

    /// Register a step for the `Given` keyword.
    ///
    /// The keyword is documentation only; matching is purely by expression.
    #[track_caller]
    pub fn given(&mut self, text: &str, function: SupportCodeFn) -> String {
        self.register_step(text, function, caller_reference())
    }

    /// Register a step for the `When` keyword.
    #[track_caller]
    pub fn when(&mut self, text: &str, function: SupportCodeFn) -> String {
        self.register_step(text, function, caller_reference())
    }

    /// Register a step for the `Then` keyword.
    #[track_caller]
    pub fn then(&mut self, text: &str, function: SupportCodeFn) -> String {
        self.register_step(text, function, caller_reference())
    }

    /// Register a step with an explicit source reference.
    pub fn register_step(
        &mut self,
        text: &str,
        function: SupportCodeFn,
        source_reference: SourceReference,
    ) -> String {
        let id = self.ids.next_id();
        self.steps.push(RegisteredStep {
            id: id.clone(),
            text: text.to_string(),
            function,
            source_reference,
        });
        id
    }

    /// Register a hook that runs before each scenario's pickle steps.
    #[track_caller]
    pub fn before(&mut self, options: HookOptions, function: SupportCodeFn) -> String {
        self.register_before_hook(options, function, caller_reference())
    }

    /// Register a before hook with an explicit source reference.
    pub fn register_before_hook(
        &mut self,
        options: HookOptions,
        function: SupportCodeFn,
        source_reference: SourceReference,
    ) -> String {
        let id = self.ids.next_id();
        self.before_hooks.push(RegisteredHook {
            id: id.clone(),
            options,
            function,
            source_reference,
        });
        id
    }

    /// Register a hook that runs after each scenario's pickle steps.
    #[track_caller]
    pub fn after(&mut self, options: HookOptions, function: SupportCodeFn) -> String {
        self.register_after_hook(options, function, caller_reference())
    }

    /// Register an after hook with an explicit source reference.
    pub fn register_after_hook(
        &mut self,
        options: HookOptions,
        function: SupportCodeFn,
        source_reference: SourceReference,
    ) -> String {
        let id = self.ids.next_id();
        self.after_hooks.push(RegisteredHook {
            id: id.clone(),
            options,
            function,
            source_reference,
        });
        id
    }

    /// Register a custom parameter type.
    #[track_caller]
    pub fn parameter_type(&mut self, options: ParameterTypeOptions) -> String {
        self.register_parameter_type(options, caller_reference())
    }

    /// Register a parameter type with an explicit source reference.
    pub fn register_parameter_type(
        &mut self,
        options: ParameterTypeOptions,
        source_reference: SourceReference,
    ) -> String {
        let id = self.ids.next_id();
        self.parameter_types.push(RegisteredParameterType {
            id: id.clone(),
            options,
            source_reference,
        });
        id
    }

    /// Replace the world factory used for every test case.
    pub fn world(&mut self, factory: WorldFactory) {
        self.world_factory = factory;
    }

    /// Compile everything registered so far into an immutable library.
    ///
    /// Steps whose expression references an unknown parameter type are
    /// dropped from the executable library and recorded as
    /// `undefinedParameterType` diagnostics, deduplicated by
    /// (name, expression).
    ///
    /// # Errors
    /// Returns [`BuildError`] for any other expression compilation failure,
    /// invalid parameter type registration, or malformed hook tag filter.
    pub fn build(self) -> Result<SupportCodeLibrary, BuildError> {
        let mut registry = ParameterTypeRegistry::default();
        let mut parameter_types = Vec::new();
        for registered in self.parameter_types {
            let mut parameter_type = ParameterType::new(
                registered.options.name.clone(),
                registered.options.regexps.clone(),
            )
            .with_use_for_snippets(registered.options.use_for_snippets)
            .with_prefer_for_regexp_match(registered.options.prefer_for_regexp_match);
            if let Some(transformer) = &registered.options.transformer {
                parameter_type = parameter_type.with_transform(Arc::clone(transformer));
            }
            registry
                .define(parameter_type)
                .map_err(|source| BuildError::ParameterType {
                    name: registered.options.name.clone(),
                    source,
                })?;
            parameter_types.push(DefinedParameterType {
                id: registered.id,
                name: registered.options.name,
                regular_expressions: registered.options.regexps,
                prefer_for_regexp_match: registered.options.prefer_for_regexp_match,
                use_for_snippets: registered.options.use_for_snippets,
                source_reference: registered.source_reference,
            });
        }

        let mut steps = Vec::new();
        let mut undefined_parameter_types: Vec<UndefinedParameterType> = Vec::new();
        for registered in self.steps {
            match Expression::compile(&registered.text, &registry) {
                Ok(expression) => steps.push(Arc::new(DefinedStep::new(
                    registered.id,
                    registered.text,
                    expression,
                    registered.function,
                    registered.source_reference,
                ))),
                Err(ExpressionError::UndefinedParameterType { name }) => {
                    log::debug!(
                        "dropping step '{}': undefined parameter type {{{name}}}",
                        registered.text
                    );
                    let entry = UndefinedParameterType {
                        name,
                        expression: registered.text,
                    };
                    if !undefined_parameter_types.contains(&entry) {
                        undefined_parameter_types.push(entry);
                    }
                }
                Err(source) => {
                    return Err(BuildError::Expression {
                        expression: registered.text,
                        source,
                    });
                }
            }
        }

        let before_hooks = build_hooks(self.before_hooks)?;
        let after_hooks = build_hooks(self.after_hooks)?;

        Ok(SupportCodeLibrary::new(
            parameter_types,
            steps,
            undefined_parameter_types,
            before_hooks,
            after_hooks,
            registry,
            self.world_factory,
        ))
    }
}

impl std::fmt::Debug for SupportCodeBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupportCodeBuilder")
            .field("parameter_types", &self.parameter_types.len())
            .field("steps", &self.steps.len())
            .field("before_hooks", &self.before_hooks.len())
            .field("after_hooks", &self.after_hooks.len())
            .finish_non_exhaustive()
    }
}

fn build_hooks(registered: Vec<RegisteredHook>) -> Result<Vec<Arc<DefinedHook>>, BuildError> {
    registered
        .into_iter()
        .map(|hook| {
            let tag_expression = hook
                .options
                .tag_filter
                .as_deref()
                .map(TagExpression::parse)
                .transpose()
                .map_err(|source| BuildError::TagExpression {
                    expression: hook.options.tag_filter.clone().unwrap_or_default(),
                    source,
                })?;
            Ok(Arc::new(DefinedHook::new(
                hook.id,
                hook.options.name,
                hook.options.tag_filter,
                tag_expression,
                hook.function,
                hook.source_reference,
            )))
        })
        .collect()
}

#[track_caller]
fn caller_reference() -> SourceReference {
    let location = std::panic::Location::caller();
    SourceReference::from_call_site(location.file(), location.line(), location.column())
}
