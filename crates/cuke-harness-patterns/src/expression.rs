//! Compiled step expressions and their match results.

use std::sync::Arc;

use regex::Regex;

use crate::errors::ExpressionError;
use crate::group::{CaptureEntry, CaptureGroup, build_group_tree};
use crate::lexer::{Token, lex};
use crate::parameter::{ParameterType, ParameterTypeRegistry, StepValue, TransformError};

/// Where a parameter's capture groups sit in the compiled regex.
#[derive(Debug, Clone)]
struct ParameterBinding {
    parameter: Arc<ParameterType>,
    /// Index of the parameter's outermost capture group.
    group_index: usize,
    /// Number of capturing groups nested in the parameter's own regexps.
    inner_groups: usize,
}

/// A step expression compiled against a parameter-type registry.
///
/// Compilation is eager and fallible; matching is infallible and returns
/// `None` for text the expression does not cover.
///
/// # Examples
/// ```
/// use cuke_harness_patterns::{Expression, ParameterTypeRegistry};
///
/// let registry = ParameterTypeRegistry::default();
/// let expression = Expression::compile("I have {int} cukes", &registry)
///     .unwrap_or_else(|err| panic!("{err}"));
/// let arguments = expression
///     .match_text("I have 42 cukes")
///     .unwrap_or_else(|| panic!("text should match"));
/// assert_eq!(arguments.len(), 1);
/// ```
#[derive(Debug)]
pub struct Expression {
    source: String,
    regex: Regex,
    parameters: Vec<ParameterBinding>,
}

impl Expression {
    /// Compile an expression source against the given registry.
    ///
    /// # Errors
    /// Returns [`ExpressionError::Syntax`] for malformed source,
    /// [`ExpressionError::UndefinedParameterType`] when a `{name}` placeholder
    /// references an unregistered type, and [`ExpressionError::Regex`] when
    /// the generated regular expression fails to compile.
    pub fn compile(
        source: &str,
        registry: &ParameterTypeRegistry,
    ) -> Result<Self, ExpressionError> {
        let tokens = lex(source)?;
        let mut pattern = String::with_capacity(source.len().saturating_mul(2) + 2);
        pattern.push('^');
        let mut group_index = 0usize;
        let mut parameters = Vec::new();

        for token in tokens {
            match token {
                Token::Literal(text) => pattern.push_str(&regex::escape(&text)),
                Token::Optional { text } => {
                    pattern.push_str("(?:");
                    pattern.push_str(&regex::escape(&text));
                    pattern.push_str(")?");
                }
                Token::Alternation { alternatives } => {
                    pattern.push_str("(?:");
                    for (index, alternative) in alternatives.iter().enumerate() {
                        if index > 0 {
                            pattern.push('|');
                        }
                        pattern.push_str(&regex::escape(alternative));
                    }
                    pattern.push(')');
                }
                Token::Parameter { name, .. } => {
                    let parameter = registry.lookup(&name)?;
                    group_index += 1;
                    let outer = group_index;
                    pattern.push('(');
                    for (index, regexp) in parameter.regexps().iter().enumerate() {
                        if index > 0 {
                            pattern.push('|');
                        }
                        pattern.push_str("(?:");
                        pattern.push_str(regexp);
                        pattern.push(')');
                    }
                    pattern.push(')');
                    let inner: usize = parameter
                        .regexps()
                        .iter()
                        .map(|regexp| count_capturing_groups(regexp))
                        .sum();
                    group_index += inner;
                    parameters.push(ParameterBinding {
                        parameter,
                        group_index: outer,
                        inner_groups: inner,
                    });
                }
            }
        }

        pattern.push('$');
        let regex = Regex::new(&pattern)?;
        Ok(Self {
            source: source.to_string(),
            regex,
            parameters,
        })
    }

    /// The original expression source.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The generated regular expression source, for diagnostics.
    #[must_use]
    pub fn regex_source(&self) -> &str {
        self.regex.as_str()
    }

    /// Match literal step text, returning one argument per parameter.
    ///
    /// Returns `None` when the text does not match the expression.
    #[must_use]
    pub fn match_text(&self, text: &str) -> Option<Vec<ExpressionArgument>> {
        let captures = self.regex.captures(text)?;
        let arguments = self
            .parameters
            .iter()
            .map(|binding| {
                let entries: Vec<CaptureEntry> = (binding.group_index
                    ..=binding.group_index + binding.inner_groups)
                    .map(|index| {
                        let found = captures.get(index);
                        (
                            found.map(|m| (m.start(), m.end())),
                            found.map(|m| m.as_str().to_string()),
                        )
                    })
                    .collect();
                ExpressionArgument {
                    parameter: Arc::clone(&binding.parameter),
                    group: build_group_tree(&entries),
                }
            })
            .collect();
        Some(arguments)
    }
}

/// One matched expression argument: the parameter type it belongs to and the
/// capture group tree it produced.
#[derive(Debug, Clone)]
pub struct ExpressionArgument {
    parameter: Arc<ParameterType>,
    group: CaptureGroup,
}

impl ExpressionArgument {
    /// Name of the parameter type that produced this argument.
    #[must_use]
    pub fn parameter_type_name(&self) -> &str {
        self.parameter.name()
    }

    /// The capture group tree for this argument.
    #[must_use]
    pub fn group(&self) -> &CaptureGroup {
        &self.group
    }

    /// Resolve the argument into the value passed to the step function,
    /// applying the parameter type's transformer.
    ///
    /// # Errors
    /// Returns the transformer's [`TransformError`] when conversion fails.
    pub fn resolve(&self) -> Result<StepValue, TransformError> {
        let flat = self.group.flatten();
        self.parameter.resolve(&flat)
    }
}

/// Count the capturing groups in a regular expression source.
///
/// Escapes, non-capturing `(?...)` groups and character classes are skipped.
fn count_capturing_groups(source: &str) -> usize {
    let mut count = 0;
    let mut escaped = false;
    let mut in_class = false;
    let mut chars = source.chars().peekable();
    while let Some(ch) = chars.next() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '[' if !in_class => in_class = true,
            ']' if in_class => in_class = false,
            '(' if !in_class => {
                if chars.peek() != Some(&'?') {
                    count += 1;
                }
            }
            _ => {}
        }
    }
    count
}
