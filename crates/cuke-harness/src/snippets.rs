//! Suggested step implementations for undefined steps.

use cuke_harness_messages::{PickleStep, PickleStepType, Snippet};
use cuke_harness_patterns::generate_expressions;

use crate::support::SupportCodeLibrary;

/// Generate implementation snippets for an unmatched pickle step.
///
/// One snippet is produced per generalized expression. The registration
/// method follows the step's keyword classification; steps of unknown kind
/// suggest `given`.
///
/// # Examples
/// ```
/// use cuke_harness_messages::{IdGenerator, PickleStep};
/// use cuke_harness::{SupportCodeBuilder, make_snippets};
///
/// let library = SupportCodeBuilder::new(IdGenerator::incrementing())
///     .build()
///     .unwrap_or_else(|err| panic!("{err}"));
/// let pickle_step = PickleStep {
///     id: "ps-1".into(),
///     text: "I have 42 cukes".into(),
///     step_type: None,
///     argument: None,
///     ast_node_ids: vec![],
/// };
/// let snippets = make_snippets(&pickle_step, &library);
/// assert!(snippets.iter().any(|snippet| snippet.code.contains("{int}")));
/// ```
#[must_use]
pub fn make_snippets(pickle_step: &PickleStep, library: &SupportCodeLibrary) -> Vec<Snippet> {
    let method = match pickle_step.step_type {
        Some(PickleStepType::Action) => "when",
        Some(PickleStepType::Outcome) => "then",
        Some(PickleStepType::Context | PickleStepType::Unknown) | None => "given",
    };

    generate_expressions(&pickle_step.text, library.parameter_registry())
        .into_iter()
        .map(|expression| {
            let mut bindings = String::new();
            for (index, info) in expression.parameter_infos.iter().enumerate() {
                let suffix = if info.count == 1 {
                    String::new()
                } else {
                    info.count.to_string()
                };
                bindings.push_str(&format!(
                    "    let {}{suffix} = &args.values[{index}];\n",
                    info.name
                ));
            }
            if let Some(argument) = &pickle_step.argument {
                if argument.data_table.is_some() {
                    bindings.push_str("    let data_table = args.argument;\n");
                } else if argument.doc_string.is_some() {
                    bindings.push_str("    let doc_string = args.argument;\n");
                }
            }
            let code = format!(
                "support.{method}(\"{}\", step_fn!(|t, args| {{\n{bindings}    t.todo();\n    Ok(StepReturn::Done)\n}}));",
                escape_rust_string(&expression.source)
            );
            Snippet {
                language: "rust".to_string(),
                code,
            }
        })
        .collect()
}

fn escape_rust_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            other => out.push(other),
        }
    }
    out
}
