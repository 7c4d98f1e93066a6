//! Generation of candidate step expressions from literal step text.
//!
//! When no step definition matches a pickle step, the runner suggests
//! implementations. Each suggestion needs an expression generalizing the
//! literal text: spans matched by snippet-eligible parameter types are
//! replaced by `{name}` placeholders. Several types matching the same span
//! produce one generated expression per candidate, bounded to keep the
//! combinatorial product small.

use regex::Regex;

use crate::parameter::ParameterTypeRegistry;

/// Upper bound on generated expressions per step text.
const MAX_EXPRESSIONS: usize = 16;

/// A `{name}` placeholder occurrence in a generated expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterInfo {
    /// Parameter type name.
    pub name: String,
    /// 1-based occurrence index of this name within the expression, used to
    /// derive unique argument names in snippets.
    pub count: usize,
}

/// A generated step expression with its placeholder occurrences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedExpression {
    /// The expression source, literal spans escaped.
    pub source: String,
    /// Placeholder occurrences in order of appearance.
    pub parameter_infos: Vec<ParameterInfo>,
}

#[derive(Debug, Clone)]
struct Candidate {
    start: usize,
    end: usize,
    name: String,
    prefer: bool,
    order: usize,
}

/// Generalize literal step text into candidate expressions.
///
/// Types registered with `use_for_snippets` participate; the anonymous type
/// never does. When no type matches anywhere in the text the single result is
/// the escaped literal text. Candidates starting at the same offset branch
/// into separate expressions, preferred-for-regexp-match types first, then
/// registration order.
#[must_use]
pub fn generate_expressions(
    text: &str,
    registry: &ParameterTypeRegistry,
) -> Vec<GeneratedExpression> {
    let mut candidates = collect_candidates(text, registry);
    candidates.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then_with(|| b.prefer.cmp(&a.prefer))
            .then_with(|| a.order.cmp(&b.order))
            .then_with(|| b.end.cmp(&a.end))
    });

    let mut expressions = Vec::new();
    expand(
        text,
        &candidates,
        0,
        &mut String::new(),
        &mut Vec::new(),
        &mut expressions,
    );
    expressions
}

fn collect_candidates(text: &str, registry: &ParameterTypeRegistry) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = Vec::new();
    for (order, parameter_type) in registry.iter().enumerate() {
        if !parameter_type.use_for_snippets() || parameter_type.name().is_empty() {
            continue;
        }
        for source in parameter_type.regexps() {
            // Regexp sources were validated when the type was defined.
            let Ok(regex) = Regex::new(source) else {
                continue;
            };
            for found in regex.find_iter(text) {
                if found.is_empty() {
                    continue;
                }
                let duplicate = candidates.iter().any(|existing| {
                    existing.start == found.start()
                        && existing.end == found.end()
                        && existing.name == parameter_type.name()
                });
                if !duplicate {
                    candidates.push(Candidate {
                        start: found.start(),
                        end: found.end(),
                        name: parameter_type.name().to_string(),
                        prefer: parameter_type.prefer_for_regexp_match(),
                        order,
                    });
                }
            }
        }
    }
    candidates
}

fn expand(
    text: &str,
    candidates: &[Candidate],
    pos: usize,
    source: &mut String,
    names: &mut Vec<String>,
    out: &mut Vec<GeneratedExpression>,
) {
    if out.len() >= MAX_EXPRESSIONS {
        return;
    }

    let next_start = candidates
        .iter()
        .filter(|candidate| candidate.start >= pos)
        .map(|candidate| candidate.start)
        .min();

    let Some(start) = next_start else {
        let mut full = source.clone();
        full.push_str(&escape_expression_text(text.get(pos..).unwrap_or("")));
        out.push(GeneratedExpression {
            source: full,
            parameter_infos: number_occurrences(names),
        });
        return;
    };

    for candidate in candidates
        .iter()
        .filter(|candidate| candidate.start == start)
    {
        if out.len() >= MAX_EXPRESSIONS {
            return;
        }
        let rollback_source = source.len();
        let rollback_names = names.len();
        source.push_str(&escape_expression_text(text.get(pos..start).unwrap_or("")));
        source.push('{');
        source.push_str(&candidate.name);
        source.push('}');
        names.push(candidate.name.clone());
        expand(text, candidates, candidate.end, source, names, out);
        source.truncate(rollback_source);
        names.truncate(rollback_names);
    }
}

fn number_occurrences(names: &[String]) -> Vec<ParameterInfo> {
    names
        .iter()
        .enumerate()
        .map(|(index, name)| ParameterInfo {
            name: name.clone(),
            count: names
                .iter()
                .take(index + 1)
                .filter(|previous| *previous == name)
                .count(),
        })
        .collect()
}

/// Escape characters that carry meaning in expression source.
fn escape_expression_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '\\' | '{' | '}' | '(' | ')' | '/') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
