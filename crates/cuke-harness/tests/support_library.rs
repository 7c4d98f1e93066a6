//! Behavioural tests for support-code registration and the built library.

use std::sync::Arc;

use cuke_harness::{
    HookOptions, ParameterTypeOptions, StepReturn, SupportCodeBuilder, step_fn,
};
use cuke_harness_messages::{Envelope, IdGenerator};
use cuke_harness_patterns::{StepValue, TransformError};

fn builder() -> SupportCodeBuilder {
    SupportCodeBuilder::new(IdGenerator::incrementing())
}

fn noop() -> cuke_harness::SupportCodeFn {
    step_fn!(|_t, _args| Ok(StepReturn::Done))
}

#[test]
fn find_all_steps_returns_every_match_with_arguments() {
    let mut builder = builder();
    builder.given("I have {int} cukes", noop());
    builder.when("I have {int} cukes", noop());
    builder.then("something unrelated", noop());
    let library = builder.build().unwrap_or_else(|err| panic!("{err}"));

    let matches = library.find_all_steps_by("I have 42 cukes");
    assert_eq!(matches.len(), 2);
    for matched in &matches {
        assert_eq!(matched.arguments.len(), 1);
        let value = matched
            .arguments
            .first()
            .unwrap_or_else(|| panic!("one argument"))
            .resolve()
            .unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(value.as_int(), Some(42));
    }
    assert!(library.find_all_steps_by("I have no cukes").is_empty());
}

#[test]
fn hooks_filter_by_tag_expression() {
    let mut builder = builder();
    builder.before(HookOptions::default(), noop());
    builder.before(
        HookOptions::named("provision").with_tag_filter("@uses-resources"),
        noop(),
    );
    builder.after(HookOptions::default().with_tag_filter("@a and @b"), noop());
    let library = builder.build().unwrap_or_else(|err| panic!("{err}"));

    let untagged = library.find_all_before_hooks_by(&[]);
    assert_eq!(untagged.len(), 1, "only the unfiltered hook applies");

    let tagged = library.find_all_before_hooks_by(&["@uses-resources".to_string()]);
    assert_eq!(tagged.len(), 2);

    assert!(
        library
            .find_all_after_hooks_by(&["@a".to_string()])
            .is_empty()
    );
    assert_eq!(
        library
            .find_all_after_hooks_by(&["@a".to_string(), "@b".to_string()])
            .len(),
        1
    );
}

#[test]
fn undefined_parameter_type_defers_and_drops_the_step() {
    let mut builder = builder();
    builder.given("I see a {thing}", noop());
    builder.given("I see a {thing}", noop());
    builder.given("a working step", noop());
    let library = builder.build().unwrap_or_else(|err| panic!("{err}"));

    let diagnostics = library.undefined_parameter_types();
    assert_eq!(diagnostics.len(), 1, "the pair must be deduplicated");
    let diagnostic = diagnostics.first().unwrap_or_else(|| panic!("one entry"));
    assert_eq!(diagnostic.name, "thing");
    assert_eq!(diagnostic.expression, "I see a {thing}");

    assert!(
        library.find_all_steps_by("I see a ghost").is_empty(),
        "the dropped step must not match any text"
    );

    let undefined_envelopes = library
        .to_envelopes()
        .into_iter()
        .filter(|envelope| matches!(envelope, Envelope::UndefinedParameterType(_)))
        .count();
    assert_eq!(undefined_envelopes, 1);
}

#[test]
fn malformed_step_expression_fails_the_build() {
    let mut builder = builder();
    builder.given("broken {", noop());
    let result = builder.build();
    assert!(result.is_err(), "bad pattern syntax must abort the build");
}

#[test]
fn malformed_tag_filter_fails_the_build() {
    let mut builder = builder();
    builder.before(HookOptions::default().with_tag_filter("@a and"), noop());
    assert!(builder.build().is_err());
}

#[test]
fn custom_parameter_types_transform_values() {
    let mut builder = builder();
    builder.parameter_type(
        ParameterTypeOptions::new("flight", vec![r"([A-Z]{3})-([A-Z]{3})".to_string()])
            .with_transformer(Arc::new(|groups| {
                let from = groups.get(1).copied().flatten().unwrap_or("");
                let to = groups.get(2).copied().flatten().unwrap_or("");
                if from == to {
                    return Err(TransformError::new("origin equals destination"));
                }
                Ok(StepValue::String(format!("{from}->{to}")))
            })),
    );
    builder.given("I book {flight}", noop());
    let library = builder.build().unwrap_or_else(|err| panic!("{err}"));

    let matches = library.find_all_steps_by("I book LHR-CDG");
    assert_eq!(matches.len(), 1);
    let value = matches
        .first()
        .and_then(|matched| matched.arguments.first())
        .unwrap_or_else(|| panic!("one argument"))
        .resolve()
        .unwrap_or_else(|err| panic!("{err}"));
    assert_eq!(value.as_str(), Some("LHR->CDG"));

    let failing = library.find_all_steps_by("I book LHR-LHR");
    let error = failing
        .first()
        .and_then(|matched| matched.arguments.first())
        .unwrap_or_else(|| panic!("one argument"))
        .resolve();
    assert!(error.is_err());
}

#[test]
fn library_envelopes_follow_the_canonical_order() {
    let mut builder = builder();
    builder.parameter_type(ParameterTypeOptions::new(
        "colour",
        vec!["red|green|blue".to_string()],
    ));
    builder.given("a {colour} light", noop());
    builder.given("a {missing} part", noop());
    builder.before(HookOptions::named("setup"), noop());
    builder.after(HookOptions::named("teardown"), noop());
    let library = builder.build().unwrap_or_else(|err| panic!("{err}"));

    let kinds: Vec<&'static str> = library
        .to_envelopes()
        .iter()
        .map(|envelope| match envelope {
            Envelope::ParameterType(_) => "parameterType",
            Envelope::StepDefinition(_) => "stepDefinition",
            Envelope::UndefinedParameterType(_) => "undefinedParameterType",
            Envelope::Hook(_) => "hook",
            _ => "other",
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            "parameterType",
            "stepDefinition",
            "undefinedParameterType",
            "hook",
            "hook",
        ]
    );
}

#[test]
fn registration_returns_distinct_ids() {
    let mut builder = builder();
    let first = builder.given("one step", noop());
    let second = builder.when("another step", noop());
    assert_ne!(first, second);
}
