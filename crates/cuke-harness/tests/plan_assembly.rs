//! Behavioural tests for test-plan assembly and deferred step resolution.

use cuke_harness::{
    HookOptions, PreparedStep, StepArgument, StepReturn, SupportCodeBuilder, make_test_plan,
    step_fn,
};
use cuke_harness_messages::{
    IdGenerator, Pickle, PickleDocString, PickleStep, PickleStepArgument, PickleTable,
    PickleTableCell, PickleTableRow, PickleTag,
};

fn pickle(name: &str, steps: Vec<PickleStep>, tags: &[&str]) -> Pickle {
    Pickle {
        id: format!("pickle-{name}"),
        uri: "features/demo.feature".into(),
        name: name.into(),
        language: "en".into(),
        steps,
        tags: tags
            .iter()
            .map(|tag| PickleTag {
                name: (*tag).to_string(),
                ast_node_id: None,
            })
            .collect(),
        ast_node_ids: vec![],
    }
}

fn pickle_step(id: &str, text: &str) -> PickleStep {
    PickleStep {
        id: id.into(),
        text: text.into(),
        step_type: None,
        argument: None,
        ast_node_ids: vec![],
    }
}

fn noop() -> cuke_harness::SupportCodeFn {
    step_fn!(|_t, _args| Ok(StepReturn::Done))
}

#[test]
fn steps_are_ordered_hooks_first_then_pickle_steps_then_reversed_after_hooks() {
    let mut builder = SupportCodeBuilder::new(IdGenerator::incrementing());
    builder.before(HookOptions::named("B1"), noop());
    builder.before(HookOptions::named("B2"), noop());
    builder.given("a step", noop());
    builder.after(HookOptions::named("A1"), noop());
    builder.after(HookOptions::named("A2"), noop());
    let library = builder.build().unwrap_or_else(|err| panic!("{err}"));

    let pickles = vec![pickle("ordering", vec![pickle_step("ps-1", "a step")], &[])];
    let plan = make_test_plan(&IdGenerator::incrementing(), &pickles, &library);

    let case = plan
        .test_cases
        .first()
        .unwrap_or_else(|| panic!("one test case"));
    let names: Vec<&str> = case.steps.iter().map(|step| step.name.as_str()).collect();
    assert_eq!(names, vec!["B1", "B2", "a step", "A2", "A1"]);

    let always: Vec<bool> = case.steps.iter().map(|step| step.always).collect();
    assert_eq!(always, vec![false, false, false, true, true]);
}

#[test]
fn hooks_not_matching_the_scenario_tags_are_omitted() {
    let mut builder = SupportCodeBuilder::new(IdGenerator::incrementing());
    builder.before(
        HookOptions::named("tagged").with_tag_filter("@needs-db"),
        noop(),
    );
    builder.given("a step", noop());
    let library = builder.build().unwrap_or_else(|err| panic!("{err}"));

    let untagged = vec![pickle("plain", vec![pickle_step("ps-1", "a step")], &[])];
    let plan = make_test_plan(&IdGenerator::incrementing(), &untagged, &library);
    let case = plan
        .test_cases
        .first()
        .unwrap_or_else(|| panic!("one test case"));
    assert_eq!(case.steps.len(), 1);

    let tagged = vec![pickle(
        "tagged",
        vec![pickle_step("ps-1", "a step")],
        &["@needs-db"],
    )];
    let plan = make_test_plan(&IdGenerator::incrementing(), &tagged, &library);
    let case = plan
        .test_cases
        .first()
        .unwrap_or_else(|| panic!("one test case"));
    assert_eq!(case.steps.len(), 2);
}

#[test]
fn unmatched_steps_assemble_and_defer_the_undefined_failure() {
    let library = SupportCodeBuilder::new(IdGenerator::incrementing())
        .build()
        .unwrap_or_else(|err| panic!("{err}"));
    let pickles = vec![pickle(
        "undefined",
        vec![pickle_step("ps-1", "nobody wrote me")],
        &[],
    )];
    let plan = make_test_plan(&IdGenerator::incrementing(), &pickles, &library);

    let step = plan
        .test_cases
        .first()
        .and_then(|case| case.steps.first())
        .unwrap_or_else(|| panic!("one step"));
    let prepared = step.prepare().unwrap_or_else(|err| panic!("{err}"));
    let PreparedStep::Undefined { pickle_step } = prepared else {
        panic!("expected an undefined preparation, got {prepared:?}");
    };
    assert_eq!(pickle_step.text, "nobody wrote me");
}

#[test]
fn multiple_matches_defer_the_ambiguous_failure_in_registration_order() {
    let mut builder = SupportCodeBuilder::new(IdGenerator::incrementing());
    builder.register_step(
        "the {word} step",
        noop(),
        cuke_harness::SourceReference::from_call_site("steps/first.rs", 11, 1),
    );
    builder.register_step(
        "the ambiguous {}",
        noop(),
        cuke_harness::SourceReference::from_call_site("steps/second.rs", 22, 1),
    );
    let library = builder.build().unwrap_or_else(|err| panic!("{err}"));

    let pickles = vec![pickle(
        "ambiguous",
        vec![pickle_step("ps-1", "the ambiguous step")],
        &[],
    )];
    let plan = make_test_plan(&IdGenerator::incrementing(), &pickles, &library);
    let step = plan
        .test_cases
        .first()
        .and_then(|case| case.steps.first())
        .unwrap_or_else(|| panic!("one step"));

    let prepared = step.prepare().unwrap_or_else(|err| panic!("{err}"));
    let PreparedStep::Ambiguous { text, locations } = prepared else {
        panic!("expected an ambiguous preparation, got {prepared:?}");
    };
    assert_eq!(text, "the ambiguous step");
    let uris: Vec<_> = locations
        .iter()
        .map(|reference| reference.uri.as_deref())
        .collect();
    assert_eq!(uris, vec![Some("steps/first.rs"), Some("steps/second.rs")]);
}

#[test]
fn exactly_one_match_resolves_values_and_trailing_table() {
    let mut builder = SupportCodeBuilder::new(IdGenerator::incrementing());
    builder.given("I have {int} users", noop());
    let library = builder.build().unwrap_or_else(|err| panic!("{err}"));

    let mut step = pickle_step("ps-1", "I have 2 users");
    step.argument = Some(PickleStepArgument {
        doc_string: None,
        data_table: Some(PickleTable {
            rows: vec![
                PickleTableRow {
                    cells: vec![PickleTableCell { value: "name".into() }],
                },
                PickleTableRow {
                    cells: vec![PickleTableCell { value: "ada".into() }],
                },
            ],
        }),
    });
    let pickles = vec![pickle("table", vec![step], &[])];
    let plan = make_test_plan(&IdGenerator::incrementing(), &pickles, &library);

    let prepared = plan
        .test_cases
        .first()
        .and_then(|case| case.steps.first())
        .unwrap_or_else(|| panic!("one step"))
        .prepare()
        .unwrap_or_else(|err| panic!("{err}"));
    let PreparedStep::Ready(runnable) = prepared else {
        panic!("expected a ready preparation, got {prepared:?}");
    };
    assert_eq!(
        runnable.values.first().and_then(|value| value.as_int()),
        Some(2)
    );
    let Some(StepArgument::Table(table)) = runnable.argument else {
        panic!("expected a trailing table");
    };
    assert_eq!(table.list(), vec!["name", "ada"]);
}

#[test]
fn doc_strings_contribute_their_raw_text() {
    let mut builder = SupportCodeBuilder::new(IdGenerator::incrementing());
    builder.given("this document", noop());
    let library = builder.build().unwrap_or_else(|err| panic!("{err}"));

    let mut step = pickle_step("ps-1", "this document");
    step.argument = Some(PickleStepArgument {
        doc_string: Some(PickleDocString {
            media_type: None,
            content: "line one\nline two".into(),
        }),
        data_table: None,
    });
    let pickles = vec![pickle("doc", vec![step], &[])];
    let plan = make_test_plan(&IdGenerator::incrementing(), &pickles, &library);

    let prepared = plan
        .test_cases
        .first()
        .and_then(|case| case.steps.first())
        .unwrap_or_else(|| panic!("one step"))
        .prepare()
        .unwrap_or_else(|err| panic!("{err}"));
    let PreparedStep::Ready(runnable) = prepared else {
        panic!("expected a ready preparation, got {prepared:?}");
    };
    assert_eq!(
        runnable.argument,
        Some(StepArgument::DocString("line one\nline two".into()))
    );
}

#[test]
fn plan_envelopes_carry_one_test_case_each() {
    let mut builder = SupportCodeBuilder::new(IdGenerator::incrementing());
    builder.given("a step", noop());
    let library = builder.build().unwrap_or_else(|err| panic!("{err}"));

    let pickles = vec![
        pickle("first", vec![pickle_step("ps-1", "a step")], &[]),
        pickle("second", vec![pickle_step("ps-2", "a step")], &[]),
    ];
    let plan = make_test_plan(&IdGenerator::incrementing(), &pickles, &library);
    let envelopes = plan.to_envelopes();
    assert_eq!(envelopes.len(), 2);
    assert!(envelopes.iter().all(|envelope| matches!(
        envelope,
        cuke_harness_messages::Envelope::TestCase(_)
    )));
}

#[test]
fn test_case_messages_describe_why_steps_matched() {
    let mut builder = SupportCodeBuilder::new(IdGenerator::incrementing());
    let definition_id = builder.given("I have {int} cukes", noop());
    let library = builder.build().unwrap_or_else(|err| panic!("{err}"));

    let pickles = vec![pickle(
        "message",
        vec![pickle_step("ps-1", "I have 42 cukes")],
        &[],
    )];
    let plan = make_test_plan(&IdGenerator::incrementing(), &pickles, &library);
    let message = plan
        .test_cases
        .first()
        .unwrap_or_else(|| panic!("one case"))
        .to_message();

    assert_eq!(message.pickle_id, "pickle-message");
    let step = message
        .test_steps
        .first()
        .unwrap_or_else(|| panic!("one step"));
    assert_eq!(step.pickle_step_id.as_deref(), Some("ps-1"));
    assert_eq!(
        step.step_definition_ids.clone().unwrap_or_default(),
        vec![definition_id]
    );
    let lists = step
        .step_match_arguments_lists
        .clone()
        .unwrap_or_default();
    let arguments = &lists
        .first()
        .unwrap_or_else(|| panic!("one list"))
        .step_match_arguments;
    let argument = arguments.first().unwrap_or_else(|| panic!("one argument"));
    assert_eq!(argument.parameter_type_name.as_deref(), Some("int"));
    assert_eq!(argument.group.value.as_deref(), Some("42"));
    assert_eq!(argument.group.start, Some(7));
}
