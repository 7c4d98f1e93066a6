//! Merging the host's native events with the envelope stream.
//!
//! `testStepFinished` envelopes leave the execution engine without results,
//! because the host reports pass/fail through its own event channel. The
//! enricher joins the two streams: the Nth `testStepFinished` envelope for a
//! given feature file pairs with the Nth step-level native event from that
//! file. An envelope whose native counterpart has not arrived yet stays
//! queued, and everything behind it waits, preserving order.

use std::collections::{HashMap, VecDeque};

use cuke_harness_messages::{
    Envelope, EnvelopeFromFile, IdGenerator, Meta, TestRunFinished, TestRunStarted,
    TestStepFinished, TestStepStarted, Timestamp,
};

use crate::host::{NativeEvent, STEP_NESTING};
use crate::result::{is_non_success, map_step_result};

/// Correlates native events with envelopes and produces the canonical,
/// result-complete stream.
#[derive(Debug)]
pub struct EventEnricher {
    meta: Meta,
    test_run_started_id: String,
    success: bool,
    native_by_file: HashMap<String, Vec<NativeEvent>>,
    step_keys_by_file: HashMap<String, Vec<String>>,
    pending: VecDeque<EnvelopeFromFile>,
}

impl EventEnricher {
    /// Create an enricher for one run.
    #[must_use]
    pub fn new(meta: Meta, ids: &IdGenerator) -> Self {
        Self {
            meta,
            test_run_started_id: ids.next_id(),
            success: true,
            native_by_file: HashMap::new(),
            step_keys_by_file: HashMap::new(),
            pending: VecDeque::new(),
        }
    }

    /// The id stamped on `testCase` envelopes and the final
    /// `testRunFinished`.
    #[must_use]
    pub fn test_run_started_id(&self) -> &str {
        &self.test_run_started_id
    }

    /// Whether every correlated result so far is compatible with a
    /// successful run.
    #[must_use]
    pub fn success(&self) -> bool {
        self.success
    }

    /// The stream's opening envelopes: `meta` then `testRunStarted`.
    #[must_use]
    pub fn preamble(&self) -> Vec<Envelope> {
        vec![
            Envelope::Meta(self.meta.clone()),
            Envelope::TestRunStarted(TestRunStarted {
                id: self.test_run_started_id.clone(),
                timestamp: Timestamp::now(),
            }),
        ]
    }

    /// Feed one native event from the host's channel. Events above step
    /// nesting are ignored.
    pub fn push_native(&mut self, event: NativeEvent) {
        if event.nesting == STEP_NESTING {
            self.native_by_file
                .entry(event.file.clone())
                .or_default()
                .push(event);
        }
    }

    /// Queue one envelope from the collector stream.
    pub fn push_envelope(&mut self, item: EnvelopeFromFile) {
        self.pending.push_back(item);
    }

    /// Release every queued envelope whose dependencies are satisfied, in
    /// order. Stops at the first `testStepFinished` still waiting for its
    /// native event.
    pub fn drain(&mut self) -> Vec<Envelope> {
        let mut out = Vec::new();
        loop {
            let ready = match self.pending.front() {
                None => break,
                Some(item) => match &item.envelope {
                    Envelope::TestStepFinished(finished) => {
                        self.native_for(&item.file, finished).is_some()
                    }
                    _ => true,
                },
            };
            if !ready {
                break;
            }
            let Some(item) = self.pending.pop_front() else {
                break;
            };
            out.push(self.process(item));
        }
        out
    }

    /// Release everything still queued, then close the stream with
    /// `testRunFinished`.
    ///
    /// A `testStepFinished` whose native event never arrived keeps its
    /// `UNKNOWN` result and is logged; it does not fail the run.
    #[must_use]
    pub fn finish(mut self) -> Vec<Envelope> {
        let mut out = Vec::new();
        while let Some(item) = self.pending.pop_front() {
            if let Envelope::TestStepFinished(finished) = &item.envelope {
                if self.native_for(&item.file, finished).is_none() {
                    log::warn!(
                        "no native event correlated with test step {} in {}",
                        finished.test_step_id,
                        item.file
                    );
                }
            }
            out.push(self.process(item));
        }
        out.push(Envelope::TestRunFinished(TestRunFinished {
            test_run_started_id: self.test_run_started_id,
            timestamp: Timestamp::now(),
            success: self.success,
        }));
        out
    }

    fn process(&mut self, item: EnvelopeFromFile) -> Envelope {
        match item.envelope {
            Envelope::TestCase(mut test_case) => {
                test_case.test_run_started_id = Some(self.test_run_started_id.clone());
                Envelope::TestCase(test_case)
            }
            Envelope::TestStepStarted(started) => {
                self.step_keys_by_file
                    .entry(item.file)
                    .or_default()
                    .push(derive_key(&started.test_case_started_id, &started.test_step_id));
                Envelope::TestStepStarted(started)
            }
            Envelope::TestStepFinished(mut finished) => {
                if let Some(event) = self.native_for(&item.file, &finished) {
                    finished.test_step_result = map_step_result(event);
                    if is_non_success(&finished.test_step_result) {
                        self.success = false;
                    }
                }
                Envelope::TestStepFinished(finished)
            }
            other => other,
        }
    }

    fn native_for(&self, file: &str, finished: &TestStepFinished) -> Option<&NativeEvent> {
        let key = derive_key(&finished.test_case_started_id, &finished.test_step_id);
        let index = self
            .step_keys_by_file
            .get(file)?
            .iter()
            .position(|existing| *existing == key)?;
        self.native_by_file.get(file)?.get(index)
    }
}

fn derive_key(test_case_started_id: &str, test_step_id: &str) -> String {
    format!("{test_case_started_id}/{test_step_id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::NativeVerdict;
    use cuke_harness_messages::make_meta;

    fn enricher() -> EventEnricher {
        EventEnricher::new(
            make_meta("cuke-harness", "0.0.0"),
            &IdGenerator::incrementing(),
        )
    }

    fn started(step: &str) -> EnvelopeFromFile {
        EnvelopeFromFile {
            file: "features/a.feature".into(),
            envelope: Envelope::TestStepStarted(TestStepStarted {
                test_case_started_id: "tcs-1".into(),
                test_step_id: step.into(),
                timestamp: Timestamp::default(),
            }),
        }
    }

    fn finished(step: &str) -> EnvelopeFromFile {
        EnvelopeFromFile {
            file: "features/a.feature".into(),
            envelope: Envelope::TestStepFinished(TestStepFinished {
                test_case_started_id: "tcs-1".into(),
                test_step_id: step.into(),
                test_step_result: cuke_harness_messages::TestStepResult::default(),
                timestamp: Timestamp::default(),
            }),
        }
    }

    fn native(verdict: NativeVerdict) -> NativeEvent {
        NativeEvent {
            file: "features/a.feature".into(),
            nesting: STEP_NESTING,
            name: "step".into(),
            verdict,
            duration_millis: 0,
        }
    }

    #[test]
    fn finished_waits_for_its_native_event() {
        let mut enricher = enricher();
        enricher.push_envelope(started("ts-1"));
        enricher.push_envelope(finished("ts-1"));

        let first = enricher.drain();
        assert_eq!(first.len(), 1, "finished must wait for the native event");

        enricher.push_native(native(NativeVerdict::Passed));
        let second = enricher.drain();
        assert_eq!(second.len(), 1);
        let Some(Envelope::TestStepFinished(step_finished)) = second.first() else {
            panic!("expected the finished envelope, got {second:?}");
        };
        assert_eq!(
            step_finished.test_step_result.status,
            cuke_harness_messages::TestStepResultStatus::Passed
        );
    }

    #[test]
    fn a_waiting_envelope_blocks_everything_behind_it() {
        let mut enricher = enricher();
        enricher.push_envelope(started("ts-1"));
        enricher.push_envelope(finished("ts-1"));
        enricher.push_envelope(started("ts-2"));
        assert_eq!(enricher.drain().len(), 1, "order must be preserved");
    }

    #[test]
    fn failing_results_flip_the_success_flag() {
        let mut enricher = enricher();
        enricher.push_envelope(started("ts-1"));
        enricher.push_envelope(finished("ts-1"));
        enricher.push_native(native(NativeVerdict::Failed {
            message: "boom".into(),
            exception_type: None,
        }));
        let _ = enricher.drain();
        assert!(!enricher.success());
    }

    #[test]
    fn skipped_results_keep_the_run_successful() {
        let mut enricher = enricher();
        enricher.push_envelope(started("ts-1"));
        enricher.push_envelope(finished("ts-1"));
        enricher.push_native(native(NativeVerdict::Skipped));
        let _ = enricher.drain();
        assert!(enricher.success());
    }

    #[test]
    fn test_cases_are_stamped_with_the_run_id() {
        let mut enricher = enricher();
        let run_id = enricher.test_run_started_id().to_string();
        enricher.push_envelope(EnvelopeFromFile {
            file: "features/a.feature".into(),
            envelope: Envelope::TestCase(cuke_harness_messages::TestCase {
                id: "tc-1".into(),
                test_run_started_id: None,
                pickle_id: "p-1".into(),
                test_steps: vec![],
            }),
        });
        let out = enricher.drain();
        let Some(Envelope::TestCase(test_case)) = out.first() else {
            panic!("expected a testCase envelope");
        };
        assert_eq!(test_case.test_run_started_id.as_deref(), Some(run_id.as_str()));
    }

    #[test]
    fn finish_closes_with_the_computed_success() {
        let mut enricher = enricher();
        enricher.push_envelope(started("ts-1"));
        enricher.push_envelope(finished("ts-1"));
        enricher.push_native(native(NativeVerdict::Pending));
        let _ = enricher.drain();
        let out = enricher.finish();
        let Some(Envelope::TestRunFinished(run_finished)) = out.last() else {
            panic!("expected testRunFinished last");
        };
        assert!(!run_finished.success, "pending steps fail the run");
    }

    #[test]
    fn preamble_is_meta_then_test_run_started() {
        let enricher = enricher();
        let preamble = enricher.preamble();
        assert!(matches!(preamble.first(), Some(Envelope::Meta(_))));
        assert!(matches!(
            preamble.last(),
            Some(Envelope::TestRunStarted(_))
        ));
    }
}
