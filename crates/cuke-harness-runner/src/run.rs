//! The run front door: from compiled units to a complete message stream.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use cuke_harness::{SupportCodeLibrary, make_test_plan};
use cuke_harness_messages::{
    CompiledGherkin, Envelope, EnvelopeFromFile, EnvelopeSubject, IdGenerator, MessagesCollector,
    make_meta,
};

use crate::enrich::EventEnricher;
use crate::execution::execute_test_case;
use crate::host::StepHost;

/// Executes compiled feature files against a support-code library and
/// produces the canonical envelope stream.
///
/// Stream shape: `meta`, `testRunStarted`, per-file statics (`source`,
/// `gherkinDocument`, `pickle`), support-code statics, then per scenario the
/// `testCase` and lifecycle envelopes with correlated results, closed by
/// `testRunFinished`.
///
/// # Examples
/// ```no_run
/// use cuke_harness::SupportCodeBuilder;
/// use cuke_harness_messages::IdGenerator;
/// use cuke_harness_runner::{InlineHost, TestRun};
///
/// let library = SupportCodeBuilder::new(IdGenerator::uuid())
///     .build()
///     .unwrap_or_else(|err| panic!("{err}"));
/// let run = TestRun::new(library);
/// let mut host = InlineHost::new();
/// let envelopes = run.execute(&[], &mut host);
/// assert!(!envelopes.is_empty());
/// ```
pub struct TestRun {
    library: SupportCodeLibrary,
    ids: IdGenerator,
}

impl TestRun {
    /// Create a run over a built library, with UUID message ids.
    #[must_use]
    pub fn new(library: SupportCodeLibrary) -> Self {
        Self::with_ids(library, IdGenerator::uuid())
    }

    /// Create a run drawing message ids from an explicit generator.
    #[must_use]
    pub fn with_ids(library: SupportCodeLibrary, ids: IdGenerator) -> Self {
        Self { library, ids }
    }

    /// The library this run executes against.
    #[must_use]
    pub fn library(&self) -> &SupportCodeLibrary {
        &self.library
    }

    /// Execute every pickle of every compiled unit, in order, and return
    /// the complete, result-correlated envelope stream.
    #[must_use]
    pub fn execute(&self, units: &[CompiledGherkin], host: &mut dyn StepHost) -> Vec<Envelope> {
        let subject = Arc::new(EnvelopeSubject::new());
        let queue: Arc<Mutex<VecDeque<EnvelopeFromFile>>> = Arc::default();
        let sink = Arc::clone(&queue);
        subject.subscribe(move |item| {
            sink.lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push_back(item.clone());
        });

        let meta = make_meta("cuke-harness", env!("CARGO_PKG_VERSION"));
        let mut enricher = EventEnricher::new(meta, &self.ids);
        let mut out = enricher.preamble();

        for unit in units {
            let collector = MessagesCollector::new(unit.source.uri.clone(), Arc::clone(&subject));
            collector.push(Envelope::Source(unit.source.clone()));
            collector.push(Envelope::GherkinDocument(unit.gherkin_document.clone()));
            for pickle in &unit.pickles {
                collector.push(Envelope::Pickle(pickle.clone()));
            }
        }

        let support_collector = MessagesCollector::new("", Arc::clone(&subject));
        for envelope in self.library.to_envelopes() {
            support_collector.push(envelope);
        }

        for unit in units {
            let collector = MessagesCollector::new(unit.source.uri.clone(), Arc::clone(&subject));
            let plan = make_test_plan(&self.ids, &unit.pickles, &self.library);
            for test_case in &plan.test_cases {
                collector.push(Envelope::TestCase(test_case.to_message()));
                execute_test_case(test_case, &self.library, &self.ids, &collector, host);

                for event in host.drain_events() {
                    enricher.push_native(event);
                }
                let drained: Vec<EnvelopeFromFile> = {
                    let mut queue = queue
                        .lock()
                        .unwrap_or_else(std::sync::PoisonError::into_inner);
                    queue.drain(..).collect()
                };
                for item in drained {
                    enricher.push_envelope(item);
                }
                out.extend(enricher.drain());
            }
        }

        let drained: Vec<EnvelopeFromFile> = {
            let mut queue = queue
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            queue.drain(..).collect()
        };
        for item in drained {
            enricher.push_envelope(item);
        }
        out.extend(enricher.drain());
        out.extend(enricher.finish());
        out
    }
}

impl std::fmt::Debug for TestRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestRun").finish_non_exhaustive()
    }
}
