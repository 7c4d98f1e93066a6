//! Replay-buffering broadcast subject for envelope streams.

use std::sync::Mutex;

use crate::collector::EnvelopeFromFile;

type Subscriber = Box<dyn Fn(&EnvelopeFromFile) + Send + Sync>;

struct SubjectState {
    buffer: Vec<EnvelopeFromFile>,
    buffering: bool,
    subscribers: Vec<Subscriber>,
}

/// A broadcast subject that buffers early envelopes for late subscribers.
///
/// Static envelopes (sources, pickles, support-code metadata) are produced
/// before the first scenario runs, possibly before any reporter has attached.
/// The subject buffers every item until it observes a `testCaseStarted`
/// envelope; from that point all interested subscribers are assumed attached
/// and buffering stops. A new subscriber receives the buffered items replayed
/// synchronously before any live item.
///
/// Subscribers are invoked while the subject's lock is held; a subscriber
/// must not publish back into the same subject.
pub struct EnvelopeSubject {
    state: Mutex<SubjectState>,
}

impl EnvelopeSubject {
    /// Create an empty, buffering subject.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SubjectState {
                buffer: Vec::new(),
                buffering: true,
                subscribers: Vec::new(),
            }),
        }
    }

    /// Publish an item to all subscribers, buffering it when still in the
    /// pre-run phase.
    pub fn next(&self, item: EnvelopeFromFile) {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if item.envelope.is_test_case_started() {
            state.buffering = false;
        }
        if state.buffering {
            state.buffer.push(item.clone());
        }
        for subscriber in &state.subscribers {
            subscriber(&item);
        }
    }

    /// Attach a subscriber, replaying any buffered items first.
    pub fn subscribe(&self, handler: impl Fn(&EnvelopeFromFile) + Send + Sync + 'static) {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        for item in &state.buffer {
            handler(item);
        }
        state.subscribers.push(Box::new(handler));
    }
}

impl Default for EnvelopeSubject {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EnvelopeSubject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f.debug_struct("EnvelopeSubject")
            .field("buffered", &state.buffer.len())
            .field("buffering", &state.buffering)
            .field("subscribers", &state.subscribers.len())
            .finish()
    }
}
