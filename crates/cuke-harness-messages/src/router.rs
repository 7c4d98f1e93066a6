//! Prefix-framed envelope routing through a host diagnostic channel.
//!
//! When execution happens inside a host test runner that already owns a
//! per-test diagnostic side channel, envelopes piggy-back on it instead of
//! requiring a dedicated transport: each envelope is serialized on one line
//! behind a protocol marker that lets the consumer tell envelope lines from
//! ordinary diagnostics.

use std::sync::Mutex;

use crate::envelope::Envelope;

/// Marker prefixed to serialized envelopes on the diagnostic channel.
pub const PROTOCOL_PREFIX: &str = "cuke-harness-messages:";

type DiagnosticSink = Box<dyn Fn(&str) + Send + Sync>;

struct RouterState {
    queue: Vec<Envelope>,
    sink: Option<DiagnosticSink>,
}

/// Routes envelopes into a diagnostic sink, queueing until one is connected.
///
/// Envelopes pushed before [`DiagnosticRouter::connect`] are buffered and
/// flushed in order the moment the sink attaches.
///
/// # Examples
/// ```
/// use std::sync::{Arc, Mutex};
/// use cuke_harness_messages::{
///     DiagnosticRouter, Envelope, PROTOCOL_PREFIX, TestRunStarted, Timestamp,
/// };
///
/// let router = DiagnosticRouter::new();
/// router.push(Envelope::TestRunStarted(TestRunStarted {
///     id: "run-1".into(),
///     timestamp: Timestamp::default(),
/// }));
///
/// let lines: Arc<Mutex<Vec<String>>> = Arc::default();
/// let sink = Arc::clone(&lines);
/// router.connect(move |line| {
///     sink.lock().unwrap().push(line.to_string());
/// });
///
/// let lines = lines.lock().unwrap();
/// assert!(lines[0].starts_with(PROTOCOL_PREFIX));
/// ```
pub struct DiagnosticRouter {
    state: Mutex<RouterState>,
}

impl DiagnosticRouter {
    /// Create a router with no connected sink.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RouterState {
                queue: Vec::new(),
                sink: None,
            }),
        }
    }

    /// Attach the diagnostic sink and flush any queued envelopes.
    pub fn connect(&self, sink: impl Fn(&str) + Send + Sync + 'static) {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        for envelope in state.queue.drain(..) {
            emit(&sink, &envelope);
        }
        state.sink = Some(Box::new(sink));
    }

    /// Route an envelope to the sink, or queue it when none is connected.
    pub fn push(&self, envelope: Envelope) {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        match &state.sink {
            Some(sink) => emit(sink, &envelope),
            None => state.queue.push(envelope),
        }
    }
}

impl Default for DiagnosticRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DiagnosticRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f.debug_struct("DiagnosticRouter")
            .field("queued", &state.queue.len())
            .field("connected", &state.sink.is_some())
            .finish()
    }
}

fn emit(sink: &impl Fn(&str), envelope: &Envelope) {
    match serde_json::to_string(envelope) {
        Ok(json) => sink(&format!("{PROTOCOL_PREFIX}{json}")),
        Err(err) => log::warn!("could not serialize an envelope for the diagnostic channel: {err}"),
    }
}

/// Parse a diagnostic line back into an envelope, when it carries the
/// protocol marker.
#[must_use]
pub fn from_prefixed(line: &str) -> Option<Envelope> {
    let json = line.strip_prefix(PROTOCOL_PREFIX)?;
    match serde_json::from_str(json) {
        Ok(envelope) => Some(envelope),
        Err(err) => {
            log::warn!("could not parse a prefixed envelope line: {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{TestRunStarted, Timestamp};
    use std::sync::{Arc, Mutex};

    fn run_started(id: &str) -> Envelope {
        Envelope::TestRunStarted(TestRunStarted {
            id: id.into(),
            timestamp: Timestamp::default(),
        })
    }

    fn collecting_sink() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) + Send + Sync) {
        let lines: Arc<Mutex<Vec<String>>> = Arc::default();
        let sink = Arc::clone(&lines);
        (lines, move |line: &str| {
            sink.lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push(line.to_string());
        })
    }

    #[test]
    fn queues_until_connected_then_flushes_in_order() {
        let router = DiagnosticRouter::new();
        router.push(run_started("run-1"));
        router.push(run_started("run-2"));

        let (lines, sink) = collecting_sink();
        router.connect(sink);
        router.push(run_started("run-3"));

        let lines = lines
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        assert_eq!(lines.len(), 3);
        assert!(lines.iter().all(|line| line.starts_with(PROTOCOL_PREFIX)));
        let order: Vec<bool> = lines
            .iter()
            .map(|line| line.contains("run-1") || line.contains("run-3"))
            .collect();
        assert_eq!(order, vec![true, false, true]);
    }

    #[test]
    fn prefixed_lines_round_trip() {
        let router = DiagnosticRouter::new();
        let (lines, sink) = collecting_sink();
        router.connect(sink);
        router.push(run_started("run-9"));

        let lines = lines
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let line = lines.first().unwrap_or_else(|| panic!("one line expected"));
        let envelope = from_prefixed(line).unwrap_or_else(|| panic!("line should parse"));
        assert_eq!(envelope, run_started("run-9"));
    }

    #[test]
    fn unprefixed_lines_are_not_envelopes() {
        assert!(from_prefixed("ordinary diagnostic output").is_none());
    }
}
