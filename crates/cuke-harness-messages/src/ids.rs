//! Message id generation.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

/// Generates the ids stamped on protocol messages.
///
/// The UUID mode is the production default. The incrementing mode yields
/// `"0"`, `"1"`, `"2"`, … and exists so tests and fixtures produce stable,
/// diffable streams. Clones of an incrementing generator share one counter,
/// matching the single-sequence behaviour of an injected id function.
///
/// # Examples
/// ```
/// use cuke_harness_messages::IdGenerator;
///
/// let ids = IdGenerator::incrementing();
/// assert_eq!(ids.next_id(), "0");
/// assert_eq!(ids.next_id(), "1");
/// ```
#[derive(Debug, Clone)]
pub enum IdGenerator {
    /// Random UUID v4 ids.
    Uuid,
    /// Sequential ids from a shared counter.
    Incrementing(Arc<AtomicU64>),
}

impl IdGenerator {
    /// Create a UUID-based generator.
    #[must_use]
    pub fn uuid() -> Self {
        Self::Uuid
    }

    /// Create a deterministic incrementing generator starting at `0`.
    #[must_use]
    pub fn incrementing() -> Self {
        Self::Incrementing(Arc::new(AtomicU64::new(0)))
    }

    /// Produce the next id.
    #[must_use]
    pub fn next_id(&self) -> String {
        match self {
            Self::Uuid => Uuid::new_v4().to_string(),
            Self::Incrementing(counter) => counter.fetch_add(1, Ordering::Relaxed).to_string(),
        }
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::uuid()
    }
}
