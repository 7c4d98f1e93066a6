//! Per-file envelope collection feeding the shared subject.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::envelope::Envelope;
use crate::subject::EnvelopeSubject;

/// An envelope tagged with the feature file it originated from.
///
/// The file tag is what lets the stream merger correlate envelopes with the
/// native runner's per-file pass/fail events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeFromFile {
    /// URI of the originating feature file.
    pub file: String,
    /// The envelope itself.
    pub envelope: Envelope,
}

/// Collects envelopes produced while executing one feature file.
///
/// # Examples
/// ```
/// use std::sync::Arc;
/// use cuke_harness_messages::{
///     Envelope, EnvelopeSubject, MessagesCollector, TestRunStarted, Timestamp,
/// };
///
/// let subject = Arc::new(EnvelopeSubject::new());
/// let collector = MessagesCollector::new("features/demo.feature", Arc::clone(&subject));
/// collector.push(Envelope::TestRunStarted(TestRunStarted {
///     id: "run-1".into(),
///     timestamp: Timestamp::default(),
/// }));
/// ```
#[derive(Debug, Clone)]
pub struct MessagesCollector {
    file: String,
    subject: Arc<EnvelopeSubject>,
}

impl MessagesCollector {
    /// Create a collector for the given feature file.
    #[must_use]
    pub fn new(file: impl Into<String>, subject: Arc<EnvelopeSubject>) -> Self {
        Self {
            file: file.into(),
            subject,
        }
    }

    /// The feature file this collector tags envelopes with.
    #[must_use]
    pub fn file(&self) -> &str {
        &self.file
    }

    /// Forward an envelope to the subject, tagged with this collector's file.
    pub fn push(&self, envelope: Envelope) {
        self.subject.next(EnvelopeFromFile {
            file: self.file.clone(),
            envelope,
        });
    }
}
