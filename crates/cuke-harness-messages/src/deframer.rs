//! Reassembly of discrete envelopes from a chunked NDJSON byte stream.

use crate::collector::EnvelopeFromFile;

/// Reassembles envelopes from byte chunks arriving at arbitrary boundaries.
///
/// Complete lines are parsed as [`EnvelopeFromFile`] values; the trailing
/// partial line is retained for the next chunk. A malformed line is logged
/// and dropped without affecting subsequent lines, so one corrupt writer
/// never poisons the stream.
///
/// # Examples
/// ```
/// use cuke_harness_messages::MessagesDeframer;
///
/// let mut deframer = MessagesDeframer::new();
/// let line = br#"{"file":"a.feature","envelope":{"testRunFinished":{"testRunStartedId":"r","timestamp":{"seconds":0,"nanos":0},"success":true}}}"#;
/// let (head, tail) = line.split_at(20);
/// assert!(deframer.push(head).is_empty());
/// let mut items = deframer.push(tail);
/// items.extend(deframer.push(b"\n"));
/// assert_eq!(items.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MessagesDeframer {
    buffer: Vec<u8>,
}

impl MessagesDeframer {
    /// Create a deframer with an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every envelope completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<EnvelopeFromFile> {
        self.buffer.extend_from_slice(chunk);

        let mut items = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=newline).collect();
            line.pop();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_slice::<EnvelopeFromFile>(&line) {
                Ok(item) => items.push(item),
                Err(err) => {
                    log::warn!("could not parse a message line from a test: {err}");
                }
            }
        }
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{Envelope, TestRunStarted, Timestamp, UndefinedParameterType};
    use rstest::rstest;

    fn sample_items() -> Vec<EnvelopeFromFile> {
        vec![
            EnvelopeFromFile {
                file: "features/a.feature".into(),
                envelope: Envelope::TestRunStarted(TestRunStarted {
                    id: "run-1".into(),
                    timestamp: Timestamp::default(),
                }),
            },
            EnvelopeFromFile {
                file: "features/b.feature".into(),
                envelope: Envelope::UndefinedParameterType(UndefinedParameterType {
                    name: "thing".into(),
                    expression: "a {thing} appears".into(),
                }),
            },
        ]
    }

    fn encode(items: &[EnvelopeFromFile]) -> Vec<u8> {
        let mut bytes = Vec::new();
        for item in items {
            let line = serde_json::to_string(item).unwrap_or_else(|err| panic!("{err}"));
            bytes.extend_from_slice(line.as_bytes());
            bytes.push(b'\n');
        }
        bytes
    }

    #[rstest]
    #[case(1)]
    #[case(3)]
    #[case(7)]
    #[case(64)]
    fn reassembly_is_chunking_invariant(#[case] chunk_size: usize) {
        let items = sample_items();
        let bytes = encode(&items);

        let mut deframer = MessagesDeframer::new();
        let mut decoded = Vec::new();
        for chunk in bytes.chunks(chunk_size) {
            decoded.extend(deframer.push(chunk));
        }
        assert_eq!(decoded, items);
    }

    #[test]
    fn malformed_line_does_not_lose_following_lines() {
        let items = sample_items();
        let mut bytes = b"this is not json\n".to_vec();
        bytes.extend_from_slice(&encode(&items));

        let mut deframer = MessagesDeframer::new();
        let decoded = deframer.push(&bytes);
        assert_eq!(decoded, items);
    }

    #[test]
    fn partial_trailing_line_waits_for_more_input() {
        let items = sample_items();
        let bytes = encode(&items);
        let (head, tail) = bytes.split_at(bytes.len() - 10);

        let mut deframer = MessagesDeframer::new();
        let first = deframer.push(head);
        assert_eq!(first.len(), 1, "only the completed line should parse");
        let second = deframer.push(tail);
        assert_eq!(second.len(), 1);
    }

    #[test]
    fn blank_lines_are_ignored() {
        let mut deframer = MessagesDeframer::new();
        assert!(deframer.push(b"\n\n\n").is_empty());
    }
}
