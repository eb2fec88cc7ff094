//! Per-line JSON event parsing.

use serde_json::Value;

/// A line skipped because it is not valid JSON.
///
/// Carries enough context for the warning log; the skip never aborts the
/// rest of the blob.
#[derive(Debug)]
pub struct SkippedLine {
    /// Blob the line came from.
    pub blob: String,
    /// Zero-based position of the line within the blob.
    pub ordinal: usize,
    /// The parse failure.
    pub error: serde_json::Error,
}

/// Outcome of parsing one logical line.
#[derive(Debug)]
pub enum LineOutcome {
    /// A decoded JSON event, ready to hand to the sink.
    Event(Value),
    /// A malformed non-empty line.
    Skipped(SkippedLine),
    /// An empty line, silently dropped.
    Empty,
}

/// Parses logical lines from one blob, tracking line ordinals.
pub struct EventParser {
    blob: String,
    next_ordinal: usize,
}

impl EventParser {
    pub fn new(blob: impl Into<String>) -> Self {
        Self {
            blob: blob.into(),
            next_ordinal: 0,
        }
    }

    /// Parse the next logical line.
    pub fn parse(&mut self, line: &str) -> LineOutcome {
        let ordinal = self.next_ordinal;
        self.next_ordinal += 1;

        if line.is_empty() {
            return LineOutcome::Empty;
        }

        match serde_json::from_str(line) {
            Ok(value) => LineOutcome::Event(value),
            Err(error) => LineOutcome::Skipped(SkippedLine {
                blob: self.blob.clone(),
                ordinal,
                error,
            }),
        }
    }
}
