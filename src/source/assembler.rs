//! Chunk-to-line assembly.
//!
//! Blob downloads arrive as arbitrary byte chunks with no alignment to
//! logical lines. `LineAssembler` accumulates chunks, splits on the
//! configured separator pattern, and carries the unterminated tail forward
//! so a line straddling any number of chunk boundaries is reassembled
//! intact.

use regex::Regex;
use snafu::prelude::*;

use crate::error::{ConfigError, InvalidSeparatorSnafu};

/// Stateful splitter turning a chunk sequence into complete logical lines.
///
/// One assembler instance owns the pending tail for exactly one blob.
pub struct LineAssembler {
    separator: Regex,
    /// Unterminated remainder after the last recognized separator.
    tail: String,
}

impl LineAssembler {
    /// Create an assembler with the given separator pattern.
    pub fn new(pattern: &str) -> Result<Self, ConfigError> {
        let separator = Regex::new(pattern).context(InvalidSeparatorSnafu { pattern })?;
        Ok(Self {
            separator,
            tail: String::new(),
        })
    }

    /// Feed a decoded chunk, returning every line completed by it.
    ///
    /// The segment after the last separator is retained as the new tail; the
    /// next chunk may complete or extend it. A separator run that straddles
    /// a chunk boundary can surface an empty segment here; callers drop
    /// empty lines.
    pub fn feed(&mut self, chunk: &str) -> Vec<String> {
        self.tail.push_str(chunk);

        let mut segments: Vec<String> = self.separator.split(&self.tail).map(String::from).collect();
        // split always yields at least one segment
        self.tail = segments.pop().unwrap_or_default();
        segments
    }

    /// Flush the retained tail as a final line, if non-empty.
    pub fn finish(&mut self) -> Option<String> {
        if self.tail.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.tail))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_LINE_SEPARATOR;

    fn assemble(content: &str, chunk_size: usize, pattern: &str) -> Vec<String> {
        let mut assembler = LineAssembler::new(pattern).unwrap();
        let chars: Vec<char> = content.chars().collect();
        let mut lines = Vec::new();
        for chunk in chars.chunks(chunk_size.max(1)) {
            let chunk: String = chunk.iter().collect();
            lines.extend(assembler.feed(&chunk));
        }
        lines.extend(assembler.finish());
        lines
    }

    fn whole(content: &str, pattern: &str) -> Vec<String> {
        let re = Regex::new(pattern).unwrap();
        re.split(content)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }

    #[test]
    fn line_completed_across_boundary() {
        let mut assembler = LineAssembler::new(r"\n").unwrap();
        assert_eq!(assembler.feed("{\"a\":1}\n{\""), vec!["{\"a\":1}"]);
        assert_eq!(assembler.feed("b\":2}\n"), vec!["{\"b\":2}"]);
        assert_eq!(assembler.finish(), None);
    }

    #[test]
    fn unterminated_tail_flushed_on_finish() {
        let mut assembler = LineAssembler::new(r"\n").unwrap();
        assert_eq!(assembler.feed("first\nsec"), vec!["first"]);
        assert_eq!(assembler.feed("ond"), Vec::<String>::new());
        assert_eq!(assembler.finish(), Some("second".to_string()));
        // finish is idempotent once drained
        assert_eq!(assembler.finish(), None);
    }

    #[test]
    fn multi_character_separator_run() {
        let mut assembler = LineAssembler::new(r"[\r\n]+").unwrap();
        assert_eq!(assembler.feed("a\r\n\r\nb\r\n"), vec!["a", "b"]);
        assert_eq!(assembler.finish(), None);
    }

    #[test]
    fn chunking_is_immaterial() {
        let content = "{\"a\":1}\n{\"b\":2}\r\n{\"c\":3}\u{2028}{\"d\":4}\ntail-no-sep";
        let expected = whole(content, DEFAULT_LINE_SEPARATOR);
        for chunk_size in 1..=content.chars().count() {
            let lines: Vec<String> = assemble(content, chunk_size, DEFAULT_LINE_SEPARATOR)
                .into_iter()
                .filter(|l| !l.is_empty())
                .collect();
            assert_eq!(lines, expected, "chunk_size={chunk_size}");
        }
    }

    #[test]
    fn separator_run_straddling_boundary_yields_only_empties() {
        // "a\r" | "\nb": the straddled run surfaces an empty segment, which
        // callers drop; the non-empty line set matches a whole-content split.
        let mut assembler = LineAssembler::new(r"[\r\n]+").unwrap();
        let mut lines = assembler.feed("a\r");
        lines.extend(assembler.feed("\nb"));
        lines.extend(assembler.finish());
        let non_empty: Vec<&String> = lines.iter().filter(|l| !l.is_empty()).collect();
        assert_eq!(non_empty, ["a", "b"]);
    }

    #[test]
    fn empty_content_produces_nothing() {
        let mut assembler = LineAssembler::new(r"\n").unwrap();
        assert!(assembler.feed("").is_empty());
        assert_eq!(assembler.finish(), None);
    }

    #[test]
    fn separator_only_content_produces_no_lines() {
        let lines = assemble("\n\r\n\n", 2, DEFAULT_LINE_SEPARATOR);
        assert!(lines.iter().all(|l| l.is_empty()));
    }
}
