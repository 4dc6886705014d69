//! The text of one target file plus a line index over it.
//!
//! A [`TargetDocument`] is never mutated in place. Splicing produces a new
//! document, so a patch run can always fall back to the text it started with.

use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDocument {
    text: String,
    /// Byte offset of the first character of every line.
    line_starts: Vec<usize>,
}

impl TargetDocument {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut line_starts = vec![0];
        for (idx, byte) in text.bytes().enumerate() {
            if byte == b'\n' && idx + 1 < text.len() {
                line_starts.push(idx + 1);
            }
        }
        Self { text, line_starts }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Number of lines. An empty document has a single empty line.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Zero-based index of the line containing `offset`.
    ///
    /// Offsets past the end resolve to the last line.
    pub fn line_index(&self, offset: usize) -> usize {
        self.line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1)
    }

    /// Byte span of a line, including its trailing newline if it has one.
    pub fn line_span(&self, line: usize) -> Range<usize> {
        let line = line.min(self.line_count() - 1);
        let start = self.line_starts[line];
        let end = self
            .line_starts
            .get(line + 1)
            .copied()
            .unwrap_or(self.text.len());
        start..end
    }

    /// Text of a line without its line terminator.
    pub fn line(&self, line: usize) -> &str {
        let span = self.line_span(line);
        self.text[span]
            .trim_end_matches('\n')
            .trim_end_matches('\r')
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> + '_ {
        (0..self.line_count()).map(move |idx| self.line(idx))
    }

    /// Whether the given line ends with a newline character.
    pub fn line_terminated(&self, line: usize) -> bool {
        self.text[self.line_span(line)].ends_with('\n')
    }

    /// Byte range covering `first..=last` lines, clamped to the document.
    pub fn window(&self, first: usize, last: usize) -> Range<usize> {
        let last = last.min(self.line_count() - 1);
        let first = first.min(last);
        self.line_starts[first]..self.line_span(last).end
    }

    /// Byte range of the lines around `span`, widened by `context` lines on
    /// both sides.
    pub fn context_window(&self, span: Range<usize>, context: usize) -> Range<usize> {
        let first = self.line_index(span.start).saturating_sub(context);
        let last = self
            .line_index(span.end.saturating_sub(1).max(span.start))
            .saturating_add(context);
        self.window(first, last)
    }

    /// Leading whitespace of a line.
    pub fn indentation(&self, line: usize) -> &str {
        let text = self.line(line);
        let trimmed = text.trim_start_matches([' ', '\t']);
        &text[..text.len() - trimmed.len()]
    }

    /// Line terminator used by this document.
    pub fn newline(&self) -> &'static str {
        if self.text.contains("\r\n") {
            "\r\n"
        } else {
            "\n"
        }
    }

    /// Produce a new document with `range` replaced by `replacement`.
    ///
    /// Callers are responsible for range validity; see [`crate::edit::Edit`]
    /// for the checked path.
    pub(crate) fn splice(&self, range: Range<usize>, replacement: &str) -> Self {
        let mut text =
            String::with_capacity(self.text.len() + replacement.len() - (range.end - range.start));
        text.push_str(&self.text[..range.start]);
        text.push_str(replacement);
        text.push_str(&self.text[range.end..]);
        Self::new(text)
    }
}

impl From<String> for TargetDocument {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl From<&str> for TargetDocument {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}
