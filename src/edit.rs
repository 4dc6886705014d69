use crate::document::TargetDocument;
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// The splice primitive: byte-span replacement with verification.
///
/// Every rewrite transform compiles down to one `Edit`. Intelligence lives in
/// locating the span, not in applying it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "Edit does nothing until apply_to() is called"]
pub struct Edit {
    /// Starting byte offset (inclusive)
    pub byte_start: usize,
    /// Ending byte offset (exclusive)
    pub byte_end: usize,
    /// New text to insert at [byte_start, byte_end)
    pub new_text: String,
    /// What we expect to find at the span before applying
    pub expected_before: EditVerification,
}

/// Verification strategy for edit safety.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditVerification {
    /// Exact text match required
    ExactMatch(String),
    /// xxh3 hash of expected text (cheaper to carry for large spans)
    Hash(u64),
}

impl EditVerification {
    pub fn matches(&self, text: &str) -> bool {
        match self {
            EditVerification::ExactMatch(expected) => text == expected,
            EditVerification::Hash(expected_hash) => xxh3_64(text.as_bytes()) == *expected_hash,
        }
    }

    /// Create verification from text, using hash for text over 1KB.
    pub fn from_text(text: &str) -> Self {
        if text.len() > 1024 {
            EditVerification::Hash(xxh3_64(text.as_bytes()))
        } else {
            EditVerification::ExactMatch(text.to_string())
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("before-text verification failed at [{byte_start}, {byte_end})")]
    BeforeTextMismatch {
        byte_start: usize,
        byte_end: usize,
        found: String,
    },

    #[error("invalid byte range: [{byte_start}, {byte_end}) in document of length {len}")]
    InvalidByteRange {
        byte_start: usize,
        byte_end: usize,
        len: usize,
    },

    #[error("byte offset {offset} is not on a character boundary")]
    NotCharBoundary { offset: usize },
}

impl Edit {
    /// Create an edit that verifies `expected_before` is present at the span.
    pub fn new(
        byte_start: usize,
        byte_end: usize,
        new_text: impl Into<String>,
        expected_before: &str,
    ) -> Self {
        Self {
            byte_start,
            byte_end,
            new_text: new_text.into(),
            expected_before: EditVerification::from_text(expected_before),
        }
    }

    /// Pure insertion at `offset`.
    pub fn insert(offset: usize, new_text: impl Into<String>) -> Self {
        Self::new(offset, offset, new_text, "")
    }

    /// Replace the span `[byte_start, byte_end)` of `document`, capturing the
    /// current text as the verification.
    pub fn replace_in(
        document: &TargetDocument,
        byte_start: usize,
        byte_end: usize,
        new_text: impl Into<String>,
    ) -> Result<Self, EditError> {
        let current = span_text(document.text(), byte_start, byte_end)?;
        Ok(Self::new(byte_start, byte_end, new_text, current))
    }

    /// Whether applying this edit would leave `document` unchanged.
    pub fn is_noop(&self, document: &TargetDocument) -> bool {
        span_text(document.text(), self.byte_start, self.byte_end)
            .map(|current| current == self.new_text)
            .unwrap_or(false)
    }

    /// Apply this edit, producing a new document.
    pub fn apply_to(&self, document: &TargetDocument) -> Result<TargetDocument, EditError> {
        let current = span_text(document.text(), self.byte_start, self.byte_end)?;

        if !self.expected_before.matches(current) {
            return Err(EditError::BeforeTextMismatch {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                found: current.to_string(),
            });
        }

        Ok(document.splice(self.byte_start..self.byte_end, &self.new_text))
    }
}

fn span_text(text: &str, byte_start: usize, byte_end: usize) -> Result<&str, EditError> {
    if byte_start > byte_end || byte_end > text.len() {
        return Err(EditError::InvalidByteRange {
            byte_start,
            byte_end,
            len: text.len(),
        });
    }
    for offset in [byte_start, byte_end] {
        if !text.is_char_boundary(offset) {
            return Err(EditError::NotCharBoundary { offset });
        }
    }
    Ok(&text[byte_start..byte_end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_verification_exact_match() {
        let verify = EditVerification::ExactMatch("hello world".to_string());
        assert!(verify.matches("hello world"));
        assert!(!verify.matches("hello"));
    }

    #[test]
    fn test_edit_verification_hash() {
        let text = "hello world";
        let verify = EditVerification::Hash(xxh3_64(text.as_bytes()));
        assert!(verify.matches(text));
        assert!(!verify.matches("goodbye world"));
    }

    #[test]
    fn test_edit_verification_from_text_large() {
        let text = "x".repeat(2000);
        assert!(matches!(
            EditVerification::from_text(&text),
            EditVerification::Hash(_)
        ));
        assert!(matches!(
            EditVerification::from_text("small"),
            EditVerification::ExactMatch(_)
        ));
    }

    #[test]
    fn test_apply_to_replaces_span() {
        let doc = TargetDocument::new("original content");
        let edit = Edit::new(0, 8, "modified", "original");
        let patched = edit.apply_to(&doc).unwrap();
        assert_eq!(patched.text(), "modified content");
        assert_eq!(doc.text(), "original content");
    }

    #[test]
    fn test_apply_to_rejects_mismatch() {
        let doc = TargetDocument::new("hello world");
        let edit = Edit::new(0, 5, "howdy", "HELLO");
        assert!(matches!(
            edit.apply_to(&doc),
            Err(EditError::BeforeTextMismatch { .. })
        ));
    }

    #[test]
    fn test_invalid_ranges() {
        let doc = TargetDocument::new("hello world");
        assert!(matches!(
            Edit::new(5, 20, "x", "").apply_to(&doc),
            Err(EditError::InvalidByteRange { .. })
        ));
        assert!(matches!(
            Edit::new(10, 5, "x", "").apply_to(&doc),
            Err(EditError::InvalidByteRange { .. })
        ));
    }

    #[test]
    fn test_char_boundary_checked() {
        let doc = TargetDocument::new("héllo");
        assert_eq!(
            Edit::insert(2, "x").apply_to(&doc),
            Err(EditError::NotCharBoundary { offset: 2 })
        );
    }

    #[test]
    fn test_insert_and_noop() {
        let doc = TargetDocument::new("ab");
        let patched = Edit::insert(1, "-").apply_to(&doc).unwrap();
        assert_eq!(patched.text(), "a-b");

        let same = Edit::replace_in(&doc, 0, 1, "a").unwrap();
        assert!(same.is_noop(&doc));
    }
}
