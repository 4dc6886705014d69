use crate::anchor::pattern::{AnchorPattern, PatternKind};
use crate::document::TargetDocument;
use regex::Captures;
use std::collections::HashMap;
use std::ops::Range;

/// A located landmark with its captured groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorMatch {
    /// Byte range of the entire match
    pub byte_start: usize,
    pub byte_end: usize,
    /// The matched text
    pub text: String,
    /// Positional groups; index 0 is the whole match
    pub groups: Vec<Option<Range<usize>>>,
    /// Named groups: name -> positional index
    pub names: HashMap<String, usize>,
}

impl AnchorMatch {
    fn from_literal(start: usize, literal: &str) -> Self {
        let end = start + literal.len();
        Self {
            byte_start: start,
            byte_end: end,
            text: literal.to_string(),
            groups: vec![Some(start..end)],
            names: HashMap::new(),
        }
    }

    fn from_captures(caps: &Captures<'_>, names: &[Option<&str>], offset: usize) -> Option<Self> {
        let whole = caps.get(0)?;
        let groups = (0..caps.len())
            .map(|idx| caps.get(idx).map(|m| m.start() + offset..m.end() + offset))
            .collect();
        let names = names
            .iter()
            .enumerate()
            .filter_map(|(idx, name)| name.map(|n| (n.to_string(), idx)))
            .collect();
        Some(Self {
            byte_start: whole.start() + offset,
            byte_end: whole.end() + offset,
            text: whole.as_str().to_string(),
            groups,
            names,
        })
    }

    pub fn span(&self) -> Range<usize> {
        self.byte_start..self.byte_end
    }

    /// Byte span of a capture, addressed by name or by position.
    pub fn capture_span(&self, name: &str) -> Option<Range<usize>> {
        let idx = match name.parse::<usize>() {
            Ok(idx) => idx,
            Err(_) => *self.names.get(name)?,
        };
        self.groups.get(idx).cloned().flatten()
    }

    /// Text of a capture within `source`, the text the match was made against.
    pub fn capture<'s>(&self, source: &'s str, name: &str) -> Option<&'s str> {
        self.capture_span(name).map(|span| &source[span])
    }

    /// Expand `$1`, `${1}`, `$name` and `${name}` references in `template`.
    ///
    /// `$$` yields a literal dollar. References to groups that did not
    /// participate in the match expand to nothing.
    pub fn expand(&self, source: &str, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(pos) = rest.find('$') {
            out.push_str(&rest[..pos]);
            rest = &rest[pos + 1..];

            if let Some(after) = rest.strip_prefix('$') {
                out.push('$');
                rest = after;
                continue;
            }

            let (name, consumed) = if let Some(braced) = rest.strip_prefix('{') {
                match braced.find('}') {
                    Some(close) => (&braced[..close], close + 2),
                    None => ("", 0),
                }
            } else {
                let len = rest
                    .char_indices()
                    .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '_'))
                    .map_or(rest.len(), |(idx, _)| idx);
                (&rest[..len], len)
            };

            if name.is_empty() {
                out.push('$');
                continue;
            }

            if let Some(text) = self.capture(source, name) {
                out.push_str(text);
            }
            rest = &rest[consumed..];
        }

        out.push_str(rest);
        out
    }
}

/// Leftmost-first anchor search over one document.
pub struct AnchorMatcher<'a> {
    document: &'a TargetDocument,
}

impl<'a> AnchorMatcher<'a> {
    pub fn new(document: &'a TargetDocument) -> Self {
        Self { document }
    }

    /// Find the leftmost occurrence of `pattern`.
    pub fn find(&self, pattern: &AnchorPattern) -> Option<AnchorMatch> {
        self.find_in(pattern, 0..self.document.len())
    }

    /// Find the leftmost occurrence of `pattern` lying entirely within `range`.
    pub fn find_in(&self, pattern: &AnchorPattern, range: Range<usize>) -> Option<AnchorMatch> {
        let (offset, haystack) = self.slice(range)?;
        match pattern.kind() {
            PatternKind::Literal(literal) => haystack
                .find(literal.as_str())
                .map(|pos| AnchorMatch::from_literal(pos + offset, literal)),
            PatternKind::Regex(re) => {
                let names: Vec<_> = re.capture_names().collect();
                re.captures(haystack)
                    .and_then(|caps| AnchorMatch::from_captures(&caps, &names, offset))
            }
        }
    }

    /// All non-overlapping occurrences of `pattern` within `range`, in order.
    pub fn find_all_in(&self, pattern: &AnchorPattern, range: Range<usize>) -> Vec<AnchorMatch> {
        let Some((offset, haystack)) = self.slice(range) else {
            return Vec::new();
        };
        match pattern.kind() {
            PatternKind::Literal(literal) => haystack
                .match_indices(literal.as_str())
                .map(|(pos, _)| AnchorMatch::from_literal(pos + offset, literal))
                .collect(),
            PatternKind::Regex(re) => {
                let names: Vec<_> = re.capture_names().collect();
                re.captures_iter(haystack)
                    .filter_map(|caps| AnchorMatch::from_captures(&caps, &names, offset))
                    .collect()
            }
        }
    }

    pub fn document(&self) -> &'a TargetDocument {
        self.document
    }

    fn slice(&self, range: Range<usize>) -> Option<(usize, &'a str)> {
        let text = self.document.text();
        let end = range.end.min(text.len());
        if range.start > end {
            return None;
        }
        text.get(range.start..end).map(|s| (range.start, s))
    }
}
