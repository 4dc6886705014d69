use crate::anchor::{AnchorMatcher, AnchorPattern, CompileError};
use crate::document::TargetDocument;
use crate::guard::Marker;
use crate::rewrite::transform::{MissReason, Transform};
use crate::validate::Balance;

/// One candidate rewrite: an anchor, how much context around it the
/// transform may inspect, and the transform itself.
#[derive(Debug, Clone)]
pub struct RewriteRule {
    pub id: String,
    pub anchor: AnchorPattern,
    /// Lines on either side of the match visible to the transform
    pub context_lines: usize,
    /// Indent inserted lines like the surrounding code
    pub match_indent: bool,
    pub transform: Transform,
}

impl RewriteRule {
    pub fn new(id: impl Into<String>, anchor: AnchorPattern, transform: Transform) -> Self {
        Self {
            id: id.into(),
            anchor,
            context_lines: 0,
            match_indent: false,
            transform,
        }
    }

    pub fn with_context_lines(mut self, lines: usize) -> Self {
        self.context_lines = lines;
        self
    }

    pub fn with_match_indent(mut self, match_indent: bool) -> Self {
        self.match_indent = match_indent;
        self
    }

    /// Check that the transform only refers to captures the anchor defines.
    pub fn validate(&self) -> Result<(), CompileError> {
        if let Transform::ReplaceCapture { capture, .. } = &self.transform {
            self.anchor.require_capture(capture)?;
        }
        Ok(())
    }

    /// Try this rule against `document`.
    ///
    /// Returns the rewritten document, or why the rule does not apply. Never
    /// returns a partially edited document, and never one whose delimiter
    /// balance differs from the input's.
    pub fn attempt(&self, document: &TargetDocument) -> Result<TargetDocument, MissReason> {
        let anchor = AnchorMatcher::new(document)
            .find(&self.anchor)
            .ok_or(MissReason::NoAnchor)?;
        let window = document.context_window(anchor.span(), self.context_lines);

        let edit = self
            .transform
            .plan(document, &anchor, window, self.match_indent)?;
        if edit.is_noop(document) {
            return Err(MissReason::NoChange);
        }

        let rewritten = edit.apply_to(document)?;
        if Balance::of(rewritten.text()) != Balance::of(document.text()) {
            return Err(MissReason::UnbalancedSplice);
        }
        Ok(rewritten)
    }
}

/// One logical change to a file: the marker that says it is done, and the
/// rules that can do it, most structurally specific first.
#[derive(Debug, Clone)]
pub struct Change {
    pub id: String,
    pub marker: Marker,
    pub rules: Vec<RewriteRule>,
}

impl Change {
    pub fn new(
        id: impl Into<String>,
        marker: Marker,
        rules: Vec<RewriteRule>,
    ) -> Result<Self, CompileError> {
        for rule in &rules {
            rule.validate()?;
        }
        Ok(Self {
            id: id.into(),
            marker,
            rules,
        })
    }
}
