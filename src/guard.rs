//! Idempotency guard.
//!
//! A [`Marker`] fingerprints the *logical* change rather than the bytes any
//! one rewrite rule emits: an identifier that must be present, context
//! tokens that must sit near it, and optionally the delimited block it must
//! live in. Any rule in a chain may establish the marker; the guard does not
//! care which one did.

use crate::anchor::{AnchorMatcher, AnchorPattern};
use crate::document::TargetDocument;
use crate::validate::{find_block, BlockDelimiter};
use std::ops::Range;
use thiserror::Error;
use tracing::trace;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GuardError {
    #[error("scope anchor {0} not found")]
    ScopeNotFound(String),

    #[error("scope opened at byte {0} never closes")]
    UnclosedScope(usize),
}

#[derive(Debug, Clone)]
pub struct Marker {
    identifier: AnchorPattern,
    context: Vec<AnchorPattern>,
    /// Lines on either side of an identifier occurrence searched for context
    window: usize,
    scope: Option<AnchorPattern>,
}

impl Marker {
    pub fn new(identifier: AnchorPattern) -> Self {
        Self {
            identifier,
            context: Vec::new(),
            window: 0,
            scope: None,
        }
    }

    pub fn with_context(mut self, pattern: AnchorPattern) -> Self {
        self.context.push(pattern);
        self
    }

    pub fn with_window(mut self, lines: usize) -> Self {
        self.window = lines;
        self
    }

    pub fn with_scope(mut self, scope: AnchorPattern) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Evaluate the marker against `document`.
    ///
    /// Every occurrence of the identifier inside the scope is considered, and
    /// the marker holds if any one of them has all context tokens within the
    /// window. An occurrence lacking its context does not count.
    pub fn evaluate(&self, document: &TargetDocument) -> Result<bool, GuardError> {
        let matcher = AnchorMatcher::new(document);
        let region = self.region(&matcher)?;

        for occurrence in matcher.find_all_in(&self.identifier, region.clone()) {
            let around = document.context_window(occurrence.span(), self.window);
            let around = around.start.max(region.start)..around.end.min(region.end);

            let satisfied = self
                .context
                .iter()
                .all(|token| matcher.find_in(token, around.clone()).is_some());

            trace!(
                identifier = %self.identifier,
                at = occurrence.byte_start,
                satisfied,
                "marker occurrence"
            );

            if satisfied {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn region(&self, matcher: &AnchorMatcher<'_>) -> Result<Range<usize>, GuardError> {
        let document = matcher.document();
        let Some(scope) = &self.scope else {
            return Ok(0..document.len());
        };

        let opener = matcher
            .find(scope)
            .ok_or_else(|| GuardError::ScopeNotFound(scope.to_string()))?;
        let block = find_block(
            document.text(),
            opener.byte_start..document.len(),
            BlockDelimiter::Any,
        )
        .map_err(|_| GuardError::UnclosedScope(opener.byte_start))?;

        Ok(opener.byte_start..block.close + 1)
    }
}

/// Whether `document` already carries the change `marker` describes.
///
/// If the marker cannot be evaluated the answer is "not yet applied", so the
/// rewrite chain still gets its chance.
pub fn already_applied(document: &TargetDocument, marker: &Marker) -> bool {
    match marker.evaluate(document) {
        Ok(applied) => applied,
        Err(e) => {
            trace!(error = %e, "marker not evaluable; treating as not applied");
            false
        }
    }
}
