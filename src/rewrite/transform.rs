use crate::anchor::AnchorMatch;
use crate::document::TargetDocument;
use crate::edit::{Edit, EditError};
use crate::validate::{find_block, splice_preserves_balance, Balance, BlockDelimiter, BlockError};
use std::fmt;
use std::ops::Range;

/// A rewrite strategy: how to turn a located anchor into a splice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transform {
    /// Replace the whole match; `$1` / `${name}` expand captures
    Replace { text: String },
    /// Replace a single capture group of the match
    ReplaceCapture { capture: String, text: String },
    /// Insert whole lines before the line where the match starts
    InsertBefore { text: String },
    /// Insert whole lines after the line where the match ends
    InsertAfter { text: String },
    /// Insert whole lines after the line closing the first block opened at
    /// or after the match
    InsertAfterBlock {
        text: String,
        delimiter: BlockDelimiter,
    },
    /// Insert whole lines just before the line closing that block
    InsertIntoBlock {
        text: String,
        delimiter: BlockDelimiter,
    },
}

/// Why a rule did not produce a splice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissReason {
    NoAnchor,
    CaptureNotMatched(String),
    UnbalancedSplice,
    NoBlock,
    BlockOutsideWindow,
    MismatchedBlock,
    SingleLineBlock,
    NoChange,
    Edit(EditError),
    MarkerNotEstablished,
}

impl fmt::Display for MissReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissReason::NoAnchor => write!(f, "anchor not found"),
            MissReason::CaptureNotMatched(name) => {
                write!(f, "capture '{name}' did not participate in the match")
            }
            MissReason::UnbalancedSplice => {
                write!(f, "splice would change the delimiter balance")
            }
            MissReason::NoBlock => write!(f, "no opening delimiter after the anchor"),
            MissReason::BlockOutsideWindow => {
                write!(f, "block does not close within the context window")
            }
            MissReason::MismatchedBlock => write!(f, "block has mismatched delimiters"),
            MissReason::SingleLineBlock => {
                write!(f, "block opens and closes on one line; no line to insert before")
            }
            MissReason::NoChange => write!(f, "rewrite leaves the document unchanged"),
            MissReason::Edit(e) => write!(f, "edit rejected: {e}"),
            MissReason::MarkerNotEstablished => {
                write!(f, "rewrite does not establish the change marker")
            }
        }
    }
}

impl From<BlockError> for MissReason {
    fn from(e: BlockError) -> Self {
        match e {
            BlockError::NoOpening => MissReason::NoBlock,
            BlockError::Unclosed { .. } => MissReason::BlockOutsideWindow,
            BlockError::Mismatched { .. } => MissReason::MismatchedBlock,
        }
    }
}

impl From<EditError> for MissReason {
    fn from(e: EditError) -> Self {
        MissReason::Edit(e)
    }
}

impl Transform {
    pub fn kind(&self) -> &'static str {
        match self {
            Transform::Replace { .. } => "replace",
            Transform::ReplaceCapture { .. } => "replace-capture",
            Transform::InsertBefore { .. } => "insert-before",
            Transform::InsertAfter { .. } => "insert-after",
            Transform::InsertAfterBlock { .. } => "insert-after-block",
            Transform::InsertIntoBlock { .. } => "insert-into-block",
        }
    }

    /// Compute the splice for `anchor` without applying it.
    ///
    /// `window` bounds how far past the anchor a block search may look.
    pub fn plan(
        &self,
        document: &TargetDocument,
        anchor: &AnchorMatch,
        window: Range<usize>,
        match_indent: bool,
    ) -> Result<Edit, MissReason> {
        let source = document.text();
        let start_line = document.line_index(anchor.byte_start);

        match self {
            Transform::Replace { text } => {
                let new_text = anchor.expand(source, text);
                if !splice_preserves_balance(&anchor.text, &new_text) {
                    return Err(MissReason::UnbalancedSplice);
                }
                Ok(Edit::replace_in(
                    document,
                    anchor.byte_start,
                    anchor.byte_end,
                    new_text,
                )?)
            }
            Transform::ReplaceCapture { capture, text } => {
                let span = anchor
                    .capture_span(capture)
                    .ok_or_else(|| MissReason::CaptureNotMatched(capture.clone()))?;
                let new_text = anchor.expand(source, text);
                if !splice_preserves_balance(&source[span.clone()], &new_text) {
                    return Err(MissReason::UnbalancedSplice);
                }
                Ok(Edit::replace_in(document, span.start, span.end, new_text)?)
            }
            Transform::InsertBefore { text } => {
                let indent = match_indent.then(|| document.indentation(start_line));
                let fragment = balanced_fragment(text, indent, document.newline())?;
                Ok(Edit::insert(document.line_span(start_line).start, fragment))
            }
            Transform::InsertAfter { text } => {
                let end_line = document.line_index(last_byte(anchor));
                let indent = match_indent.then(|| document.indentation(start_line));
                let fragment = balanced_fragment(text, indent, document.newline())?;
                Ok(insert_after_line(document, end_line, fragment))
            }
            Transform::InsertAfterBlock { text, delimiter } => {
                let block = find_block(source, anchor.byte_start..window.end, *delimiter)?;
                let close_line = document.line_index(block.close);
                let indent = match_indent.then(|| document.indentation(start_line));
                let fragment = balanced_fragment(text, indent, document.newline())?;
                Ok(insert_after_line(document, close_line, fragment))
            }
            Transform::InsertIntoBlock { text, delimiter } => {
                let block = find_block(source, anchor.byte_start..window.end, *delimiter)?;
                let open_line = document.line_index(block.open);
                let close_line = document.line_index(block.close);
                if open_line == close_line {
                    return Err(MissReason::SingleLineBlock);
                }
                let indent = match_indent.then(|| {
                    if close_line - open_line > 1 {
                        document.indentation(close_line - 1).to_string()
                    } else {
                        format!("{}  ", document.indentation(open_line))
                    }
                });
                let fragment = balanced_fragment(text, indent.as_deref(), document.newline())?;
                Ok(Edit::insert(document.line_span(close_line).start, fragment))
            }
        }
    }
}

fn last_byte(anchor: &AnchorMatch) -> usize {
    anchor.byte_end.saturating_sub(1).max(anchor.byte_start)
}

/// Insertion after `line`, terminating the line first if it is the
/// unterminated last line of the document.
fn insert_after_line(document: &TargetDocument, line: usize, fragment: String) -> Edit {
    let offset = document.line_span(line).end;
    if document.line_terminated(line) {
        Edit::insert(offset, fragment)
    } else {
        let fragment = format!("{}{}", document.newline(), fragment);
        let fragment = fragment
            .strip_suffix(document.newline())
            .unwrap_or(&fragment)
            .to_string();
        Edit::insert(offset, fragment)
    }
}

/// Render `text` as whole lines in the document's line ending, optionally
/// indented, refusing fragments that are not delimiter-balanced.
fn balanced_fragment(
    text: &str,
    indent: Option<&str>,
    newline: &str,
) -> Result<String, MissReason> {
    if !Balance::of(text).is_zero() {
        return Err(MissReason::UnbalancedSplice);
    }
    let mut out = String::with_capacity(text.len() + newline.len());
    for line in text.lines() {
        if let Some(indent) = indent {
            if !line.trim().is_empty() {
                out.push_str(indent);
            }
        }
        out.push_str(line);
        out.push_str(newline);
    }
    Ok(out)
}
