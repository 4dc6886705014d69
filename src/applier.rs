//! Patch applier: guard, chain, commit.
//!
//! [`plan`] and [`plan_all`] are pure. [`patch`], [`patch_all`] and [`check`]
//! wrap them with one read and at most one write through a [`TextIo`].
//! Skipped and already-applied runs never write, so an untouched file keeps
//! its contents and metadata exactly.

use crate::document::TargetDocument;
use crate::guard::already_applied;
use crate::io::{IoError, TextIo};
use crate::rewrite::{run_chain, Change, RuleAttempt};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Terminal result of one patch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
#[must_use = "PatchOutcome should be reported to the caller"]
pub enum PatchOutcome {
    /// A rule rewrote the document
    Applied { rule: String },
    /// The marker was already present; nothing was tried
    AlreadyApplied,
    /// No rule landed; the document is unchanged
    Skipped,
}

impl PatchOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, PatchOutcome::Applied { .. })
    }
}

impl fmt::Display for PatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchOutcome::Applied { rule } => write!(f, "Applied (rule {rule})"),
            PatchOutcome::AlreadyApplied => write!(f, "Already applied"),
            PatchOutcome::Skipped => write!(f, "Skipped (no rule matched)"),
        }
    }
}

/// Outcome of one change plus the rules tried to reach it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchReport {
    pub change: String,
    pub outcome: PatchOutcome,
    pub attempts: Vec<RuleAttempt>,
}

/// Outcome of running a set of changes against one file.
#[derive(Debug, Clone)]
pub struct FileReport {
    pub path: PathBuf,
    pub original: String,
    pub patched: String,
    pub reports: Vec<PatchReport>,
    /// Whether the patched text was committed
    pub written: bool,
}

impl FileReport {
    pub fn changed(&self) -> bool {
        self.original != self.patched
    }
}

/// Run one change against `document` without any I/O.
pub fn plan(document: &TargetDocument, change: &Change) -> (TargetDocument, PatchReport) {
    if already_applied(document, &change.marker) {
        debug!(change = %change.id, "marker present");
        return (
            document.clone(),
            PatchReport {
                change: change.id.clone(),
                outcome: PatchOutcome::AlreadyApplied,
                attempts: Vec::new(),
            },
        );
    }

    let result = run_chain(document, &change.rules, &change.marker);
    let outcome = match result.applied {
        Some(rule) => {
            info!(change = %change.id, %rule, "change applied");
            PatchOutcome::Applied { rule }
        }
        None => {
            debug!(change = %change.id, "no rule matched");
            PatchOutcome::Skipped
        }
    };

    (
        result.document,
        PatchReport {
            change: change.id.clone(),
            outcome,
            attempts: result.attempts,
        },
    )
}

/// Run several changes in order, each against the output of the previous.
pub fn plan_all(
    document: &TargetDocument,
    changes: &[Change],
) -> (TargetDocument, Vec<PatchReport>) {
    let mut current = document.clone();
    let mut reports = Vec::with_capacity(changes.len());
    for change in changes {
        let (next, report) = plan(&current, change);
        current = next;
        reports.push(report);
    }
    (current, reports)
}

/// Apply one change to the file at `path`.
pub fn patch<I>(io: &I, path: &Path, change: &Change) -> Result<PatchReport, IoError>
where
    I: TextIo + ?Sized,
{
    let original = io.read_text(path)?;
    let (patched, report) = plan(&TargetDocument::new(original), change);
    if report.outcome.is_applied() {
        io.write_text(path, patched.text())?;
    }
    Ok(report)
}

/// Apply `changes` to the file at `path` with a single read and at most one
/// write.
pub fn patch_all<I>(io: &I, path: &Path, changes: &[Change]) -> Result<FileReport, IoError>
where
    I: TextIo + ?Sized,
{
    let mut report = check(io, path, changes)?;
    if report.reports.iter().any(|r| r.outcome.is_applied()) {
        io.write_text(path, &report.patched)?;
        report.written = true;
    }
    Ok(report)
}

/// Evaluate `changes` against the file at `path` without writing.
pub fn check<I>(io: &I, path: &Path, changes: &[Change]) -> Result<FileReport, IoError>
where
    I: TextIo + ?Sized,
{
    let original = io.read_text(path)?;
    let (patched, reports) = plan_all(&TargetDocument::new(original.as_str()), changes);
    Ok(FileReport {
        path: path.to_path_buf(),
        original,
        patched: patched.into_text(),
        reports,
        written: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchor::{AnchorPattern, AnchorRole};
    use crate::guard::Marker;
    use crate::io::MemoryTextIo;
    use crate::rewrite::{RewriteRule, Transform};

    fn import_change() -> Change {
        let marker = Marker::new(
            AnchorPattern::literal("require('./customer-schema')", AnchorRole::Import).unwrap(),
        );
        let rule = RewriteRule::new(
            "exact-import",
            AnchorPattern::literal("require('../models/customer')", AnchorRole::Import).unwrap(),
            Transform::Replace {
                text: "require('./customer-schema')".into(),
            },
        );
        Change::new("customer-schema-import", marker, vec![rule]).unwrap()
    }

    #[test]
    fn test_patch_outcome_display() {
        assert!(PatchOutcome::Applied { rule: "r".into() }
            .to_string()
            .contains("Applied"));
        assert!(PatchOutcome::AlreadyApplied
            .to_string()
            .contains("Already applied"));
        assert!(PatchOutcome::Skipped.to_string().contains("Skipped"));
    }

    #[test]
    fn test_patch_writes_once_when_applied() {
        let io = MemoryTextIo::new().with_file(
            "customers.js",
            "const x = require('../models/customer');\n",
        );
        let path = Path::new("customers.js");

        let report = patch(&io, path, &import_change()).unwrap();
        assert_eq!(
            report.outcome,
            PatchOutcome::Applied {
                rule: "exact-import".into()
            }
        );
        assert_eq!(io.write_count(), 1);
        assert_eq!(
            io.get(path).unwrap(),
            "const x = require('./customer-schema');\n"
        );

        let again = patch(&io, path, &import_change()).unwrap();
        assert_eq!(again.outcome, PatchOutcome::AlreadyApplied);
        assert_eq!(io.write_count(), 1);
    }

    #[test]
    fn test_skipped_does_not_write() {
        let io = MemoryTextIo::new().with_file("other.js", "module.exports = {};\n");
        let report = patch(&io, Path::new("other.js"), &import_change()).unwrap();
        assert_eq!(report.outcome, PatchOutcome::Skipped);
        assert_eq!(io.write_count(), 0);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let io = MemoryTextIo::new();
        assert!(matches!(
            patch(&io, Path::new("nope.js"), &import_change()),
            Err(IoError::NotFound { .. })
        ));
    }

    #[test]
    fn test_check_never_writes() {
        let io = MemoryTextIo::new().with_file(
            "customers.js",
            "const x = require('../models/customer');\n",
        );
        let report = check(&io, Path::new("customers.js"), &[import_change()]).unwrap();
        assert!(report.changed());
        assert!(!report.written);
        assert_eq!(io.write_count(), 0);
    }

    #[test]
    fn test_outcome_serializes_with_tag() {
        let json = serde_json::to_string(&PatchOutcome::Applied { rule: "r".into() }).unwrap();
        assert_eq!(json, r#"{"outcome":"applied","rule":"r"}"#);
        let json = serde_json::to_string(&PatchOutcome::AlreadyApplied).unwrap();
        assert_eq!(json, r#"{"outcome":"already-applied"}"#);
    }
}
