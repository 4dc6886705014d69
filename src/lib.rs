//! Anchor Patcher: idempotent, anchor-based patching of source files
//!
//! Rewrites one text file so that a desired code change is present exactly
//! once, even when the file's layout has drifted. Each change is a guard
//! marker plus an ordered chain of rewrite rules, from the most specific
//! anchor to the most lenient fallback.
//!
//! # Architecture
//!
//! All rewrites compile down to a single primitive: [`Edit`], a verified
//! byte-span splice over an immutable [`TargetDocument`]. Intelligence lives
//! in span acquisition (anchor patterns, context windows, delimiter-aware
//! block search), not in the application logic.
//!
//! A patch run is guard, chain, commit:
//!
//! 1. [`Marker`] checks whether the change is already present.
//! 2. [`run_chain`] tries each [`RewriteRule`] in order and keeps the first
//!    one whose output satisfies the marker.
//! 3. [`patch`] writes the result through a [`TextIo`], only when a rule
//!    applied.
//!
//! # Safety
//!
//! - Edits verify their expected before-text before splicing
//! - Replacements must keep `()`, `[]` and `{}` balanced
//! - A rule only applies if the marker holds afterwards, so reruns are no-ops
//! - Atomic file writes (tempfile + fsync + rename)
//! - Workspace boundary enforcement
//!
//! # Example
//!
//! ```
//! use anchor_patcher::{
//!     plan, AnchorPattern, AnchorRole, Change, Marker, PatchOutcome, RewriteRule,
//!     TargetDocument, Transform,
//! };
//!
//! let marker = Marker::new(
//!     AnchorPattern::literal("require('./customer-schema')", AnchorRole::Import).unwrap(),
//! );
//! let rule = RewriteRule::new(
//!     "exact-import",
//!     AnchorPattern::literal("require('../models/customer')", AnchorRole::Import).unwrap(),
//!     Transform::Replace {
//!         text: "require('./customer-schema')".into(),
//!     },
//! );
//! let change = Change::new("customer-schema-import", marker, vec![rule]).unwrap();
//!
//! let doc = TargetDocument::new("const { Customer } = require('../models/customer');\n");
//! let (patched, report) = plan(&doc, &change);
//! assert!(matches!(report.outcome, PatchOutcome::Applied { .. }));
//!
//! let (_, again) = plan(&patched, &change);
//! assert_eq!(again.outcome, PatchOutcome::AlreadyApplied);
//! ```

pub mod anchor;
pub mod applier;
pub mod cache;
pub mod config;
pub mod document;
pub mod edit;
pub mod guard;
pub mod io;
pub mod rewrite;
pub mod safety;
pub mod validate;

// Re-exports
pub use anchor::{AnchorMatch, AnchorMatcher, AnchorPattern, AnchorRole, CompileError};
pub use applier::{check, patch, patch_all, plan, plan_all, FileReport, PatchOutcome, PatchReport};
pub use config::{load_from_path, load_from_str, load_rule_file, ConfigError, PatchConfig, RuleFile};
pub use document::TargetDocument;
pub use edit::{Edit, EditError, EditVerification};
pub use guard::{already_applied, GuardError, Marker};
pub use io::{FsTextIo, IoError, MemoryTextIo, TextIo};
pub use rewrite::{
    run_chain, AttemptResult, Change, ChainResult, MissReason, RewriteRule, Transform,
};
pub use safety::{SafetyError, WorkspaceGuard};
pub use validate::{BlockDelimiter, BlockError};
