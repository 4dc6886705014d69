//! Anchor matching: locating textual landmarks in a target document.
//!
//! An anchor is a literal substring or a regular expression tagged with the
//! role the landmark plays (an import, a route registration, a constructor
//! call). Matching is leftmost-first and never fails at match time; a
//! malformed regex is rejected when the pattern is built.

pub mod errors;
pub mod matcher;
pub mod pattern;

pub use errors::CompileError;
pub use matcher::{AnchorMatch, AnchorMatcher};
pub use pattern::{AnchorPattern, AnchorRole, PatternKind};
