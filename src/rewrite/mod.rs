//! Rewrite strategy chain.
//!
//! A [`Change`] carries an ordered list of [`RewriteRule`]s. Each rule pairs
//! an anchor with a [`Transform`]; the chain tries them in order and keeps
//! the first rewrite that splices cleanly and establishes the change's
//! marker. Rules are ordered from most structurally specific to the
//! simplest landmark that still allows progress when the file has drifted.

pub mod chain;
pub mod rule;
pub mod transform;

pub use chain::{run_chain, AttemptResult, ChainResult, RuleAttempt};
pub use rule::{Change, RewriteRule};
pub use transform::{MissReason, Transform};
