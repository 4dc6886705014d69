//! Rule files: TOML descriptions of changes, their markers and their
//! ordered rewrite rules.

pub mod loader;
pub mod schema;

pub use loader::{
    compile, load_from_path, load_from_str, load_rule_file, rule_file_from_str, ConfigError,
    RuleFile,
};
pub use schema::{
    ChangeDefinition, CompileFailure, MarkerDefinition, Metadata, PatchConfig, PatternDefinition,
    PatternType, RuleDefinition, TransformDefinition, ValidationError, ValidationIssue,
};
