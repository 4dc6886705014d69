use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("anchor pattern is empty")]
    EmptyPattern,

    #[error("invalid regex '{pattern}': {message}")]
    InvalidRegex { pattern: String, message: String },

    #[error("capture '{name}' is not defined by pattern '{pattern}'")]
    UnknownCapture { name: String, pattern: String },

    #[error("capture '{name}' requires a regex anchor, but '{pattern}' is a literal")]
    LiteralCapture { name: String, pattern: String },
}
