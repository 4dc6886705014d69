use crate::anchor::errors::CompileError;
use crate::cache;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The structural role a landmark plays in the target file.
///
/// Roles are descriptive: they drive logging and reporting, not matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnchorRole {
    Import,
    RouteDeclaration,
    RouteRegistration,
    ConstructorCall,
    Assignment,
    Declaration,
    #[default]
    Other,
}

impl fmt::Display for AnchorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AnchorRole::Import => "import statement",
            AnchorRole::RouteDeclaration => "route declaration",
            AnchorRole::RouteRegistration => "route registration",
            AnchorRole::ConstructorCall => "object constructor call",
            AnchorRole::Assignment => "assignment",
            AnchorRole::Declaration => "declaration",
            AnchorRole::Other => "landmark",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone)]
pub enum PatternKind {
    /// Exact substring
    Literal(String),
    /// Multi-line mode regular expression
    Regex(Regex),
}

/// A compiled landmark pattern plus its role tag. Immutable once built.
#[derive(Debug, Clone)]
pub struct AnchorPattern {
    kind: PatternKind,
    role: AnchorRole,
}

impl AnchorPattern {
    pub fn literal(pattern: impl Into<String>, role: AnchorRole) -> Result<Self, CompileError> {
        let pattern = pattern.into();
        if pattern.is_empty() {
            return Err(CompileError::EmptyPattern);
        }
        Ok(Self {
            kind: PatternKind::Literal(pattern),
            role,
        })
    }

    pub fn regex(pattern: &str, role: AnchorRole) -> Result<Self, CompileError> {
        if pattern.is_empty() {
            return Err(CompileError::EmptyPattern);
        }
        let re = cache::get_or_compile_regex(pattern).map_err(|e| CompileError::InvalidRegex {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        // A regex that can match the empty string would anchor everywhere.
        if re.is_match("") {
            return Err(CompileError::InvalidRegex {
                pattern: pattern.to_string(),
                message: "pattern matches the empty string".to_string(),
            });
        }
        Ok(Self {
            kind: PatternKind::Regex(re),
            role,
        })
    }

    pub fn kind(&self) -> &PatternKind {
        &self.kind
    }

    /// Check that `name` is a capture group this pattern defines.
    ///
    /// Numeric names refer to positional groups.
    pub fn require_capture(&self, name: &str) -> Result<(), CompileError> {
        let re = match &self.kind {
            PatternKind::Literal(text) => {
                return Err(CompileError::LiteralCapture {
                    name: name.to_string(),
                    pattern: text.clone(),
                })
            }
            PatternKind::Regex(re) => re,
        };

        let defined = match name.parse::<usize>() {
            Ok(idx) => idx > 0 && idx < re.captures_len(),
            Err(_) => re.capture_names().flatten().any(|n| n == name),
        };

        if defined {
            Ok(())
        } else {
            Err(CompileError::UnknownCapture {
                name: name.to_string(),
                pattern: re.as_str().to_string(),
            })
        }
    }
}

impl fmt::Display for AnchorPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            PatternKind::Literal(text) => write!(f, "{} `{}`", self.role, text),
            PatternKind::Regex(re) => write!(f, "{} /{}/", self.role, re.as_str()),
        }
    }
}
