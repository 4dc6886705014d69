use crate::anchor::{AnchorPattern, AnchorRole, CompileError};
use crate::guard::Marker;
use crate::rewrite::{Change, RewriteRule, Transform};
use crate::validate::BlockDelimiter;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Deserialize, Default, Clone)]
pub struct PatchConfig {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub changes: Vec<ChangeDefinition>,
}

impl PatchConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.changes.is_empty() {
            issues.push(ValidationIssue::EmptyChangeList);
        }

        let mut change_ids = HashSet::new();
        for change in &self.changes {
            let change_id = (!change.id.trim().is_empty()).then(|| change.id.clone());
            let missing =
                |field: &'static str, rule_id: Option<&str>| ValidationIssue::MissingField {
                    change_id: change_id.clone(),
                    rule_id: rule_id.map(str::to_string),
                    field,
                };

            if change.id.trim().is_empty() {
                issues.push(missing("id", None));
            } else if !change_ids.insert(change.id.as_str()) {
                issues.push(ValidationIssue::InvalidCombo {
                    change_id: change_id.clone(),
                    message: "duplicate change id".to_string(),
                });
            }

            if change.marker.identifier.pattern.is_empty() {
                issues.push(missing("marker.identifier.pattern", None));
            }
            if change
                .marker
                .context
                .iter()
                .any(|token| token.pattern.is_empty())
            {
                issues.push(missing("marker.context.pattern", None));
            }
            if matches!(&change.marker.scope, Some(scope) if scope.pattern.is_empty()) {
                issues.push(missing("marker.scope.pattern", None));
            }

            if change.rules.is_empty() {
                issues.push(ValidationIssue::InvalidCombo {
                    change_id: change_id.clone(),
                    message: "change has no rules".to_string(),
                });
            }

            let mut rule_ids = HashSet::new();
            for rule in &change.rules {
                let rule_id = (!rule.id.trim().is_empty()).then_some(rule.id.as_str());
                if rule.id.trim().is_empty() {
                    issues.push(missing("rules.id", None));
                } else if !rule_ids.insert(rule.id.as_str()) {
                    issues.push(ValidationIssue::InvalidCombo {
                        change_id: change_id.clone(),
                        message: format!("duplicate rule id '{}'", rule.id),
                    });
                }

                if rule.anchor.pattern.is_empty() {
                    issues.push(missing("rules.anchor.pattern", rule_id));
                }
                if rule.transform.inserts_lines() && rule.transform.text().trim().is_empty() {
                    issues.push(missing("rules.transform.text", rule_id));
                }
                if let TransformDefinition::ReplaceCapture { capture, .. } = &rule.transform {
                    if capture.trim().is_empty() {
                        issues.push(missing("rules.transform.capture", rule_id));
                    }
                    if rule.anchor.kind == PatternType::Literal {
                        issues.push(ValidationIssue::InvalidCombo {
                            change_id: change_id.clone(),
                            message: format!(
                                "rule '{}': replace-capture requires a regex anchor",
                                rule.id
                            ),
                        });
                    }
                }
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Default target file, relative to the workspace root
    #[serde(default)]
    pub target: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChangeDefinition {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    pub marker: MarkerDefinition,
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
}

impl ChangeDefinition {
    pub fn compile(&self) -> Result<Change, CompileFailure> {
        let marker = self.marker.compile().map_err(|source| CompileFailure {
            change: self.id.clone(),
            rule: None,
            source,
        })?;

        let rules = self
            .rules
            .iter()
            .map(|rule| {
                rule.compile().map_err(|source| CompileFailure {
                    change: self.id.clone(),
                    rule: Some(rule.id.clone()),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Change::new(self.id.clone(), marker, rules).map_err(|source| CompileFailure {
            change: self.id.clone(),
            rule: None,
            source,
        })
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MarkerDefinition {
    pub identifier: PatternDefinition,
    #[serde(default)]
    pub context: Vec<PatternDefinition>,
    #[serde(default)]
    pub window: usize,
    #[serde(default)]
    pub scope: Option<PatternDefinition>,
}

impl MarkerDefinition {
    pub fn compile(&self) -> Result<Marker, CompileError> {
        let mut marker = Marker::new(self.identifier.compile()?).with_window(self.window);
        for token in &self.context {
            marker = marker.with_context(token.compile()?);
        }
        if let Some(scope) = &self.scope {
            marker = marker.with_scope(scope.compile()?);
        }
        Ok(marker)
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PatternType {
    Literal,
    Regex,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PatternDefinition {
    #[serde(rename = "type")]
    pub kind: PatternType,
    pub pattern: String,
    #[serde(default)]
    pub role: AnchorRole,
}

impl PatternDefinition {
    pub fn compile(&self) -> Result<AnchorPattern, CompileError> {
        match self.kind {
            PatternType::Literal => AnchorPattern::literal(self.pattern.clone(), self.role),
            PatternType::Regex => AnchorPattern::regex(&self.pattern, self.role),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RuleDefinition {
    pub id: String,
    pub anchor: PatternDefinition,
    #[serde(default)]
    pub context_lines: usize,
    #[serde(default)]
    pub match_indent: bool,
    pub transform: TransformDefinition,
}

impl RuleDefinition {
    pub fn compile(&self) -> Result<RewriteRule, CompileError> {
        let rule = RewriteRule::new(
            self.id.clone(),
            self.anchor.compile()?,
            self.transform.to_transform(),
        )
        .with_context_lines(self.context_lines)
        .with_match_indent(self.match_indent);
        rule.validate()?;
        Ok(rule)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TransformDefinition {
    Replace {
        text: String,
    },
    ReplaceCapture {
        capture: String,
        text: String,
    },
    InsertBefore {
        text: String,
    },
    InsertAfter {
        text: String,
    },
    InsertAfterBlock {
        text: String,
        #[serde(default)]
        delimiter: BlockDelimiter,
    },
    InsertIntoBlock {
        text: String,
        #[serde(default)]
        delimiter: BlockDelimiter,
    },
}

impl TransformDefinition {
    pub fn text(&self) -> &str {
        match self {
            TransformDefinition::Replace { text }
            | TransformDefinition::ReplaceCapture { text, .. }
            | TransformDefinition::InsertBefore { text }
            | TransformDefinition::InsertAfter { text }
            | TransformDefinition::InsertAfterBlock { text, .. }
            | TransformDefinition::InsertIntoBlock { text, .. } => text,
        }
    }

    /// Insertions add whole lines and need text; replacements may delete.
    pub fn inserts_lines(&self) -> bool {
        !matches!(
            self,
            TransformDefinition::Replace { .. } | TransformDefinition::ReplaceCapture { .. }
        )
    }

    pub fn to_transform(&self) -> Transform {
        match self.clone() {
            TransformDefinition::Replace { text } => Transform::Replace { text },
            TransformDefinition::ReplaceCapture { capture, text } => {
                Transform::ReplaceCapture { capture, text }
            }
            TransformDefinition::InsertBefore { text } => Transform::InsertBefore { text },
            TransformDefinition::InsertAfter { text } => Transform::InsertAfter { text },
            TransformDefinition::InsertAfterBlock { text, delimiter } => {
                Transform::InsertAfterBlock { text, delimiter }
            }
            TransformDefinition::InsertIntoBlock { text, delimiter } => {
                Transform::InsertIntoBlock { text, delimiter }
            }
        }
    }
}

/// A pattern or rule that failed to compile, with where it came from.
#[derive(Debug, Clone)]
pub struct CompileFailure {
    pub change: String,
    pub rule: Option<String>,
    pub source: CompileError,
}

impl fmt::Display for CompileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.rule {
            Some(rule) => write!(f, "change '{}' rule '{}': {}", self.change, rule, self.source),
            None => write!(f, "change '{}': {}", self.change, self.source),
        }
    }
}

impl std::error::Error for CompileFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    EmptyChangeList,
    MissingField {
        change_id: Option<String>,
        rule_id: Option<String>,
        field: &'static str,
    },
    InvalidCombo {
        change_id: Option<String>,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyChangeList => write!(f, "rule file contains no changes"),
            ValidationIssue::MissingField {
                change_id,
                rule_id,
                field,
            } => match (change_id, rule_id) {
                (Some(change), Some(rule)) => write!(
                    f,
                    "change '{change}' rule '{rule}' missing required field '{field}'"
                ),
                (Some(change), None) => {
                    write!(f, "change '{change}' missing required field '{field}'")
                }
                (None, _) => write!(f, "change missing required field '{field}'"),
            },
            ValidationIssue::InvalidCombo { change_id, message } => match change_id {
                Some(id) => write!(f, "change '{id}' has invalid configuration: {message}"),
                None => write!(f, "invalid rule configuration: {message}"),
            },
        }
    }
}
