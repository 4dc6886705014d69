use crate::document::TargetDocument;
use crate::guard::{already_applied, Marker};
use crate::rewrite::rule::RewriteRule;
use crate::rewrite::transform::MissReason;
use std::fmt;
use tracing::debug;

/// Result of trying one rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptResult {
    Applied,
    Missed(MissReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleAttempt {
    pub rule: String,
    pub result: AttemptResult,
}

impl fmt::Display for RuleAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.result {
            AttemptResult::Applied => write!(f, "{}: applied", self.rule),
            AttemptResult::Missed(reason) => write!(f, "{}: missed ({})", self.rule, reason),
        }
    }
}

/// What the chain produced for one document.
#[derive(Debug, Clone)]
pub struct ChainResult {
    pub document: TargetDocument,
    /// Id of the rule whose rewrite was kept, if any
    pub applied: Option<String>,
    /// Every rule tried, in order; rules after the applied one are absent
    pub attempts: Vec<RuleAttempt>,
}

/// Try `rules` in priority order and keep the first rewrite that lands.
///
/// A rewrite lands when its rule matches, its transform splices cleanly and
/// the resulting document satisfies `marker`; the last condition is what
/// makes a second run a no-op. If nothing lands the input comes back
/// unchanged.
pub fn run_chain(document: &TargetDocument, rules: &[RewriteRule], marker: &Marker) -> ChainResult {
    let mut attempts = Vec::with_capacity(rules.len());

    for rule in rules {
        let result = rule.attempt(document).and_then(|rewritten| {
            if already_applied(&rewritten, marker) {
                Ok(rewritten)
            } else {
                Err(MissReason::MarkerNotEstablished)
            }
        });

        match result {
            Ok(rewritten) => {
                debug!(rule = %rule.id, transform = rule.transform.kind(), "rule applied");
                attempts.push(RuleAttempt {
                    rule: rule.id.clone(),
                    result: AttemptResult::Applied,
                });
                return ChainResult {
                    document: rewritten,
                    applied: Some(rule.id.clone()),
                    attempts,
                };
            }
            Err(reason) => {
                debug!(rule = %rule.id, anchor = %rule.anchor, %reason, "rule missed");
                attempts.push(RuleAttempt {
                    rule: rule.id.clone(),
                    result: AttemptResult::Missed(reason),
                });
            }
        }
    }

    ChainResult {
        document: document.clone(),
        applied: None,
        attempts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchor::{AnchorPattern, AnchorRole};
    use crate::rewrite::transform::Transform;

    fn lit(text: &str) -> AnchorPattern {
        AnchorPattern::literal(text, AnchorRole::Other).unwrap()
    }

    #[test]
    fn test_first_landing_rule_wins() {
        let rules = vec![
            RewriteRule::new(
                "specific",
                lit("b();"),
                Transform::InsertAfter {
                    text: "done();".into(),
                },
            ),
            RewriteRule::new(
                "fallback",
                lit("a();"),
                Transform::InsertAfter {
                    text: "done();".into(),
                },
            ),
        ];
        let doc = TargetDocument::new("a();\nb();\n");
        let result = run_chain(&doc, &rules, &Marker::new(lit("done();")));
        assert_eq!(result.applied.as_deref(), Some("specific"));
        assert_eq!(result.attempts.len(), 1);
        assert_eq!(result.document.text(), "a();\nb();\ndone();\n");
    }

    #[test]
    fn test_rewrite_without_marker_is_a_miss() {
        let rules = vec![
            RewriteRule::new(
                "wrong-text",
                lit("a();"),
                Transform::InsertAfter {
                    text: "other();".into(),
                },
            ),
            RewriteRule::new(
                "right-text",
                lit("a();"),
                Transform::InsertAfter {
                    text: "done();".into(),
                },
            ),
        ];
        let doc = TargetDocument::new("a();\n");
        let result = run_chain(&doc, &rules, &Marker::new(lit("done();")));
        assert_eq!(result.applied.as_deref(), Some("right-text"));
        assert_eq!(
            result.attempts[0].result,
            AttemptResult::Missed(MissReason::MarkerNotEstablished)
        );
    }

    #[test]
    fn test_exhausted_chain_returns_input() {
        let rules = vec![RewriteRule::new(
            "r",
            lit("zzz"),
            Transform::InsertAfter { text: "x".into() },
        )];
        let doc = TargetDocument::new("a();\n");
        let result = run_chain(&doc, &rules, &Marker::new(lit("x")));
        assert!(result.applied.is_none());
        assert_eq!(result.document, doc);
        assert_eq!(result.attempts[0].to_string(), "r: missed (anchor not found)");
    }
}
