//! Inference engine: evaluates a rule set against a patient fact and
//! resolves conflicts between fired rules.
//!
//! Evaluation is a pure function of `(fact, rule set)`:
//! 1. Every rule is assessed in priority order. Rules whose required fields
//!    are absent are skipped and recorded.
//! 2. Regular rules that match are grouped by category. Within a category
//!    the highest-priority rule wins; lower rules with the same action
//!    support it, lower rules with a different action are suppressed.
//! 3. Fallback rules are only considered when no regular rule fired.
//!
//! No match is a normal outcome ([`Outcome::NoApplicableRecommendation`]),
//! not an error. [`EvaluationError`] is reserved for invariant violations.

mod conflict;
mod error;

pub use error::EvaluationError;

use glyco_core::PatientFact;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::ruleset::{RuleAssessment, RuleSet};
use crate::schema::Guidance;
use crate::templating::render_rationale;

// ── Result types ────────────────────────────────────────────────────

/// Rendered justification contributed by one supporting rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rationale {
    pub rule_id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidance: Option<Guidance>,
}

/// A rule that fired but lost its category to a higher-priority rule
/// recommending a different action, or a matched fallback rule left unused
/// because a regular rule fired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuppressedRule {
    pub rule_id: String,
    pub category: String,
    pub action: String,
    pub priority: i32,
    /// Id of the rule that won the category; for a fallback rule, the
    /// winner of the top recommendation.
    pub superseded_by: String,
}

/// A rule that was not evaluated because required fields were absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRule {
    pub rule_id: String,
    pub missing: Vec<String>,
}

/// One recommended action for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub action: String,
    pub category: String,
    /// Winning rule first, then agreeing rules in priority order. Never empty.
    pub supporting_rules: Vec<String>,
    pub rationale: Vec<Rationale>,
    /// The winning rule's priority.
    pub priority: i32,
    /// Highest confidence among supporting rules.
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suppressed: Vec<SuppressedRule>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// At least one regular rule fired.
    Recommended,
    /// Only fallback rules fired.
    Fallback,
    NoApplicableRecommendation,
}

/// Full result of one evaluation, including the decision trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Ordered by winning priority (descending), then winning rule id.
    pub recommendations: Vec<Recommendation>,
    pub suppressed: Vec<SuppressedRule>,
    pub skipped: Vec<SkippedRule>,
    pub outcome: Outcome,
    /// Fingerprint of the rule set snapshot this evaluation ran against.
    pub rule_set_fingerprint: String,
}

impl Evaluation {
    pub fn is_empty(&self) -> bool {
        self.recommendations.is_empty()
    }

    /// The recommendation for a category, if one was made.
    pub fn recommendation(&self, category: &str) -> Option<&Recommendation> {
        self.recommendations.iter().find(|r| r.category == category)
    }

    pub fn actions(&self) -> Vec<&str> {
        self.recommendations.iter().map(|r| r.action.as_str()).collect()
    }
}

// ── Engine ──────────────────────────────────────────────────────────

/// Stateless evaluator. All state lives in the [`RuleSet`] snapshot passed in.
pub struct InferenceEngine;

impl InferenceEngine {
    /// Evaluate a rule set against a normalized fact.
    pub fn evaluate(fact: &PatientFact, rules: &RuleSet) -> Result<Evaluation, EvaluationError> {
        Self::run(fact, rules).inspect_err(|e| {
            error!(
                rule_id = %e.rule_id(),
                fingerprint = %rules.fingerprint(),
                error = %e,
                "evaluation aborted on invariant violation"
            );
        })
    }

    fn run(fact: &PatientFact, rules: &RuleSet) -> Result<Evaluation, EvaluationError> {
        let assessments = rules.assess(fact)?;

        let mut regular = Vec::new();
        let mut fallback = Vec::new();
        let mut skipped = Vec::new();
        for assessment in assessments {
            match assessment {
                RuleAssessment::Matched(rule) if rule.fallback => fallback.push(rule),
                RuleAssessment::Matched(rule) => regular.push(rule),
                RuleAssessment::NotMatched(_) => {}
                RuleAssessment::Skipped { rule, missing } => skipped.push(SkippedRule {
                    rule_id: rule.id.clone(),
                    missing,
                }),
            }
        }

        // Matched fallback rules left unused when a regular rule fired.
        let mut deferred = Vec::new();
        let (fired, outcome) = if !regular.is_empty() {
            deferred = fallback;
            (regular, Outcome::Recommended)
        } else if !fallback.is_empty() {
            debug!(count = fallback.len(), "no regular rule fired; using fallback rules");
            (fallback, Outcome::Fallback)
        } else {
            (Vec::new(), Outcome::NoApplicableRecommendation)
        };

        let mut recommendations = Vec::new();
        let mut suppressed = Vec::new();
        for slot in conflict::resolve(&fired) {
            let rec = recommend(fact, slot)?;
            suppressed.extend(rec.suppressed.iter().cloned());
            recommendations.push(rec);
        }
        if let Some(top) = recommendations.first().and_then(|r| r.supporting_rules.first()) {
            for rule in deferred {
                debug!(rule_id = %rule.id, superseded_by = %top, "fallback rule superseded");
                suppressed.push(SuppressedRule {
                    rule_id: rule.id.clone(),
                    category: rule.category.clone(),
                    action: rule.action.clone(),
                    priority: rule.priority,
                    superseded_by: top.clone(),
                });
            }
        }

        debug!(
            fired = fired.len(),
            recommendations = recommendations.len(),
            suppressed = suppressed.len(),
            skipped = skipped.len(),
            outcome = ?outcome,
            "evaluation complete"
        );

        Ok(Evaluation {
            recommendations,
            suppressed,
            skipped,
            outcome,
            rule_set_fingerprint: rules.fingerprint().to_string(),
        })
    }
}

/// Evaluate a rule set against a normalized fact. See [`InferenceEngine`].
pub fn evaluate(fact: &PatientFact, rules: &RuleSet) -> Result<Evaluation, EvaluationError> {
    InferenceEngine::evaluate(fact, rules)
}

fn recommend(fact: &PatientFact, slot: conflict::Slot<'_>) -> Result<Recommendation, EvaluationError> {
    let conflict::Slot {
        winner,
        supporting,
        suppressed,
    } = slot;
    let rationale = supporting
        .iter()
        .map(|rule| {
            let text = render_rationale(rule, fact).map_err(|message| EvaluationError::Template {
                rule_id: rule.id.clone(),
                message,
            })?;
            Ok(Rationale {
                rule_id: rule.id.clone(),
                text,
                guidance: rule.guidance.clone(),
            })
        })
        .collect::<Result<Vec<_>, EvaluationError>>()?;

    Ok(Recommendation {
        action: winner.action.clone(),
        category: winner.category.clone(),
        supporting_rules: supporting.iter().map(|r| r.id.clone()).collect(),
        rationale,
        priority: winner.priority,
        confidence: supporting.iter().map(|r| r.confidence).fold(0.0, f64::max),
        suppressed,
    })
}

#[cfg(test)]
mod tests;
