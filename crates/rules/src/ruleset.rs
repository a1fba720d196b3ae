//! Immutable, priority-ordered rule collection.

use std::collections::{BTreeSet, HashMap};

use glyco_core::{FactSchema, PatientFact};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::engine::EvaluationError;
use crate::loader::RuleLoadError;
use crate::rule::Rule;
use crate::templating::validate_template;
use crate::validation::check_predicate_fields;

/// How one rule relates to a fact.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleAssessment<'a> {
    Matched(&'a Rule),
    NotMatched(&'a Rule),
    /// Required fields were absent; the rule was never evaluated.
    Skipped { rule: &'a Rule, missing: Vec<String> },
}

impl<'a> RuleAssessment<'a> {
    pub fn rule(&self) -> &'a Rule {
        match self {
            RuleAssessment::Matched(rule) | RuleAssessment::NotMatched(rule) => rule,
            RuleAssessment::Skipped { rule, .. } => rule,
        }
    }
}

/// An immutable snapshot of rules, ordered by descending priority with ties
/// broken by ascending id.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
    index: HashMap<String, usize>,
    fingerprint: String,
}

impl RuleSet {
    /// Build a rule set. Fails on duplicate ids or unparsable rationale templates.
    pub fn new(mut rules: Vec<Rule>) -> Result<Self, RuleLoadError> {
        let mut errors = Vec::new();
        let mut seen: HashMap<&str, usize> = HashMap::new();
        for (i, rule) in rules.iter().enumerate() {
            if let Some(first) = seen.insert(rule.id.as_str(), i) {
                errors.push(RuleLoadError::DuplicateId {
                    id: rule.id.clone(),
                    first: format!("rule #{}", first + 1),
                    second: format!("rule #{}", i + 1),
                });
            }
            if let Err(message) = validate_template(&rule.rationale) {
                errors.push(RuleLoadError::Template {
                    rule_id: rule.id.clone(),
                    message,
                });
            }
        }
        RuleLoadError::from_many(errors)?;

        rules.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.id.cmp(&b.id)));
        let index = rules
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.clone(), i))
            .collect();
        let fingerprint = compute_fingerprint(&rules)?;

        Ok(Self {
            rules,
            index,
            fingerprint,
        })
    }

    pub fn empty() -> Self {
        Self {
            rules: Vec::new(),
            index: HashMap::new(),
            // Canonical JSON of an empty rule list.
            fingerprint: hex_digest(b"[]"),
        }
    }

    /// Check every rule's field references against a fact schema.
    pub fn check_schema(&self, schema: &FactSchema) -> Result<(), RuleLoadError> {
        let errors = self
            .rules
            .iter()
            .flat_map(|r| check_predicate_fields(&r.id, &r.predicate, &r.requires, schema))
            .collect();
        RuleLoadError::from_many(errors)
    }

    /// Assess every rule (fallback rules included) against the fact, in priority order.
    pub fn assess(&self, fact: &PatientFact) -> Result<Vec<RuleAssessment<'_>>, EvaluationError> {
        let mut out = Vec::with_capacity(self.rules.len());
        for rule in &self.rules {
            let missing = rule.missing_requirements(fact);
            if !missing.is_empty() {
                debug!(rule_id = %rule.id, missing = ?missing, "rule skipped: required fields absent");
                out.push(RuleAssessment::Skipped { rule, missing });
                continue;
            }
            if rule.predicate.evaluate(fact, &rule.id)? {
                debug!(rule_id = %rule.id, priority = rule.priority, "rule matched");
                out.push(RuleAssessment::Matched(rule));
            } else {
                out.push(RuleAssessment::NotMatched(rule));
            }
        }
        Ok(out)
    }

    /// Non-fallback rules that match the fact, in priority order.
    pub fn matching_rules(&self, fact: &PatientFact) -> Result<Vec<&Rule>, EvaluationError> {
        Ok(self
            .assess(fact)?
            .into_iter()
            .filter_map(|a| match a {
                RuleAssessment::Matched(rule) if !rule.fallback => Some(rule),
                _ => None,
            })
            .collect())
    }

    pub fn get(&self, id: &str) -> Option<&Rule> {
        self.index.get(id).map(|&i| &self.rules[i])
    }

    /// Rules in priority order.
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn categories(&self) -> BTreeSet<&str> {
        self.rules.iter().map(|r| r.category.as_str()).collect()
    }

    /// SHA-256 over the canonical serialization of the ordered rules.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::empty()
    }
}

fn compute_fingerprint(rules: &[Rule]) -> Result<String, RuleLoadError> {
    let canonical = serde_json::to_vec(rules).map_err(|e| RuleLoadError::Malformed {
        rule_id: "<rule set>".to_string(),
        message: format!("cannot serialize rule set: {e}"),
    })?;
    Ok(hex_digest(&canonical))
}

fn hex_digest(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    format!("{digest:x}")
}

// ── Tests ───────────────────────────────────────────────────────────
