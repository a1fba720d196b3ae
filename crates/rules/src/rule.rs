//! Compiled treatment rule.

use std::collections::BTreeSet;

use glyco_core::PatientFact;
use serde::{Deserialize, Serialize};

use crate::predicate::Predicate;
use crate::schema::Guidance;

/// A validated rule ready for evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub name: String,
    pub category: String,
    pub action: String,
    /// Higher wins.
    pub priority: i32,
    pub confidence: f64,
    pub fallback: bool,
    /// Fields that must all be present for the rule to be considered.
    pub requires: BTreeSet<String>,
    pub predicate: Predicate,
    /// Minijinja template rendered against the fact when the rule fires.
    pub rationale: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidance: Option<Guidance>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Rule {
    /// Rule requiring every field its predicate reads, with confidence 1.0.
    pub fn new(
        id: impl Into<String>,
        category: impl Into<String>,
        action: impl Into<String>,
        priority: i32,
        predicate: Predicate,
    ) -> Self {
        let id = id.into();
        let requires = predicate.fields().into_iter().map(str::to_string).collect();
        Self {
            name: id.clone(),
            id,
            category: category.into(),
            action: action.into(),
            priority,
            confidence: 1.0,
            fallback: false,
            requires,
            predicate,
            rationale: String::new(),
            guidance: None,
            tags: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_rationale(mut self, template: impl Into<String>) -> Self {
        self.rationale = template.into();
        self
    }

    pub fn with_requires<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requires = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_guidance(mut self, guidance: Guidance) -> Self {
        self.guidance = Some(guidance);
        self
    }

    pub fn as_fallback(mut self) -> Self {
        self.fallback = true;
        self
    }

    /// Required fields absent from the fact, in sorted order.
    pub fn missing_requirements(&self, fact: &PatientFact) -> Vec<String> {
        self.requires
            .iter()
            .filter(|f| !fact.contains(f))
            .cloned()
            .collect()
    }
}
