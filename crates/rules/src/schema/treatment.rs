//! Single treatment rule document and the rule body shared with bundles.

use serde::{Deserialize, Serialize};

use super::{CommonMetadata, Condition};

/// Top-level `kind: TreatmentRule` document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TreatmentRule {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub metadata: CommonMetadata,
    pub spec: RuleSpec,
}

/// Condition → recommendation body of a rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RuleSpec {
    /// Action category. Rules in the same category compete for one slot.
    pub category: String,
    /// Recommended action (treatment class).
    pub action: String,
    /// Higher wins.
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    /// Only considered when no regular rule fires.
    #[serde(default)]
    pub fallback: bool,
    /// Fields that must be present for the rule to be considered.
    /// Defaults to every field the condition reads.
    #[serde(default)]
    pub requires: Option<Vec<String>>,
    pub when: Condition,
    /// Minijinja template rendered against the patient fact.
    pub rationale: String,
    #[serde(default)]
    pub guidance: Option<Guidance>,
}

fn default_confidence() -> f64 {
    1.0
}

/// Dosage and guideline citation attached to a recommendation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Guidance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dosage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dosage_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guideline_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guideline_text: Option<String>,
}

impl Guidance {
    pub fn is_empty(&self) -> bool {
        self.dosage.is_none()
            && self.dosage_reason.is_none()
            && self.guideline_ref.is_none()
            && self.guideline_text.is_none()
    }
}
