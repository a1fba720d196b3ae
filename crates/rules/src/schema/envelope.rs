//! Rule envelope for lightweight first-pass deserialization.

use serde::{Deserialize, Serialize};

use super::{CommonMetadata, RuleDocument, RuleKind};

/// First-pass deserializer that reads only the header fields.
///
/// Used during two-pass loading: first extract `kind` to determine the
/// concrete type, then deserialize the full document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleEnvelope {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub metadata: CommonMetadata,
    /// Remaining fields captured as raw YAML for second-pass deserialization.
    #[serde(flatten)]
    pub rest: serde_yaml::Value,
}

impl RuleEnvelope {
    /// Parse the `kind` field into a typed [`RuleKind`].
    pub fn rule_kind(&self) -> std::result::Result<RuleKind, String> {
        self.kind.parse()
    }

    /// Two-pass: reconstruct the full YAML value and deserialize into the concrete type.
    pub fn parse_full(&self) -> std::result::Result<RuleDocument, serde_yaml::Error> {
        let value = serde_yaml::to_value(self)?;
        match self.rule_kind() {
            Ok(RuleKind::TreatmentRule) => Ok(RuleDocument::Treatment(serde_yaml::from_value(value)?)),
            Ok(RuleKind::RuleBundle) => Ok(RuleDocument::Bundle(serde_yaml::from_value(value)?)),
            // Callers check the kind first; a bad kind is reported there.
            Err(e) => Err(<serde_yaml::Error as serde::de::Error>::custom(e)),
        }
    }
}
