//! Multi-kind rule document container and accessors.

use super::{CommonMetadata, RuleBundle, RuleKind, RuleSpec, TreatmentRule};

/// A fully deserialized document of any supported kind.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleDocument {
    Treatment(TreatmentRule),
    Bundle(RuleBundle),
}

/// One rule definition extracted from a document, before compilation.
#[derive(Debug, Clone, Copy)]
pub struct RuleDefinition<'a> {
    pub metadata: &'a CommonMetadata,
    pub spec: &'a RuleSpec,
    /// Enclosing bundle id, if the rule came from a bundle.
    pub bundle: Option<&'a str>,
    /// False when the rule or its bundle is disabled.
    pub enabled: bool,
}

impl RuleDocument {
    /// Get the document's metadata regardless of kind.
    pub fn metadata(&self) -> &CommonMetadata {
        match self {
            RuleDocument::Treatment(rule) => &rule.metadata,
            RuleDocument::Bundle(bundle) => &bundle.metadata,
        }
    }

    pub fn kind(&self) -> RuleKind {
        match self {
            RuleDocument::Treatment(_) => RuleKind::TreatmentRule,
            RuleDocument::Bundle(_) => RuleKind::RuleBundle,
        }
    }

    pub fn api_version(&self) -> &str {
        match self {
            RuleDocument::Treatment(rule) => &rule.api_version,
            RuleDocument::Bundle(bundle) => &bundle.api_version,
        }
    }

    /// Every rule definition in the document, in file order.
    pub fn definitions(&self) -> Vec<RuleDefinition<'_>> {
        match self {
            RuleDocument::Treatment(rule) => vec![RuleDefinition {
                metadata: &rule.metadata,
                spec: &rule.spec,
                bundle: None,
                enabled: rule.metadata.enabled,
            }],
            RuleDocument::Bundle(bundle) => bundle
                .rules
                .iter()
                .map(|r| RuleDefinition {
                    metadata: &r.metadata,
                    spec: &r.spec,
                    bundle: Some(bundle.metadata.id.as_str()),
                    enabled: bundle.metadata.enabled && r.metadata.enabled,
                })
                .collect(),
        }
    }
}
