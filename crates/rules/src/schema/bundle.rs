//! Versioned multi-rule bundle document.

use serde::{Deserialize, Serialize};

use super::{CommonMetadata, RuleSpec};

/// Top-level `kind: RuleBundle` document holding many rules.
///
/// A disabled bundle disables every rule in it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RuleBundle {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub metadata: CommonMetadata,
    #[serde(default)]
    pub rules: Vec<BundledRule>,
}

/// One rule inside a bundle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BundledRule {
    pub metadata: CommonMetadata,
    pub spec: RuleSpec,
}
