//! Common metadata shared across all document kinds.

use serde::{Deserialize, Serialize};

/// Shared metadata for rules and bundles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CommonMetadata {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Free-form version label of the definition (e.g. `2025.1`).
    #[serde(default)]
    pub version: Option<String>,
}

pub(crate) fn default_true() -> bool {
    true
}
