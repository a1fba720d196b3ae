//! Document kind enum for two-pass deserialization dispatch.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported document kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleKind {
    TreatmentRule,
    RuleBundle,
}

impl RuleKind {
    pub const ALL: &'static [&'static str] = &["TreatmentRule", "RuleBundle"];
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleKind::TreatmentRule => write!(f, "TreatmentRule"),
            RuleKind::RuleBundle => write!(f, "RuleBundle"),
        }
    }
}

impl FromStr for RuleKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "TreatmentRule" => Ok(RuleKind::TreatmentRule),
            "RuleBundle" => Ok(RuleKind::RuleBundle),
            other => Err(format!("unknown document kind: '{}'", other)),
        }
    }
}
