//! Rule validation with structured errors and suggestions.
//!
//! Checks every aspect of a rule definition: metadata, spec fields, the
//! rationale template, and the condition tree (operators, arity, field names
//! and field types against the [`glyco_core::FactSchema`]). Returns a
//! [`ValidationReport`] with errors (block loading) and warnings (advisory).

mod condition_checks;
mod rule_checks;

pub mod fuzzy;

pub(crate) use condition_checks::check_predicate_fields;
pub(crate) use rule_checks::compile_definition;

use serde::{Deserialize, Serialize};

use crate::loader::{LoadResult, LoadStatus, RuleLoadError};

/// A non-blocking advisory warning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationWarning {
    /// Location, e.g. `"ada-2025.yml: insulin-severe.metadata.id"`.
    pub path: String,
    pub message: String,
}

/// Everything found while validating a rule source.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<RuleLoadError>,
    pub warnings: Vec<ValidationWarning>,
    /// Per-file outcomes, in scan order.
    pub files: Vec<LoadResult>,
    /// Definitions examined, enabled or not.
    pub rules_checked: usize,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub(crate) fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ValidationWarning {
            path: path.into(),
            message: message.into(),
        });
    }

    /// Number of files that parsed and validated.
    pub fn files_loaded(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.status, LoadStatus::Loaded { .. }))
            .count()
    }

    /// Individual errors, with aggregates flattened.
    pub fn error_list(&self) -> Vec<&RuleLoadError> {
        self.errors.iter().flat_map(|e| e.errors()).collect()
    }
}
