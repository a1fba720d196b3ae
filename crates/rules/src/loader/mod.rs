//! Filesystem rule loader with hot-reload via `notify` watcher.
//!
//! Reads YAML rule documents from a directory, a single file or inline text,
//! validates every definition against the fact schema, and compiles them into
//! an immutable [`RuleSet`]. Supports all document kinds via two-pass
//! deserialization (RuleEnvelope -> RuleDocument).

mod core;
mod error;
mod watcher;

#[cfg(test)]
mod tests;

pub use self::core::{RuleLoader, RuleSource};
pub use self::error::{LoadResult, LoadStatus, Result, RuleLoadError};
pub use self::watcher::RuleWatcher;

use glyco_core::FactSchema;

use crate::ruleset::RuleSet;
use crate::validation::ValidationReport;

/// Load a rule set from `source`, validating against `schema`.
pub fn load_rules(source: &RuleSource, schema: &FactSchema) -> Result<RuleSet> {
    RuleLoader::new(schema.clone()).load(source)
}

/// Validate `source` and report every error and warning without failing.
pub fn validate_source(source: &RuleSource, schema: &FactSchema) -> ValidationReport {
    RuleLoader::new(schema.clone()).validate(source)
}
