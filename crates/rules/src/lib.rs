//! Rule-based treatment recommendation engine.
//!
//! This crate provides:
//! - YAML rule definitions (single rules and versioned bundles) with serde
//!   deserialization and a closed predicate grammar
//! - Load-time validation against the fact schema with "did you mean"
//!   suggestions
//! - An immutable, priority-ordered [`RuleSet`] and a stateless inference
//!   engine with per-category conflict resolution
//! - Deterministic explanations of recommendations and full audit traces
//! - A copy-and-swap [`RuleStore`] with hot-reload via `notify` watcher

pub mod engine;
pub mod explain;
pub mod loader;
pub mod predicate;
pub mod rule;
pub mod ruleset;
pub mod schema;
pub mod store;
mod templating;
pub mod validation;

pub use engine::{
    evaluate, Evaluation, EvaluationError, InferenceEngine, Outcome, Rationale, Recommendation,
    SkippedRule, SuppressedRule,
};
pub use explain::{explain, explain_evaluation};
pub use loader::{
    load_rules, validate_source, LoadResult, LoadStatus, RuleLoadError, RuleLoader, RuleSource, RuleWatcher,
};
pub use predicate::{ComparisonOperator, LogicalOperator, Predicate};
pub use rule::Rule;
pub use ruleset::{RuleAssessment, RuleSet};
pub use store::RuleStore;
pub use validation::{ValidationReport, ValidationWarning};
