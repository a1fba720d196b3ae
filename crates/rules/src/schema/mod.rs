//! YAML DSL schema types with serde deserialization.
//!
//! Defines the type hierarchy for rule documents:
//! - `RuleEnvelope`: lightweight first-pass header (apiVersion, kind, metadata)
//! - `RuleDocument`: enum dispatching to kind-specific types
//! - `TreatmentRule`: a single condition → recommendation rule
//! - `RuleBundle`: a versioned pack of rules in one file
//!
//! These are the raw, as-written shapes. The loader validates them and
//! compiles them into [`crate::Rule`] values.

mod bundle;
mod condition;
mod document;
mod envelope;
mod kind;
mod metadata;
mod treatment;

pub use bundle::*;
pub use condition::*;
pub use document::*;
pub use envelope::*;
pub use kind::*;
pub use metadata::*;
pub use treatment::*;

/// The only supported `apiVersion`.
pub const API_VERSION: &str = "v1";
