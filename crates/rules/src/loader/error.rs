//! Error types and load result structures for the rule loader.

use std::path::PathBuf;

use glyco_core::FactType;

/// Errors that make a rule source unusable. Fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum RuleLoadError {
    /// Filesystem I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A rule file or directory could not be read.
    #[error("cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse/deserialization error.
    #[error("YAML parse error in {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{origin}: unknown document kind '{kind}'{}", hint(.suggestion))]
    UnknownKind {
        origin: String,
        kind: String,
        suggestion: Option<String>,
    },

    #[error("{origin}: apiVersion must be 'v1', got '{found}'")]
    UnsupportedApiVersion { origin: String, found: String },

    /// Structurally valid YAML that does not describe a usable rule.
    #[error("rule '{rule_id}' is malformed: {message}")]
    Malformed { rule_id: String, message: String },

    #[error("duplicate rule id '{id}' (defined in {first} and {second})")]
    DuplicateId {
        id: String,
        first: String,
        second: String,
    },

    #[error("rule '{rule_id}': unknown operator '{operator}' at {path}{}", hint(.suggestion))]
    UnknownOperator {
        rule_id: String,
        path: String,
        operator: String,
        suggestion: Option<String>,
    },

    #[error("rule '{rule_id}': unknown fact field '{field}'{}", hint(.suggestion))]
    UnknownField {
        rule_id: String,
        field: String,
        suggestion: Option<String>,
    },

    #[error("rule '{rule_id}': field '{field}' is a {declared}, condition needs a {expected}")]
    FieldType {
        rule_id: String,
        field: String,
        expected: FactType,
        declared: FactType,
    },

    #[error("rule '{rule_id}': invalid rationale template: {message}")]
    Template { rule_id: String, message: String },

    #[error("{} rule load errors: {}", .0.len(), join(.0))]
    Aggregate(Vec<RuleLoadError>),

    /// Filesystem watcher error.
    #[error("Notify watcher error: {0}")]
    Notify(#[from] notify::Error),
}

impl RuleLoadError {
    /// Collapse a list of errors: none → `Ok`, one → itself, many → `Aggregate`.
    pub fn from_many(mut errors: Vec<RuleLoadError>) -> std::result::Result<(), RuleLoadError> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(RuleLoadError::Aggregate(errors)),
        }
    }

    /// The individual errors, flattening `Aggregate`.
    pub fn errors(&self) -> Vec<&RuleLoadError> {
        match self {
            RuleLoadError::Aggregate(errors) => errors.iter().flat_map(|e| e.errors()).collect(),
            other => vec![other],
        }
    }
}

fn hint(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!(" (did you mean '{}'?)", s),
        None => String::new(),
    }
}

fn join(errors: &[RuleLoadError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result alias for rule loading.
pub type Result<T> = std::result::Result<T, RuleLoadError>;

/// Outcome of loading a single rule file.
#[derive(Debug)]
pub struct LoadResult {
    /// Path to the file that was loaded.
    pub path: PathBuf,
    /// Status of the load attempt.
    pub status: LoadStatus,
}

/// Status of a single file load attempt.
#[derive(Debug)]
pub enum LoadStatus {
    /// File parsed; lists the rule ids it defines.
    Loaded { rule_ids: Vec<String> },
    /// File was skipped (dotfile, non-YAML, etc.).
    Skipped { reason: String },
    /// Parse or validation error occurred.
    Failed { error: String },
}
