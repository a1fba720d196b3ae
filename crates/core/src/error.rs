use thiserror::Error;

/// Bad or missing patient input. Recoverable by resubmitting the record.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("{field} value {value} is out of range [{min}, {max}]")]
    OutOfRange {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{field}: expected {expected}, got {found}")]
    NotCoercible {
        field: String,
        expected: &'static str,
        found: String,
    },

    #[error("{field}: value is not a finite number")]
    NonFinite { field: String },

    #[error("{} problems in patient record: {}", .0.len(), join_errors(.0))]
    Multiple(Vec<ValidationError>),
}

impl ValidationError {
    /// Flatten into the individual field problems.
    pub fn problems(&self) -> Vec<&ValidationError> {
        match self {
            ValidationError::Multiple(errors) => errors.iter().collect(),
            other => vec![other],
        }
    }

    /// Name of the offending field, if the error is about a single field.
    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationError::MissingField(field)
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::NotCoercible { field, .. }
            | ValidationError::NonFinite { field } => Some(field),
            ValidationError::Multiple(_) => None,
        }
    }
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
