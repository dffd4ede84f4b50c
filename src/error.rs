use thiserror::Error;

/// Rejected engine input. Every variant names the offending field.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("term_limit must be between 1 and 4, got {0}")]
    TermLimit(u8),

    #[error("term must be between 1 and 5, got {0}")]
    Term(u8),

    #[error("value for {field} must lie in [0, 10], got {value}")]
    GradeValue { field: &'static str, value: f64 },

    #[error("{field} must not be empty")]
    Identifier { field: &'static str },

    #[error("unknown {field}: {id}")]
    UnknownId { field: &'static str, id: String },
}
