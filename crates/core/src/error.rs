use thiserror::Error;

use crate::schema::ParamType;

/// Reasons a model response fails to satisfy the `addReceipt` contract.
///
/// None of these are transient: they describe the model's output, not the
/// transport, so callers never retry on them.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("expected 1 candidate, got: {0}")]
    CandidateCount(usize),
    #[error("expected 1 part, got: {0}")]
    PartCount(usize),
    #[error("expected {expected}, got: {found}")]
    PartKind {
        expected: &'static str,
        found: String,
    },
    #[error("expected {expected}, got: {found}")]
    WrongFunction { expected: &'static str, found: String },
    #[error("args ({args}) is missing required parameter {name}")]
    MissingParameter { name: &'static str, args: String },
    #[error("parameter {name} must be {expected}, got: {found}")]
    WrongType {
        name: &'static str,
        expected: ParamType,
        found: &'static str,
    },
    #[error("malformed JSON in text response: {0}")]
    Json(#[from] serde_json::Error),
}
