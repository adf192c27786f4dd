//! Grading, statistics and achievement logic.
//!
//! Everything here talks to storage only through [`QuizStore`](crate::store::QuizStore)
//! and returns plain data; HTTP concerns stay in `handlers`.

use thiserror::Error;

use crate::store::StoreError;

pub mod achievements;
pub mod authoring;
pub mod evaluator;
pub mod scorer;
pub mod statistics;
pub mod submission;

/// Errors surfaced by the services.
#[derive(Debug, Error)]
pub enum QuizError {
    /// Malformed input, or a stored question the evaluator cannot handle.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    /// The actor may not touch the resource.
    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("persistence error: {0}")]
    Persistence(StoreError),

    /// Generic submission failure. The cause is logged, not exposed.
    #[error("failed to submit quiz attempt")]
    SubmissionFailed,
}

impl From<StoreError> for QuizError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidRecord(msg) => QuizError::Validation(msg),
            other => QuizError::Persistence(other),
        }
    }
}

pub type QuizResult<T> = Result<T, QuizError>;
