//! Repository Module
//!
//! Parameterized SQL for the issuance tables. Read paths take the pool;
//! write paths take a live transaction so the orchestrator can compose the
//! history insert, state upsert and worklist delete into one atomic unit
//! of work.

pub mod card;
pub mod employee;
pub mod worklist;

use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepoError::NotFound(err.to_string()),
            other => RepoError::Database(other.to_string()),
        }
    }
}

pub type RepoResult<T> = Result<T, RepoError>;
