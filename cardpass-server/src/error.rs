//! Issuance error taxonomy
//!
//! Every failure of an issuance attempt maps to exactly one variant, and
//! every variant maps to one HTTP-equivalent class for the (external) API
//! layer. No variant is retried internally; a failed attempt must be
//! resubmitted as a brand-new attempt.

use crate::db::repository::RepoError;
use cardpass_device::DeviceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IssueError {
    /// Bad or missing input, rejected before any I/O
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Employee absent or not in active/working status
    #[error("Employee not found or not active: {0}")]
    EmployeeNotFound(String),

    /// Transport-level failure: timeout, no response, connection error
    #[error(transparent)]
    Device(#[from] DeviceError),

    /// The device responded but declined the issuance
    #[error("Device issuance failed — result code: {code}")]
    DeviceRejected { code: String },

    /// Data-layer failure before the device acted
    #[error("Database error: {0}")]
    Persistence(String),

    /// Data-layer failure after the device already issued the card.
    /// The physical card exists but no record of it survives; this state
    /// cannot be self-healed and must reach an operator.
    #[error("Card issued by device but recording it failed: {0}")]
    PersistenceAfterIssue(String),
}

impl IssueError {
    /// HTTP-equivalent status class for the external API layer
    pub fn http_status(&self) -> u16 {
        match self {
            IssueError::Validation(_) => 400,
            IssueError::EmployeeNotFound(_) => 404,
            IssueError::Device(DeviceError::Timeout { .. }) => 504,
            IssueError::Device(_) => 502,
            IssueError::DeviceRejected { .. } => 422,
            IssueError::Persistence(_) | IssueError::PersistenceAfterIssue(_) => 500,
        }
    }
}

impl From<RepoError> for IssueError {
    fn from(err: RepoError) -> Self {
        IssueError::Persistence(err.to_string())
    }
}

pub type IssueResult<T> = Result<T, IssueError>;

/// A failed issuance attempt with its elapsed processing time
///
/// Every attempt reports how long it ran, success or failure.
#[derive(Debug, Error)]
#[error("{error} ({elapsed_ms}ms)")]
pub struct IssueFailure {
    #[source]
    pub error: IssueError,
    pub elapsed_ms: u64,
}

impl IssueFailure {
    pub fn http_status(&self) -> u16 {
        self.error.http_status()
    }
}
