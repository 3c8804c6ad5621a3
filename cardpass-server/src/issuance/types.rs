//! Issuance request/result types

use crate::db::models::CardType;
use crate::error::{IssueError, IssueResult};
use serde::{Deserialize, Serialize};

/// One issuance attempt, submitted by the (external) HTTP layer
#[derive(Debug, Clone, Deserialize)]
pub struct CardIssueRequest {
    pub employee_id: String,
    pub card_type: CardType,
    /// Operator triggering the issuance
    pub issuer_id: String,
    /// Explicit issuance count; takes precedence over the computed
    /// `max + 1` for serial-tracking types. Ignored for PVC.
    #[serde(default)]
    pub card_count: Option<i64>,
}

impl CardIssueRequest {
    pub fn validate(&self) -> IssueResult<()> {
        if self.employee_id.trim().is_empty() {
            return Err(IssueError::Validation("employee_id is required".into()));
        }
        if self.issuer_id.trim().is_empty() {
            return Err(IssueError::Validation("issuer_id is required".into()));
        }
        if let Some(count) = self.card_count
            && count < 0
        {
            return Err(IssueError::Validation("card_count must be >= 0".into()));
        }
        Ok(())
    }
}

/// Outcome of a committed issuance
#[derive(Debug, Clone, Serialize)]
pub struct CardIssueResult {
    pub employee_id: String,
    pub card_count: i64,
    pub card_serial: String,
    pub card_type: CardType,
    pub elapsed_ms: u64,
}

/// Per-item outcome of a batch run
#[derive(Debug, Clone, Serialize)]
pub struct BatchItemResult {
    pub employee_id: String,
    pub success: bool,
    pub detail: String,
}
