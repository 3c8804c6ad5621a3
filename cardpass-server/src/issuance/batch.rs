//! Batch issuance driver
//!
//! Replays the orchestrator over every pending worklist entry of one
//! issuer, strictly sequentially: the physical device handles one card at
//! a time and the protocol has no request-correlation id, so concurrent
//! exchanges must not be attempted. One item's failure never aborts the
//! run or rolls back another item's committed issuance.

use cardpass_device::{DeviceError, DeviceLink, FrameMode};
use tracing::{info, instrument, warn};

use super::service::IssuanceService;
use super::types::{BatchItemResult, CardIssueRequest};
use crate::db::repository::worklist;
use crate::error::{IssueError, IssueResult};

impl<D: DeviceLink> IssuanceService<D> {
    /// Issue cards for every pending worklist entry of one issuer
    ///
    /// Returns a per-item result covering every entry. Only failing to
    /// read the worklist itself fails the whole call.
    #[instrument(skip(self))]
    pub async fn issue_batch(&self, issuer_id: &str) -> IssueResult<Vec<BatchItemResult>> {
        if issuer_id.trim().is_empty() {
            return Err(IssueError::Validation("issuer_id is required".into()));
        }

        // Fail fast before a long sequential run; each item still reports
        // its own transport errors once the run has started.
        if !self.device().is_online().await {
            return Err(IssueError::Device(DeviceError::Connection(
                "device unreachable, batch not started".into(),
            )));
        }

        let pending = worklist::list_pending(&self.db().pool, issuer_id).await?;
        let total = pending.len() as u32;
        info!(total, "Starting batch issuance");

        let mut results = Vec::with_capacity(pending.len());
        for (index, entry) in pending.into_iter().enumerate() {
            let request = CardIssueRequest {
                employee_id: entry.employee_id.clone(),
                card_type: entry.requested_type,
                issuer_id: issuer_id.to_string(),
                card_count: None,
            };
            let mode = FrameMode::Batch {
                sequence: index as u32 + 1,
                total,
            };

            // Consumes the worklist entry inside the item's own transaction
            match self.issue(&request, mode, true).await {
                Ok(outcome) => {
                    results.push(BatchItemResult {
                        employee_id: entry.employee_id,
                        success: true,
                        detail: format!(
                            "count={} serial={} ({}ms)",
                            outcome.card_count, outcome.card_serial, outcome.elapsed_ms
                        ),
                    });
                }
                Err(failure) => {
                    warn!(employee_id = %entry.employee_id, error = %failure, "Batch item failed, continuing");
                    // IssueFailure's Display already appends the elapsed time
                    results.push(BatchItemResult {
                        employee_id: entry.employee_id,
                        success: false,
                        detail: failure.to_string(),
                    });
                }
            }
        }

        info!(
            total,
            succeeded = results.iter().filter(|r| r.success).count(),
            "Batch issuance finished"
        );
        Ok(results)
    }
}
