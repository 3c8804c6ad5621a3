//! Issuance orchestrator
//!
//! One issuance attempt runs LOAD_PROFILE → COMPUTE_SEQUENCE →
//! SEND_TO_DEVICE → PARSE_RESPONSE → PERSIST. Nothing touches the
//! datastore until the device has confirmed the card, and the history
//! insert, current-card upsert and (in batch mode) worklist delete are one
//! transaction: either all survive or none do.
//!
//! COMPUTE_SEQUENCE..PERSIST is serialized per employee with a keyed lock,
//! otherwise two concurrent attempts for the same employee could compute
//! the same next count.

use std::sync::Arc;
use std::time::Instant;

use cardpass_device::{DeviceLink, DeviceReply, FrameMode, IssueFrame, decode_ms949};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};

use super::types::{CardIssueRequest, CardIssueResult};
use crate::db::DbService;
use crate::db::models::{CARD_STATUS_ACTIVE, CardIssueRecord, CurrentCardState, EmployeeCardProfile};
use crate::db::repository::{RepoResult, card, employee, worklist};
use crate::error::{IssueError, IssueFailure, IssueResult};
use crate::util::now_millis;

/// Serial placeholder for cards without a device-assigned CSN
const SERIAL_PLACEHOLDER: &str = "-";

/// Card issuance service
///
/// Owns the datastore handle and the device link; generic over the link so
/// tests can script the device.
pub struct IssuanceService<D: DeviceLink> {
    db: DbService,
    device: D,
    employee_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl<D: DeviceLink> IssuanceService<D> {
    pub fn new(db: DbService, device: D) -> Self {
        Self {
            db,
            device,
            employee_locks: DashMap::new(),
        }
    }

    pub fn db(&self) -> &DbService {
        &self.db
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Issue one card immediately
    pub async fn issue_card(
        &self,
        request: &CardIssueRequest,
    ) -> Result<CardIssueResult, IssueFailure> {
        self.issue(request, FrameMode::Immediate, false).await
    }

    /// Run one issuance attempt; shared by the immediate and batch paths.
    /// Both outcomes carry the elapsed processing time.
    #[instrument(skip(self, request), fields(employee_id = %request.employee_id, card_type = ?request.card_type))]
    pub(crate) async fn issue(
        &self,
        request: &CardIssueRequest,
        mode: FrameMode,
        consume_worklist: bool,
    ) -> Result<CardIssueResult, IssueFailure> {
        let started = Instant::now();
        match self.issue_inner(request, mode, consume_worklist, &started).await {
            Ok(outcome) => {
                info!(
                    card_count = outcome.card_count,
                    card_serial = %outcome.card_serial,
                    elapsed_ms = outcome.elapsed_ms,
                    "Card issued"
                );
                Ok(outcome)
            }
            Err(error) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                warn!(elapsed_ms, error = %error, "Card issuance failed");
                Err(IssueFailure { error, elapsed_ms })
            }
        }
    }

    async fn issue_inner(
        &self,
        request: &CardIssueRequest,
        mode: FrameMode,
        consume_worklist: bool,
        started: &Instant,
    ) -> IssueResult<CardIssueResult> {
        request.validate()?;

        // LOAD_PROFILE
        let profile = employee::find_profile(&self.db.pool, &request.employee_id)
            .await?
            .ok_or_else(|| IssueError::EmployeeNotFound(request.employee_id.clone()))?;

        let lock = self.employee_lock(&request.employee_id);
        let _guard = lock.lock().await;

        // COMPUTE_SEQUENCE
        let card_count = self.next_card_count(request).await?;

        // SEND_TO_DEVICE: nothing is persisted yet, so any transport
        // failure aborts cleanly here.
        let frame = build_frame(request, &profile, card_count, mode);
        let reply_bytes = self.device.exchange(&frame.encode()?).await?;

        // PARSE_RESPONSE
        let reply = DeviceReply::parse(&decode_ms949(&reply_bytes))?;
        if !reply.is_success() {
            return Err(IssueError::DeviceRejected {
                code: reply.result_code().to_string(),
            });
        }
        let card_serial = if request.card_type.tracks_serial() {
            // Raw-text firmware confirms success without a CSN
            reply.csn().unwrap_or(SERIAL_PLACEHOLDER).to_string()
        } else {
            SERIAL_PLACEHOLDER.to_string()
        };

        // PERSIST: one transaction for the history row, the current-card
        // upsert and, in batch mode, the consumed worklist entry.
        let now = now_millis();
        let record = CardIssueRecord {
            employee_id: request.employee_id.clone(),
            department: profile.department.clone(),
            position: profile.position.clone(),
            card_count,
            card_serial: card_serial.clone(),
            card_type: request.card_type,
            issuer_id: request.issuer_id.clone(),
            issued_at: now,
        };
        let state = CurrentCardState {
            employee_id: request.employee_id.clone(),
            card_count,
            status: CARD_STATUS_ACTIVE.to_string(),
            card_serial: card_serial.clone(),
            card_type: request.card_type,
            updated_at: now,
        };

        if let Err(e) = self
            .persist(&record, &state, consume_worklist.then_some(&request.issuer_id))
            .await
        {
            // The device has already printed/encoded the card; there is no
            // compensating call to void it. Surface the mismatch loudly.
            error!(
                employee_id = %request.employee_id,
                card_count,
                card_serial = %card_serial,
                error = %e,
                "Physical card issued but records were not saved; manual reconciliation required"
            );
            return Err(IssueError::PersistenceAfterIssue(e.to_string()));
        }

        Ok(CardIssueResult {
            employee_id: request.employee_id.clone(),
            card_count,
            card_serial,
            card_type: request.card_type,
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// PVC records the placeholder 0; serial-tracking types use the
    /// caller-supplied count when present, else max(existing) + 1.
    async fn next_card_count(&self, request: &CardIssueRequest) -> IssueResult<i64> {
        if request.card_type.uses_placeholder_count() {
            return Ok(0);
        }
        if let Some(count) = request.card_count {
            return Ok(count);
        }
        let mut conn = self
            .db
            .pool
            .acquire()
            .await
            .map_err(|e| IssueError::Persistence(e.to_string()))?;
        let max = card::max_card_count(&mut *conn, &request.employee_id).await?;
        Ok(max + 1)
    }

    async fn persist(
        &self,
        record: &CardIssueRecord,
        state: &CurrentCardState,
        consume_for_issuer: Option<&String>,
    ) -> RepoResult<()> {
        let mut tx = self.db.pool.begin().await?;
        card::insert_issue_record(&mut *tx, record).await?;
        card::upsert_current_card(&mut *tx, state).await?;
        if let Some(issuer_id) = consume_for_issuer {
            worklist::delete_entry(&mut *tx, &record.employee_id, issuer_id).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    fn employee_lock(&self, employee_id: &str) -> Arc<Mutex<()>> {
        self.employee_locks
            .entry(employee_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

fn build_frame(
    request: &CardIssueRequest,
    profile: &EmployeeCardProfile,
    card_count: i64,
    mode: FrameMode,
) -> IssueFrame {
    let mut frame = IssueFrame::new(
        &profile.employee_id,
        &profile.name,
        &profile.department,
        &profile.position,
        card_count,
        request.card_type.wire_code(),
    )
    .with_mode(mode);
    if let Some(photo) = &profile.photo {
        frame = frame.with_photo(photo.clone());
    }
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::CardType;
    use crate::db::repository::employee::insert_test_employee;
    use crate::issuance::testutil::{Scripted, scripted_service};
    use cardpass_device::DeviceError;

    fn request(card_type: CardType) -> CardIssueRequest {
        CardIssueRequest {
            employee_id: "EMP001".into(),
            card_type,
            issuer_id: "admin".into(),
            card_count: None,
        }
    }

    #[tokio::test]
    async fn test_rfid_count_increments_per_issuance() {
        let service = scripted_service(vec![
            Scripted::Reply(r#"{"result":"100","cardCSN":"AAA"}"#),
            Scripted::Reply(r#"{"result":"100","cardCSN":"BBB"}"#),
        ])
        .await;
        insert_test_employee(&service.db().pool, "EMP001", "김철수", "총무부", "과장", true).await;

        let first = service.issue_card(&request(CardType::Rfid)).await.unwrap();
        assert_eq!(first.card_count, 1);
        assert_eq!(first.card_serial, "AAA");

        let second = service.issue_card(&request(CardType::Rfid)).await.unwrap();
        assert_eq!(second.card_count, 2);
        assert_eq!(second.card_serial, "BBB");

        let current = card::current_card(&service.db().pool, "EMP001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(current.card_count, 2);
        assert_eq!(current.card_serial, "BBB");
        assert_eq!(current.status, CARD_STATUS_ACTIVE);

        let history = card::list_history(&service.db().pool, "EMP001").await.unwrap();
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn test_pvc_always_records_placeholder_count_and_serial() {
        let service = scripted_service(vec![
            Scripted::Reply(r#"{"result":"100","cardCSN":"AAA"}"#),
            Scripted::Reply(r#"{"result":"100"}"#),
        ])
        .await;
        insert_test_employee(&service.db().pool, "EMP001", "김철수", "총무부", "과장", true).await;

        // Even when the device reports a CSN, PVC cards record the placeholder
        let first = service.issue_card(&request(CardType::Pvc)).await.unwrap();
        assert_eq!(first.card_count, 0);
        assert_eq!(first.card_serial, "-");

        let second = service.issue_card(&request(CardType::Pvc)).await.unwrap();
        assert_eq!(second.card_count, 0);

        let history = card::list_history(&service.db().pool, "EMP001").await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|r| r.card_count == 0));
    }

    #[tokio::test]
    async fn test_explicit_count_takes_precedence() {
        let service =
            scripted_service(vec![Scripted::Reply(r#"{"result":"100","cardCSN":"AAA"}"#)]).await;
        insert_test_employee(&service.db().pool, "EMP001", "김철수", "총무부", "과장", true).await;

        let mut req = request(CardType::Rfid);
        req.card_count = Some(9);
        let result = service.issue_card(&req).await.unwrap();
        assert_eq!(result.card_count, 9);
    }

    #[tokio::test]
    async fn test_raw_reply_commits_with_placeholder_serial() {
        let service = scripted_service(vec![Scripted::Reply("ISSUE|100|DONE")]).await;
        insert_test_employee(&service.db().pool, "EMP001", "김철수", "총무부", "과장", true).await;

        let result = service.issue_card(&request(CardType::Rfid)).await.unwrap();
        assert_eq!(result.card_serial, "-");
        assert_eq!(result.card_count, 1);
    }

    #[tokio::test]
    async fn test_device_rejection_persists_nothing() {
        let service = scripted_service(vec![Scripted::Reply(r#"{"result":"200"}"#)]).await;
        insert_test_employee(&service.db().pool, "EMP001", "김철수", "총무부", "과장", true).await;

        let err = service.issue_card(&request(CardType::Rfid)).await.unwrap_err();
        assert!(matches!(err.error, IssueError::DeviceRejected { ref code } if code == "200"));

        assert!(card::list_history(&service.db().pool, "EMP001").await.unwrap().is_empty());
        assert!(card::current_card(&service.db().pool, "EMP001").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_device_timeout_persists_nothing() {
        let service = scripted_service(vec![Scripted::Timeout]).await;
        insert_test_employee(&service.db().pool, "EMP001", "김철수", "총무부", "과장", true).await;

        let err = service.issue_card(&request(CardType::Rfid)).await.unwrap_err();
        assert!(matches!(err.error, IssueError::Device(DeviceError::Timeout { .. })));

        assert!(card::list_history(&service.db().pool, "EMP001").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_device_reply_surfaces_as_no_response() {
        let service = scripted_service(vec![Scripted::NoResponse]).await;
        insert_test_employee(&service.db().pool, "EMP001", "김철수", "총무부", "과장", true).await;

        let err = service.issue_card(&request(CardType::Rfid)).await.unwrap_err();
        assert!(matches!(err.error, IssueError::Device(DeviceError::NoResponse)));
        assert!(card::list_history(&service.db().pool, "EMP001").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_or_inactive_employee_is_not_found() {
        let service = scripted_service(vec![]).await;
        insert_test_employee(&service.db().pool, "EMP002", "이영희", "인사팀", "대리", false).await;

        let err = service.issue_card(&request(CardType::Rfid)).await.unwrap_err();
        assert!(matches!(err.error, IssueError::EmployeeNotFound(_)));

        let mut req = request(CardType::Rfid);
        req.employee_id = "EMP002".into();
        let err = service.issue_card(&req).await.unwrap_err();
        assert!(matches!(err.error, IssueError::EmployeeNotFound(_)));

        // The device was never contacted
        assert!(service.device().sent_frames().is_empty());
    }

    #[tokio::test]
    async fn test_validation_happens_before_any_io() {
        let service = scripted_service(vec![]).await;

        let mut req = request(CardType::Rfid);
        req.employee_id = String::new();
        let err = service.issue_card(&req).await.unwrap_err();
        assert!(matches!(err.error, IssueError::Validation(_)));
        assert!(service.device().sent_frames().is_empty());
    }

    #[tokio::test]
    async fn test_failure_outcome_reports_elapsed_time() {
        let service = scripted_service(vec![Scripted::Reply(r#"{"result":"200"}"#)]).await;
        insert_test_employee(&service.db().pool, "EMP001", "김철수", "총무부", "과장", true).await;

        let failure = service.issue_card(&request(CardType::Rfid)).await.unwrap_err();
        assert!(failure.to_string().ends_with("ms)"));
        assert_eq!(failure.http_status(), 422);
    }

    #[tokio::test]
    async fn test_concurrent_issuances_for_one_employee_are_serialized() {
        let service = scripted_service(vec![
            Scripted::Reply(r#"{"result":"100","cardCSN":"AAA"}"#),
            Scripted::Reply(r#"{"result":"100","cardCSN":"BBB"}"#),
        ])
        .await;
        insert_test_employee(&service.db().pool, "EMP001", "김철수", "총무부", "과장", true).await;

        let req_a = request(CardType::Rfid);
        let req_b = request(CardType::Rfid);
        let (a, b) = tokio::join!(service.issue_card(&req_a), service.issue_card(&req_b));

        // Without per-employee serialization both attempts would compute
        // count 1 from the same empty history
        let mut counts = vec![a.unwrap().card_count, b.unwrap().card_count];
        counts.sort();
        assert_eq!(counts, vec![1, 2]);

        let history = card::list_history(&service.db().pool, "EMP001").await.unwrap();
        assert_eq!(history.len(), 2);
        let current = card::current_card(&service.db().pool, "EMP001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(current.card_count, 2);
    }

    #[tokio::test]
    async fn test_persistence_failure_after_device_success_is_distinct() {
        let service =
            scripted_service(vec![Scripted::Reply(r#"{"result":"100","cardCSN":"AAA"}"#)]).await;
        insert_test_employee(&service.db().pool, "EMP001", "김철수", "총무부", "과장", true).await;

        // Break the commit path after the device will have answered
        sqlx::query("DROP TABLE current_card")
            .execute(&service.db().pool)
            .await
            .unwrap();

        let failure = service.issue_card(&request(CardType::Rfid)).await.unwrap_err();
        assert!(matches!(failure.error, IssueError::PersistenceAfterIssue(_)));

        // The device was contacted, but the history row rolled back with
        // the failed transaction
        assert_eq!(service.device().sent_frames().len(), 1);
        assert!(card::list_history(&service.db().pool, "EMP001").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_frame_carries_profile_snapshot() {
        let service =
            scripted_service(vec![Scripted::Reply(r#"{"result":"100","cardCSN":"AAA"}"#)]).await;
        insert_test_employee(&service.db().pool, "EMP001", "김철수", "총무부", "과장", true).await;

        service.issue_card(&request(CardType::Rfid)).await.unwrap();

        let frames = service.device().sent_frames();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].starts_with("0|EMP001|김철수|총무부|과장|1|RFID|"));
    }
}
