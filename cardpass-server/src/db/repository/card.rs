//! Issuance history and current-card state
//!
//! `card_issue_history` is append-only; `current_card` is upserted on
//! every issuance. Both writes take a live transaction.

use super::RepoResult;
use crate::db::models::{CardIssueRecord, CurrentCardState};
use sqlx::{SqliteConnection, SqlitePool};

/// Highest issuance count recorded for an employee, 0 when none
pub async fn max_card_count(conn: &mut SqliteConnection, employee_id: &str) -> RepoResult<i64> {
    let max: i64 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(card_count), 0) FROM card_issue_history WHERE employee_id = ?",
    )
    .bind(employee_id)
    .fetch_one(conn)
    .await?;
    Ok(max)
}

/// Append one history row
pub async fn insert_issue_record(
    conn: &mut SqliteConnection,
    record: &CardIssueRecord,
) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO card_issue_history \
         (employee_id, department, position, card_count, card_serial, card_type, issuer_id, issued_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&record.employee_id)
    .bind(&record.department)
    .bind(&record.position)
    .bind(record.card_count)
    .bind(&record.card_serial)
    .bind(record.card_type)
    .bind(&record.issuer_id)
    .bind(record.issued_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// Overwrite the employee's current-card row
pub async fn upsert_current_card(
    conn: &mut SqliteConnection,
    state: &CurrentCardState,
) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO current_card (employee_id, card_count, status, card_serial, card_type, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?) \
         ON CONFLICT (employee_id) DO UPDATE SET \
             card_count = excluded.card_count, \
             status = excluded.status, \
             card_serial = excluded.card_serial, \
             card_type = excluded.card_type, \
             updated_at = excluded.updated_at",
    )
    .bind(&state.employee_id)
    .bind(state.card_count)
    .bind(&state.status)
    .bind(&state.card_serial)
    .bind(state.card_type)
    .bind(state.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// Issuance history for an employee, newest first
pub async fn list_history(
    pool: &SqlitePool,
    employee_id: &str,
) -> RepoResult<Vec<CardIssueRecord>> {
    let rows = sqlx::query_as::<_, CardIssueRecord>(
        "SELECT employee_id, department, position, card_count, card_serial, card_type, issuer_id, issued_at \
         FROM card_issue_history WHERE employee_id = ? ORDER BY issued_at DESC, card_count DESC",
    )
    .bind(employee_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// The card an employee currently holds, if any
pub async fn current_card(
    pool: &SqlitePool,
    employee_id: &str,
) -> RepoResult<Option<CurrentCardState>> {
    let state = sqlx::query_as::<_, CurrentCardState>(
        "SELECT employee_id, card_count, status, card_serial, card_type, updated_at \
         FROM current_card WHERE employee_id = ?",
    )
    .bind(employee_id)
    .fetch_optional(pool)
    .await?;
    Ok(state)
}
