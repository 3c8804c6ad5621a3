//! Batch worklist
//!
//! Entries are queued by an out-of-core "save for batch" action and
//! consumed (deleted) here when the batch driver commits an issuance.

use super::RepoResult;
use crate::db::models::{BatchWorklistEntry, CardType};
use crate::util::now_millis;
use sqlx::{SqliteConnection, SqlitePool};

/// Pending batch entries for one issuer, oldest first
pub async fn list_pending(
    pool: &SqlitePool,
    issuer_id: &str,
) -> RepoResult<Vec<BatchWorklistEntry>> {
    let rows = sqlx::query_as::<_, BatchWorklistEntry>(
        "SELECT employee_id, issuer_id, requested_type, queued_at \
         FROM batch_worklist WHERE issuer_id = ? ORDER BY queued_at, employee_id",
    )
    .bind(issuer_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Queue one employee for batch issuance (replaces an existing entry)
pub async fn enqueue(
    pool: &SqlitePool,
    employee_id: &str,
    issuer_id: &str,
    requested_type: CardType,
) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO batch_worklist (employee_id, issuer_id, requested_type, queued_at) \
         VALUES (?, ?, ?, ?) \
         ON CONFLICT (employee_id, issuer_id) DO UPDATE SET \
             requested_type = excluded.requested_type, \
             queued_at = excluded.queued_at",
    )
    .bind(employee_id)
    .bind(issuer_id)
    .bind(requested_type)
    .bind(now_millis())
    .execute(pool)
    .await?;
    Ok(())
}

/// Remove a consumed entry; part of the issuance transaction
pub async fn delete_entry(
    conn: &mut SqliteConnection,
    employee_id: &str,
    issuer_id: &str,
) -> RepoResult<()> {
    sqlx::query("DELETE FROM batch_worklist WHERE employee_id = ? AND issuer_id = ?")
        .bind(employee_id)
        .bind(issuer_id)
        .execute(conn)
        .await?;
    Ok(())
}
