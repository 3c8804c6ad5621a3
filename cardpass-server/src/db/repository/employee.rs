//! Employee lookup
//!
//! Read-only: employee rows are owned by the external HR sync.

use super::RepoResult;
use crate::db::models::EmployeeCardProfile;
use sqlx::SqlitePool;

/// Find an employee snapshot by id, active employees only
pub async fn find_profile(
    pool: &SqlitePool,
    employee_id: &str,
) -> RepoResult<Option<EmployeeCardProfile>> {
    let profile = sqlx::query_as::<_, EmployeeCardProfile>(
        "SELECT employee_id, name, department, position, photo \
         FROM employee WHERE employee_id = ? AND is_active = 1",
    )
    .bind(employee_id)
    .fetch_optional(pool)
    .await?;
    Ok(profile)
}

#[cfg(test)]
pub(crate) async fn insert_test_employee(
    pool: &SqlitePool,
    employee_id: &str,
    name: &str,
    department: &str,
    position: &str,
    is_active: bool,
) {
    sqlx::query(
        "INSERT INTO employee (employee_id, name, department, position, is_active) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(employee_id)
    .bind(name)
    .bind(department)
    .bind(position)
    .bind(is_active)
    .execute(pool)
    .await
    .unwrap();
}
