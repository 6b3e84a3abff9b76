use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, MySqlConnection, MySqlPool};
use tracing::{debug, error};

use super::{ChangeRequestStore, ListedRequest, RequestFilter, RequestPage, StoreError};
use crate::model::employee::Employee;
use crate::model::profile_change_request::{ChangeRequest, NewChangeRequest, RequestState};
use crate::utils::db_utils::{build_update_sql, execute_update};
use crate::workflow::changes::ChangeSet;

const REQUEST_COLUMNS: &str = r#"
    r.id, r.employee_id, r.manager_id, r.requested_changes, r.comment, r.state,
    r.request_date, r.approved_date, r.approved_by, r.rejected_date, r.rejected_by,
    r.approval_comment, r.rejection_comment
"#;

#[derive(FromRow)]
struct ChangeRequestRow {
    id: u64,
    employee_id: u64,
    manager_id: u64,
    requested_changes: String,
    comment: Option<String>,
    state: String,
    request_date: DateTime<Utc>,
    approved_date: Option<DateTime<Utc>>,
    approved_by: Option<u64>,
    rejected_date: Option<DateTime<Utc>>,
    rejected_by: Option<u64>,
    approval_comment: Option<String>,
    rejection_comment: Option<String>,
}

impl TryFrom<ChangeRequestRow> for ChangeRequest {
    type Error = StoreError;

    fn try_from(row: ChangeRequestRow) -> Result<Self, Self::Error> {
        let state = RequestState::from_str(&row.state)
            .map_err(|_| StoreError::Decode(format!("unknown request state '{}'", row.state)))?;

        Ok(ChangeRequest {
            id: row.id,
            employee_id: row.employee_id,
            manager_id: row.manager_id,
            requested_changes: row.requested_changes,
            comment: row.comment,
            state,
            request_date: row.request_date,
            approved_date: row.approved_date,
            approved_by: row.approved_by,
            rejected_date: row.rejected_date,
            rejected_by: row.rejected_by,
            approval_comment: row.approval_comment,
            rejection_comment: row.rejection_comment,
        })
    }
}

#[derive(FromRow)]
struct ListedRequestRow {
    #[sqlx(flatten)]
    request: ChangeRequestRow,
    employee_name: String,
}

// Helper enum for typed SQLx binding
enum FilterValue {
    U64(u64),
    Str(&'static str),
}

/// Locks the request row for the rest of the transaction and checks that
/// it still exists and is pending.
async fn lock_pending(conn: &mut MySqlConnection, id: u64) -> Result<(), StoreError> {
    let state: Option<String> = sqlx::query_scalar(
        "SELECT state FROM profile_change_requests WHERE id = ? FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    match state.as_deref() {
        None => Err(StoreError::NotFound),
        Some(state) if state != RequestState::Pending.as_ref() => Err(StoreError::Conflict),
        Some(_) => Ok(()),
    }
}

/// MySQL-backed store. Foreign keys on `profile_change_requests` cascade on
/// employee delete (see `migrations/`).
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChangeRequestStore for MySqlStore {
    async fn fetch_employee(&self, id: u64) -> Result<Option<Employee>, StoreError> {
        let employee = sqlx::query_as::<_, Employee>(
            r#"
            SELECT id, employee_code, first_name, last_name, email, phone,
                   department_id, job_title, manager_id, hire_date, status
            FROM employees
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(employee)
    }

    async fn delete_employee(&self, id: u64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM employees WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn fetch_request(&self, id: u64) -> Result<Option<ChangeRequest>, StoreError> {
        let sql = format!(
            "SELECT {} FROM profile_change_requests r WHERE r.id = ?",
            REQUEST_COLUMNS
        );

        let row = sqlx::query_as::<_, ChangeRequestRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(ChangeRequest::try_from).transpose()
    }

    async fn list_requests(&self, filter: &RequestFilter) -> Result<RequestPage, StoreError> {
        let (page, per_page, offset) = filter.pagination();

        // -------------------------
        // WHERE clause
        // -------------------------
        let mut where_sql = String::from(" WHERE 1=1");
        let mut args: Vec<FilterValue> = Vec::new();

        if let Some(employee_id) = filter.employee_id {
            where_sql.push_str(" AND r.employee_id = ?");
            args.push(FilterValue::U64(employee_id));
        }

        if let Some(manager_id) = filter.manager_id {
            where_sql.push_str(" AND r.manager_id = ?");
            args.push(FilterValue::U64(manager_id));
        }

        if let Some(party) = filter.party {
            where_sql.push_str(" AND (r.employee_id = ? OR r.manager_id = ?)");
            args.push(FilterValue::U64(party));
            args.push(FilterValue::U64(party));
        }

        if let Some(state) = filter.state {
            where_sql.push_str(" AND r.state = ?");
            args.push(FilterValue::Str(state.into()));
        }

        // -------------------------
        // COUNT query
        // -------------------------
        let count_sql = format!(
            "SELECT COUNT(*) FROM profile_change_requests r{}",
            where_sql
        );
        debug!(sql = %count_sql, "Counting profile change requests");

        let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
        for arg in &args {
            count_q = match arg {
                FilterValue::U64(v) => count_q.bind(*v),
                FilterValue::Str(s) => count_q.bind(*s),
            };
        }

        let total = count_q.fetch_one(&self.pool).await.map_err(|e| {
            error!(error = %e, "Failed to count profile change requests");
            StoreError::from(e)
        })?;

        // -------------------------
        // DATA query
        // -------------------------
        let data_sql = format!(
            r#"
            SELECT {},
                   TRIM(CONCAT(e.first_name, ' ', e.last_name)) AS employee_name
            FROM profile_change_requests r
            JOIN employees e ON e.id = r.employee_id
            {}
            ORDER BY r.request_date DESC, r.id DESC
            LIMIT ? OFFSET ?
            "#,
            REQUEST_COLUMNS, where_sql
        );

        let mut data_q = sqlx::query_as::<_, ListedRequestRow>(&data_sql);
        for arg in args {
            data_q = match arg {
                FilterValue::U64(v) => data_q.bind(v),
                FilterValue::Str(s) => data_q.bind(s),
            };
        }

        let rows = data_q
            .bind(per_page)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to fetch profile change requests");
                StoreError::from(e)
            })?;

        let items = rows
            .into_iter()
            .map(|row| {
                Ok(ListedRequest {
                    request: ChangeRequest::try_from(row.request)?,
                    employee_name: row.employee_name,
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        Ok(RequestPage {
            items,
            page,
            per_page,
            total,
        })
    }

    async fn insert_request(&self, new: NewChangeRequest) -> Result<ChangeRequest, StoreError> {
        let mut tx = self.pool.begin().await?;

        // the employee row lock serializes submissions from one employee
        let employee: Option<u64> =
            sqlx::query_scalar("SELECT id FROM employees WHERE id = ? FOR UPDATE")
                .bind(new.employee_id)
                .fetch_optional(&mut *tx)
                .await?;
        if employee.is_none() {
            return Err(StoreError::Constraint(format!(
                "employee_id references unknown employee #{}",
                new.employee_id
            )));
        }

        let pending: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM profile_change_requests
            WHERE employee_id = ? AND state = ?
            FOR UPDATE
            "#,
        )
        .bind(new.employee_id)
        .bind(RequestState::Pending.as_ref())
        .fetch_one(&mut *tx)
        .await?;
        if pending > 0 {
            return Err(StoreError::Conflict);
        }

        let result = sqlx::query(
            r#"
            INSERT INTO profile_change_requests
                (employee_id, manager_id, requested_changes, comment, state, request_date)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(new.employee_id)
        .bind(new.manager_id)
        .bind(&new.requested_changes)
        .bind(&new.comment)
        .bind(RequestState::Pending.as_ref())
        .bind(new.request_date)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(new.into_request(result.last_insert_id()))
    }

    async fn update_manager(&self, id: u64, manager_id: u64) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        lock_pending(&mut *tx, id).await?;

        sqlx::query("UPDATE profile_change_requests SET manager_id = ? WHERE id = ?")
            .bind(manager_id)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn commit_approval(
        &self,
        request: &ChangeRequest,
        changes: &ChangeSet,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        // a concurrent decision blocks here and then sees the new state
        lock_pending(&mut *tx, request.id).await?;

        sqlx::query(
            r#"
            UPDATE profile_change_requests
            SET state = ?, approved_date = ?, approved_by = ?
            WHERE id = ?
            "#,
        )
        .bind(request.state.as_ref())
        .bind(request.approved_date)
        .bind(request.approved_by)
        .bind(request.id)
        .execute(&mut *tx)
        .await?;

        if let Some(update) = build_update_sql("employees", changes, "id", request.employee_id) {
            debug!(sql = %update.sql, request_id = request.id, "Applying approved changes");
            // dropping `tx` on error rolls the transition back as well
            execute_update(&mut *tx, update).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn commit_rejection(&self, request: &ChangeRequest) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        lock_pending(&mut *tx, request.id).await?;

        sqlx::query(
            r#"
            UPDATE profile_change_requests
            SET state = ?, rejected_date = ?, rejected_by = ?
            WHERE id = ?
            "#,
        )
        .bind(request.state.as_ref())
        .bind(request.rejected_date)
        .bind(request.rejected_by)
        .bind(request.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}
