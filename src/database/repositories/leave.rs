use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use super::{employee::debit, Approval, LeaveRepository, RepositoryError};
use crate::database::{
    models::{LeaveRequest, LeaveRow, LeaveStatus, LeaveType},
    utils::sql,
};

const LEAVE_COLUMNS: &str = r#"
    id,
    employee_id,
    employee_name,
    leave_type,
    start_date,
    end_date,
    reason,
    leave_days,
    status,
    approved_by,
    rejection_reason,
    created_at,
    updated_at
"#;

#[derive(Clone)]
pub struct PgLeaveRepository {
    pool: PgPool,
}

impl PgLeaveRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LeaveRepository for PgLeaveRepository {
    async fn insert(&self, request: &LeaveRequest) -> Result<(), RepositoryError> {
        sqlx::query(&sql(r#"
            INSERT INTO
                leave_requests (
                    id,
                    employee_id,
                    employee_name,
                    leave_type,
                    start_date,
                    end_date,
                    reason,
                    leave_days,
                    status,
                    approved_by,
                    rejection_reason,
                    created_at,
                    updated_at
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#))
        .bind(request.id)
        .bind(request.employee.live_id())
        .bind(&request.employee_name)
        .bind(request.leave_type)
        .bind(request.start_date)
        .bind(request.end_date)
        .bind(&request.reason)
        .bind(request.leave_days)
        .bind(request.status)
        .bind(request.approved_by)
        .bind(&request.rejection_reason)
        .bind(request.created_at)
        .bind(request.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<LeaveRequest>, RepositoryError> {
        let query = format!("SELECT {} FROM leave_requests WHERE id = ?", LEAVE_COLUMNS);
        let row = sqlx::query_as::<_, LeaveRow>(&sql(&query))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(LeaveRequest::from))
    }

    async fn list(&self, employee_id: Option<Uuid>) -> Result<Vec<LeaveRequest>, RepositoryError> {
        let rows = match employee_id {
            Some(employee_id) => {
                let query = format!(
                    "SELECT {} FROM leave_requests WHERE employee_id = ? ORDER BY created_at DESC",
                    LEAVE_COLUMNS
                );
                sqlx::query_as::<_, LeaveRow>(&sql(&query))
                    .bind(employee_id)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let query = format!(
                    "SELECT {} FROM leave_requests ORDER BY created_at DESC",
                    LEAVE_COLUMNS
                );
                sqlx::query_as::<_, LeaveRow>(&sql(&query))
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(rows.into_iter().map(LeaveRequest::from).collect())
    }

    async fn approve_and_debit(
        &self,
        id: Uuid,
        employee_id: Uuid,
        leave_type: LeaveType,
        days: i32,
        approved_by: Option<Uuid>,
    ) -> Result<Approval, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Claiming the row first makes a concurrent approval wait here and
        // then find the request no longer pending.
        let query = format!(
            r#"
            UPDATE
                leave_requests
            SET
                status = ?,
                approved_by = ?,
                updated_at = ?
            WHERE
                id = ?
                AND employee_id = ?
                AND status = ?
            RETURNING
                {}
            "#,
            LEAVE_COLUMNS
        );
        let row = sqlx::query_as::<_, LeaveRow>(&sql(&query))
            .bind(LeaveStatus::Approved)
            .bind(approved_by)
            .bind(Utc::now())
            .bind(id)
            .bind(employee_id)
            .bind(LeaveStatus::Pending)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(Approval::NotPending);
        };

        let Some(balance) = debit(&mut *tx, employee_id, leave_type, days).await? else {
            log::warn!(
                "Rolling back approval of {}: {} no longer covers {} day(s)",
                id,
                leave_type,
                days
            );
            tx.rollback().await?;
            return Ok(Approval::Insufficient);
        };

        tx.commit().await?;
        Ok(Approval::Applied {
            request: LeaveRequest::from(row),
            balance,
        })
    }

    async fn record_rejection(
        &self,
        id: Uuid,
        rejection_reason: Option<String>,
    ) -> Result<Option<LeaveRequest>, RepositoryError> {
        let query = format!(
            r#"
            UPDATE
                leave_requests
            SET
                status = ?,
                approved_by = NULL,
                rejection_reason = ?,
                updated_at = ?
            WHERE
                id = ?
                AND status = ?
            RETURNING
                {}
            "#,
            LEAVE_COLUMNS
        );

        let row = sqlx::query_as::<_, LeaveRow>(&sql(&query))
            .bind(LeaveStatus::Rejected)
            .bind(rejection_reason)
            .bind(Utc::now())
            .bind(id)
            .bind(LeaveStatus::Pending)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(LeaveRequest::from))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let result = sqlx::query(&sql("DELETE FROM leave_requests WHERE id = ?"))
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
