use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use super::{EmployeeRepository, RepositoryError};
use crate::database::{
    models::{Employee, EmployeeRow, LeaveBalance, LeaveType},
    utils::sql,
};

const EMPLOYEE_COLUMNS: &str = r#"
    id,
    employee_code,
    employee_name,
    email,
    contact_number,
    joining_date,
    reporting_manager,
    casual_leave,
    sick_leave,
    earned_leave,
    total_leave,
    leave_allocation_year,
    created_at,
    updated_at
"#;

fn balance_column(leave_type: LeaveType) -> &'static str {
    match leave_type {
        LeaveType::Casual => "casual_leave",
        LeaveType::Sick => "sick_leave",
        LeaveType::Earned => "earned_leave",
    }
}

/// Takes `days` from `leave_type` and from the total in one statement, only
/// if the category still covers it. Runs inside the approval transaction.
pub(super) async fn debit<'e, E>(
    executor: E,
    id: Uuid,
    leave_type: LeaveType,
    days: i32,
) -> Result<Option<LeaveBalance>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let column = balance_column(leave_type);
    let query = format!(
        r#"
        UPDATE
            employees
        SET
            {column} = {column} - ?,
            total_leave = total_leave - ?,
            updated_at = ?
        WHERE
            id = ?
            AND {column} >= ?
        RETURNING
            casual_leave,
            sick_leave,
            earned_leave,
            total_leave AS total
        "#
    );

    sqlx::query_as::<_, LeaveBalance>(&sql(&query))
        .bind(days)
        .bind(days)
        .bind(Utc::now())
        .bind(id)
        .bind(days)
        .fetch_optional(executor)
        .await
}

#[derive(Clone)]
pub struct PgEmployeeRepository {
    pool: PgPool,
}

impl PgEmployeeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_one(&self, column: &str, value: &str) -> Result<Option<Employee>, RepositoryError> {
        let query = format!(
            "SELECT {} FROM employees WHERE {} = ?",
            EMPLOYEE_COLUMNS, column
        );
        let row = sqlx::query_as::<_, EmployeeRow>(&sql(&query))
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Employee::from))
    }
}

#[async_trait]
impl EmployeeRepository for PgEmployeeRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Employee>, RepositoryError> {
        let query = format!("SELECT {} FROM employees WHERE id = ?", EMPLOYEE_COLUMNS);
        let row = sqlx::query_as::<_, EmployeeRow>(&sql(&query))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Employee::from))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Employee>, RepositoryError> {
        self.find_one("email", email).await
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Employee>, RepositoryError> {
        self.find_one("employee_code", code).await
    }

    async fn list(&self) -> Result<Vec<Employee>, RepositoryError> {
        let query = format!(
            "SELECT {} FROM employees ORDER BY created_at DESC",
            EMPLOYEE_COLUMNS
        );
        let rows = sqlx::query_as::<_, EmployeeRow>(&sql(&query))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Employee::from).collect())
    }

    async fn last_employee_code(&self) -> Result<Option<String>, RepositoryError> {
        let code = sqlx::query_scalar::<_, String>(&sql(r#"
            SELECT
                employee_code
            FROM
                employees
            ORDER BY
                created_at DESC
            LIMIT
                1
        "#))
        .fetch_optional(&self.pool)
        .await?;

        Ok(code)
    }

    async fn insert(&self, employee: &Employee) -> Result<(), RepositoryError> {
        let balance = employee.leave_balance;

        sqlx::query(&sql(r#"
            INSERT INTO
                employees (
                    id,
                    employee_code,
                    employee_name,
                    email,
                    contact_number,
                    joining_date,
                    reporting_manager,
                    casual_leave,
                    sick_leave,
                    earned_leave,
                    total_leave,
                    leave_allocation_year,
                    created_at,
                    updated_at
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#))
        .bind(employee.id)
        .bind(&employee.employee_code)
        .bind(&employee.employee_name)
        .bind(&employee.email)
        .bind(&employee.contact_number)
        .bind(employee.joining_date)
        .bind(employee.reporting_manager)
        .bind(balance.casual_leave)
        .bind(balance.sick_leave)
        .bind(balance.earned_leave)
        .bind(balance.total)
        .bind(employee.leave_allocation_year)
        .bind(employee.created_at)
        .bind(employee.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_profile(&self, employee: &Employee) -> Result<bool, RepositoryError> {
        let result = sqlx::query(&sql(r#"
            UPDATE
                employees
            SET
                employee_name = ?,
                email = ?,
                contact_number = ?,
                joining_date = ?,
                reporting_manager = ?,
                updated_at = ?
            WHERE
                id = ?
        "#))
        .bind(&employee.employee_name)
        .bind(&employee.email)
        .bind(&employee.contact_number)
        .bind(employee.joining_date)
        .bind(employee.reporting_manager)
        .bind(Utc::now())
        .bind(employee.id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> Result<Option<u64>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // The name snapshot is taken from the row being deleted.
        let detached = sqlx::query(&sql(r#"
            UPDATE
                leave_requests
            SET
                employee_id = NULL,
                employee_name = employees.employee_name,
                updated_at = ?
            FROM
                employees
            WHERE
                employees.id = leave_requests.employee_id
                AND leave_requests.employee_id = ?
        "#))
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let deleted = sqlx::query(&sql("DELETE FROM employees WHERE id = ?"))
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        tx.commit().await?;
        Ok(Some(detached))
    }
}
