use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use super::{RepositoryError, UserRepository};
use crate::database::{models::User, utils::sql};

const USER_COLUMNS: &str = "id, email, password_hash, role, employee_id, created_at, updated_at";

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        let query = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql(&query))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let query = format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql(&query))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn find_by_employee(&self, employee_id: Uuid) -> Result<Option<User>, RepositoryError> {
        let query = format!("SELECT {} FROM users WHERE employee_id = ?", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql(&query))
            .bind(employee_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn insert(&self, user: &User) -> Result<(), RepositoryError> {
        sqlx::query(&sql(r#"
            INSERT INTO
                users (
                    id,
                    email,
                    password_hash,
                    role,
                    employee_id,
                    created_at,
                    updated_at
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?)
        "#))
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(user.employee_id)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query(&sql(r#"
            UPDATE
                users
            SET
                password_hash = ?,
                updated_at = ?
            WHERE
                id = ?
        "#))
        .bind(password_hash)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn link_employee(&self, id: Uuid, employee_id: Uuid) -> Result<bool, RepositoryError> {
        let result = sqlx::query(&sql(r#"
            UPDATE
                users
            SET
                employee_id = ?,
                updated_at = ?
            WHERE
                id = ?
        "#))
        .bind(employee_id)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
