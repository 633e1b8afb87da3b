use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::database::models::{Employee, LeaveBalance, LeaveRequest, LeaveType, User};

pub mod employee;
#[cfg(test)]
pub(crate) mod faults;
pub mod leave;
pub mod memory;
pub mod user;

pub use employee::PgEmployeeRepository;
pub use leave::PgLeaveRepository;
pub use memory::InMemoryStore;
pub use user::PgUserRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(sqlx::Error),

    #[error("duplicate value for {field}")]
    Duplicate { field: &'static str },
}

impl From<sqlx::Error> for RepositoryError {
    fn from(error: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_error) = &error {
            if db_error.is_unique_violation() {
                let field = db_error
                    .constraint()
                    .map(field_for_constraint)
                    .unwrap_or("value");
                return RepositoryError::Duplicate { field };
            }
        }
        RepositoryError::Database(error)
    }
}

/// Result of approving a request together with its balance debit.
#[derive(Debug, Clone, PartialEq)]
pub enum Approval {
    Applied {
        request: LeaveRequest,
        balance: LeaveBalance,
    },
    /// The request is gone, decided, or no longer owned by the employee.
    NotPending,
    /// The category no longer covers the request. Nothing was written.
    Insufficient,
}

fn field_for_constraint(constraint: &str) -> &'static str {
    match constraint {
        "employees_email_key" | "users_email_key" => "email",
        "employees_employee_code_key" => "employeeId",
        "users_employee_id_key" => "employeeLink",
        _ => "value",
    }
}

#[async_trait]
pub trait EmployeeRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Employee>, RepositoryError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<Employee>, RepositoryError>;
    async fn find_by_code(&self, code: &str) -> Result<Option<Employee>, RepositoryError>;
    /// Newest first.
    async fn list(&self) -> Result<Vec<Employee>, RepositoryError>;
    async fn last_employee_code(&self) -> Result<Option<String>, RepositoryError>;
    async fn insert(&self, employee: &Employee) -> Result<(), RepositoryError>;
    /// Writes profile fields only; balances are owned by the ledger.
    async fn update_profile(&self, employee: &Employee) -> Result<bool, RepositoryError>;
    /// Removes the employee and, in the same transaction, detaches their leave
    /// requests under a snapshot of the name. Returns how many requests were
    /// detached, or `None` when there is no such employee.
    async fn delete(&self, id: Uuid) -> Result<Option<u64>, RepositoryError>;
}

#[async_trait]
pub trait LeaveRepository: Send + Sync {
    async fn insert(&self, request: &LeaveRequest) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<LeaveRequest>, RepositoryError>;
    /// Newest first, optionally restricted to one employee.
    async fn list(&self, employee_id: Option<Uuid>) -> Result<Vec<LeaveRequest>, RepositoryError>;
    /// Marks a pending request `Approved` and takes its days from
    /// `employee_id` as one unit. Either both writes land or neither does.
    async fn approve_and_debit(
        &self,
        id: Uuid,
        employee_id: Uuid,
        leave_type: LeaveType,
        days: i32,
        approved_by: Option<Uuid>,
    ) -> Result<Approval, RepositoryError>;
    /// Moves a pending request to `Rejected`. `None` when the request is gone
    /// or no longer pending.
    async fn record_rejection(
        &self,
        id: Uuid,
        rejection_reason: Option<String>,
    ) -> Result<Option<LeaveRequest>, RepositoryError>;
    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;
    async fn find_by_employee(&self, employee_id: Uuid) -> Result<Option<User>, RepositoryError>;
    async fn insert(&self, user: &User) -> Result<(), RepositoryError>;
    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<bool, RepositoryError>;
    async fn link_employee(&self, id: Uuid, employee_id: Uuid) -> Result<bool, RepositoryError>;
}

/// The storage collaborators the services are wired with.
#[derive(Clone)]
pub struct Repositories {
    pub employees: Arc<dyn EmployeeRepository>,
    pub leaves: Arc<dyn LeaveRepository>,
    pub users: Arc<dyn UserRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            employees: Arc::new(PgEmployeeRepository::new(pool.clone())),
            leaves: Arc::new(PgLeaveRepository::new(pool.clone())),
            users: Arc::new(PgUserRepository::new(pool)),
        }
    }

    pub fn in_memory() -> Self {
        Self::from_store(Arc::new(InMemoryStore::default()))
    }

    pub fn from_store(store: Arc<InMemoryStore>) -> Self {
        Self {
            employees: store.clone(),
            leaves: store.clone(),
            users: store,
        }
    }
}
