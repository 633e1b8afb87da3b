//! In-memory repositories that fail chosen calls with a storage error.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use super::{
    Approval, EmployeeRepository, InMemoryStore, LeaveRepository, Repositories, RepositoryError,
    UserRepository,
};
use crate::database::models::{Employee, LeaveRequest, LeaveType, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    ApproveAndDebit,
    DeleteEmployee,
    /// Behaves like a concurrent signup that took the email first.
    InsertUser,
}

impl Fault {
    fn error(self) -> RepositoryError {
        match self {
            Fault::InsertUser => RepositoryError::Duplicate { field: "email" },
            Fault::ApproveAndDebit | Fault::DeleteEmployee => {
                RepositoryError::Database(sqlx::Error::PoolTimedOut)
            }
        }
    }
}

pub struct FaultyStore {
    inner: Arc<InMemoryStore>,
    armed: Mutex<HashSet<Fault>>,
}

impl FaultyStore {
    pub fn new(inner: Arc<InMemoryStore>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            armed: Mutex::new(HashSet::new()),
        })
    }

    /// The next call matching `fault` fails; later calls go through.
    pub fn fail_next(&self, fault: Fault) {
        self.armed.lock().unwrap().insert(fault);
    }

    pub fn repositories(self: &Arc<Self>) -> Repositories {
        Repositories {
            employees: self.clone(),
            leaves: self.clone(),
            users: self.clone(),
        }
    }

    fn trip(&self, fault: Fault) -> Result<(), RepositoryError> {
        if self.armed.lock().unwrap().remove(&fault) {
            return Err(fault.error());
        }
        Ok(())
    }
}

#[async_trait]
impl EmployeeRepository for FaultyStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Employee>, RepositoryError> {
        EmployeeRepository::find_by_id(self.inner.as_ref(), id).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Employee>, RepositoryError> {
        EmployeeRepository::find_by_email(self.inner.as_ref(), email).await
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Employee>, RepositoryError> {
        self.inner.find_by_code(code).await
    }

    async fn list(&self) -> Result<Vec<Employee>, RepositoryError> {
        EmployeeRepository::list(self.inner.as_ref()).await
    }

    async fn last_employee_code(&self) -> Result<Option<String>, RepositoryError> {
        self.inner.last_employee_code().await
    }

    async fn insert(&self, employee: &Employee) -> Result<(), RepositoryError> {
        EmployeeRepository::insert(self.inner.as_ref(), employee).await
    }

    async fn update_profile(&self, employee: &Employee) -> Result<bool, RepositoryError> {
        self.inner.update_profile(employee).await
    }

    async fn delete(&self, id: Uuid) -> Result<Option<u64>, RepositoryError> {
        self.trip(Fault::DeleteEmployee)?;
        EmployeeRepository::delete(self.inner.as_ref(), id).await
    }
}

#[async_trait]
impl LeaveRepository for FaultyStore {
    async fn insert(&self, request: &LeaveRequest) -> Result<(), RepositoryError> {
        LeaveRepository::insert(self.inner.as_ref(), request).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<LeaveRequest>, RepositoryError> {
        LeaveRepository::find_by_id(self.inner.as_ref(), id).await
    }

    async fn list(&self, employee_id: Option<Uuid>) -> Result<Vec<LeaveRequest>, RepositoryError> {
        LeaveRepository::list(self.inner.as_ref(), employee_id).await
    }

    async fn approve_and_debit(
        &self,
        id: Uuid,
        employee_id: Uuid,
        leave_type: LeaveType,
        days: i32,
        approved_by: Option<Uuid>,
    ) -> Result<Approval, RepositoryError> {
        self.trip(Fault::ApproveAndDebit)?;
        self.inner
            .approve_and_debit(id, employee_id, leave_type, days, approved_by)
            .await
    }

    async fn record_rejection(
        &self,
        id: Uuid,
        rejection_reason: Option<String>,
    ) -> Result<Option<LeaveRequest>, RepositoryError> {
        self.inner.record_rejection(id, rejection_reason).await
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        LeaveRepository::delete(self.inner.as_ref(), id).await
    }
}

#[async_trait]
impl UserRepository for FaultyStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        UserRepository::find_by_id(self.inner.as_ref(), id).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        UserRepository::find_by_email(self.inner.as_ref(), email).await
    }

    async fn find_by_employee(&self, employee_id: Uuid) -> Result<Option<User>, RepositoryError> {
        self.inner.find_by_employee(employee_id).await
    }

    async fn insert(&self, user: &User) -> Result<(), RepositoryError> {
        self.trip(Fault::InsertUser)?;
        UserRepository::insert(self.inner.as_ref(), user).await
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<bool, RepositoryError> {
        self.inner.update_password(id, password_hash).await
    }

    async fn link_employee(&self, id: Uuid, employee_id: Uuid) -> Result<bool, RepositoryError> {
        self.inner.link_employee(id, employee_id).await
    }
}
