use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Approval, EmployeeRepository, LeaveRepository, RepositoryError, UserRepository};
use crate::database::models::{Employee, EmployeeRef, LeaveRequest, LeaveStatus, LeaveType, User};

/// Rows keyed by id, remembering insertion order for newest-first listings.
struct Table<T> {
    rows: HashMap<Uuid, T>,
    order: Vec<Uuid>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: HashMap::new(),
            order: Vec::new(),
        }
    }
}

impl<T: Clone> Table<T> {
    fn insert(&mut self, id: Uuid, row: T) {
        if self.rows.insert(id, row).is_none() {
            self.order.push(id);
        }
    }

    fn remove(&mut self, id: &Uuid) -> Option<T> {
        let removed = self.rows.remove(id);
        if removed.is_some() {
            self.order.retain(|existing| existing != id);
        }
        removed
    }

    fn newest_first(&self) -> impl Iterator<Item = &T> {
        self.order.iter().rev().filter_map(|id| self.rows.get(id))
    }
}

#[derive(Default)]
struct State {
    employees: Table<Employee>,
    leaves: Table<LeaveRequest>,
    users: Table<User>,
}

/// Process-local storage backing every repository trait. Mirrors the unique
/// and `ON DELETE SET NULL` rules of the Postgres schema.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EmployeeRepository for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Employee>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.employees.rows.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Employee>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .employees
            .rows
            .values()
            .find(|employee| employee.email == email)
            .cloned())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Employee>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .employees
            .rows
            .values()
            .find(|employee| employee.employee_code == code)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Employee>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.employees.newest_first().cloned().collect())
    }

    async fn last_employee_code(&self) -> Result<Option<String>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .employees
            .newest_first()
            .next()
            .map(|employee| employee.employee_code.clone()))
    }

    async fn insert(&self, employee: &Employee) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;

        for existing in state.employees.rows.values() {
            if existing.email == employee.email {
                return Err(RepositoryError::Duplicate { field: "email" });
            }
            if existing.employee_code == employee.employee_code {
                return Err(RepositoryError::Duplicate { field: "employeeId" });
            }
        }

        state.employees.insert(employee.id, employee.clone());
        Ok(())
    }

    async fn update_profile(&self, employee: &Employee) -> Result<bool, RepositoryError> {
        let mut state = self.state.write().await;

        let email_taken = state
            .employees
            .rows
            .values()
            .any(|existing| existing.id != employee.id && existing.email == employee.email);
        if email_taken {
            return Err(RepositoryError::Duplicate { field: "email" });
        }

        let Some(stored) = state.employees.rows.get_mut(&employee.id) else {
            return Ok(false);
        };
        stored.employee_name = employee.employee_name.clone();
        stored.email = employee.email.clone();
        stored.contact_number = employee.contact_number.clone();
        stored.joining_date = employee.joining_date;
        stored.reporting_manager = employee.reporting_manager;
        stored.updated_at = Utc::now();
        Ok(true)
    }

    async fn delete(&self, id: Uuid) -> Result<Option<u64>, RepositoryError> {
        let mut state = self.state.write().await;

        let Some(removed) = state.employees.remove(&id) else {
            return Ok(None);
        };
        let now = Utc::now();
        let mut detached = 0;

        for employee in state.employees.rows.values_mut() {
            if employee.reporting_manager == Some(id) {
                employee.reporting_manager = None;
            }
        }
        for user in state.users.rows.values_mut() {
            if user.employee_id == Some(id) {
                user.employee_id = None;
            }
        }
        for request in state.leaves.rows.values_mut() {
            if request.employee.live_id() == Some(id) {
                request.employee = EmployeeRef::Tombstoned {
                    employee_name: removed.employee_name.clone(),
                };
                request.employee_name = removed.employee_name.clone();
                request.updated_at = now;
                detached += 1;
            }
            if request.approved_by == Some(id) {
                request.approved_by = None;
            }
        }

        Ok(Some(detached))
    }
}

#[async_trait]
impl LeaveRepository for InMemoryStore {
    async fn insert(&self, request: &LeaveRequest) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        state.leaves.insert(request.id, request.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<LeaveRequest>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.leaves.rows.get(&id).cloned())
    }

    async fn list(&self, employee_id: Option<Uuid>) -> Result<Vec<LeaveRequest>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .leaves
            .newest_first()
            .filter(|request| match employee_id {
                Some(employee_id) => request.employee.live_id() == Some(employee_id),
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn approve_and_debit(
        &self,
        id: Uuid,
        employee_id: Uuid,
        leave_type: LeaveType,
        days: i32,
        approved_by: Option<Uuid>,
    ) -> Result<Approval, RepositoryError> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let Some(request) = state.leaves.rows.get_mut(&id) else {
            return Ok(Approval::NotPending);
        };
        if !request.is_pending() || request.employee.live_id() != Some(employee_id) {
            return Ok(Approval::NotPending);
        }
        let Some(employee) = state.employees.rows.get_mut(&employee_id) else {
            return Ok(Approval::Insufficient);
        };
        let Some(balance) = employee.leave_balance.debit(leave_type, days) else {
            return Ok(Approval::Insufficient);
        };

        let now = Utc::now();
        employee.leave_balance = balance;
        employee.updated_at = now;
        request.status = LeaveStatus::Approved;
        request.approved_by = approved_by;
        request.updated_at = now;

        Ok(Approval::Applied {
            request: request.clone(),
            balance,
        })
    }

    async fn record_rejection(
        &self,
        id: Uuid,
        rejection_reason: Option<String>,
    ) -> Result<Option<LeaveRequest>, RepositoryError> {
        let mut state = self.state.write().await;

        let Some(stored) = state.leaves.rows.get_mut(&id) else {
            return Ok(None);
        };
        if !stored.is_pending() {
            return Ok(None);
        }

        stored.status = LeaveStatus::Rejected;
        stored.approved_by = None;
        stored.rejection_reason = rejection_reason;
        stored.updated_at = Utc::now();
        Ok(Some(stored.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let mut state = self.state.write().await;
        Ok(state.leaves.remove(&id).is_some())
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.users.rows.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .users
            .rows
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn find_by_employee(&self, employee_id: Uuid) -> Result<Option<User>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .users
            .rows
            .values()
            .find(|user| user.employee_id == Some(employee_id))
            .cloned())
    }

    async fn insert(&self, user: &User) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;

        for existing in state.users.rows.values() {
            if existing.email == user.email {
                return Err(RepositoryError::Duplicate { field: "email" });
            }
            if user.employee_id.is_some() && existing.employee_id == user.employee_id {
                return Err(RepositoryError::Duplicate {
                    field: "employeeLink",
                });
            }
        }

        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<bool, RepositoryError> {
        let mut state = self.state.write().await;

        let Some(stored) = state.users.rows.get_mut(&id) else {
            return Ok(false);
        };
        stored.password_hash = password_hash.to_string();
        stored.updated_at = Utc::now();
        Ok(true)
    }

    async fn link_employee(&self, id: Uuid, employee_id: Uuid) -> Result<bool, RepositoryError> {
        let mut state = self.state.write().await;

        let linked_elsewhere = state
            .users
            .rows
            .values()
            .any(|user| user.id != id && user.employee_id == Some(employee_id));
        if linked_elsewhere {
            return Err(RepositoryError::Duplicate {
                field: "employeeLink",
            });
        }

        let Some(stored) = state.users.rows.get_mut(&id) else {
            return Ok(false);
        };
        stored.employee_id = Some(employee_id);
        stored.updated_at = Utc::now();
        Ok(true)
    }
}
