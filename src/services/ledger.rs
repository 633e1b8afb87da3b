use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::database::models::{Employee, LeaveBalanceView, LeaveRequest, LeaveType};
use crate::database::repositories::{Approval, EmployeeRepository, LeaveRepository, Repositories};
use crate::error::AppError;

pub const EMPLOYEE_NOT_FOUND: &str = "Employee not found";
pub const ALREADY_DECIDED: &str = "Leave request has already been decided";

/// Exclusive hold on one employee's balance. Dropping it releases the hold.
pub struct EmployeeLock {
    employee_id: Uuid,
    _guard: OwnedMutexGuard<()>,
}

impl EmployeeLock {
    pub fn employee_id(&self) -> Uuid {
        self.employee_id
    }
}

/// Owns per-employee leave balances; the only code path that debits them.
#[derive(Clone)]
pub struct LeaveLedger {
    employees: Arc<dyn EmployeeRepository>,
    leaves: Arc<dyn LeaveRepository>,
    locks: Arc<Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>>,
}

impl LeaveLedger {
    pub fn new(repositories: &Repositories) -> Self {
        Self {
            employees: Arc::clone(&repositories.employees),
            leaves: Arc::clone(&repositories.leaves),
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn lock(&self, employee_id: Uuid) -> EmployeeLock {
        let slot = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            // Nobody holds or awaits these.
            locks.retain(|_, slot| Arc::strong_count(slot) > 1);
            Arc::clone(locks.entry(employee_id).or_default())
        };

        EmployeeLock {
            employee_id,
            _guard: slot.lock_owned().await,
        }
    }

    pub async fn get_available(
        &self,
        employee_id: Uuid,
        leave_type: LeaveType,
    ) -> Result<i32, AppError> {
        let employee = self.load(employee_id).await?;
        Ok(employee.leave_balance.available(leave_type))
    }

    /// Approves `request` and takes its days from the locked employee in one
    /// storage transaction, re-checking the balance first. Fails without
    /// changes when the category is short or the request left `Pending`.
    pub async fn reserve(
        &self,
        lock: &EmployeeLock,
        request: &LeaveRequest,
        approved_by: Option<Uuid>,
    ) -> Result<LeaveRequest, AppError> {
        let employee_id = lock.employee_id();
        if request.employee.live_id() != Some(employee_id) {
            return Err(AppError::not_found(EMPLOYEE_NOT_FOUND));
        }

        let (leave_type, days) = (request.leave_type, request.leave_days);
        if days <= 0 {
            return Err(AppError::validation("Leave days must be at least 1"));
        }
        let available = self.get_available(employee_id, leave_type).await?;
        if available < days {
            return Err(AppError::InsufficientBalance {
                leave_type,
                available,
                requested: days,
            });
        }

        let approval = self
            .leaves
            .approve_and_debit(request.id, employee_id, leave_type, days, approved_by)
            .await?;

        match approval {
            Approval::Applied { request, balance } => {
                log::info!(
                    "Debited {} day(s) of {} from employee {} for {}; {} remaining",
                    days,
                    leave_type,
                    employee_id,
                    request.id,
                    balance.available(leave_type)
                );
                Ok(request)
            }
            // Another writer outside this process got there first.
            Approval::Insufficient => {
                let available = self.get_available(employee_id, leave_type).await?;
                Err(AppError::InsufficientBalance {
                    leave_type,
                    available,
                    requested: days,
                })
            }
            Approval::NotPending => {
                log::error!(
                    "Leave request {} changed state during approval",
                    request.id
                );
                Err(AppError::Conflict(ALREADY_DECIDED.to_string()))
            }
        }
    }

    pub async fn statement(&self, employee_id: Uuid) -> Result<LeaveBalanceView, AppError> {
        let employee = self.load(employee_id).await?;
        Ok(LeaveBalanceView::from(&employee))
    }

    async fn load(&self, employee_id: Uuid) -> Result<Employee, AppError> {
        self.employees
            .find_by_id(employee_id)
            .await?
            .ok_or_else(|| AppError::not_found(EMPLOYEE_NOT_FOUND))
    }
}
