use std::sync::Arc;

use bcrypt::hash;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::database::models::{
    next_employee_code, Employee, EmployeeInput, EmployeeUpdateInput, LeaveBalanceView, Role, User,
};
use crate::database::repositories::{
    EmployeeRepository, Repositories, RepositoryError, UserRepository,
};
use crate::error::AppError;
use crate::services::authorization::{Operation, Scope};
use crate::services::ledger::{LeaveLedger, EMPLOYEE_NOT_FOUND};
use crate::services::notifications::{NotificationDispatcher, NotificationEvent};
use crate::services::user_context::Actor;
use crate::services::validation::{
    normalize_email, require_text, validate_contact_number, validate_joining_date,
    validate_password,
};

const CODE_ATTEMPTS: usize = 5;

pub(crate) fn duplicate_employee_email(email: &str) -> AppError {
    AppError::DuplicateKey(format!(
        "An employee with email \"{}\" already exists. Please use a different email address.",
        email
    ))
}

pub(crate) fn duplicate_user_email(email: &str) -> AppError {
    AppError::DuplicateKey(format!(
        "A user account with email \"{}\" already exists. Please use a different email address.",
        email
    ))
}

/// Fields of a new employee record, before a code is assigned.
pub(crate) struct NewEmployee {
    pub employee_name: String,
    pub email: String,
    pub contact_number: String,
    pub joining_date: DateTime<Utc>,
    pub reporting_manager: Option<Uuid>,
}

/// Inserts the employee under the next free `ER` code, retrying when a
/// concurrent insert took the same code.
pub(crate) async fn insert_with_next_code(
    employees: &dyn EmployeeRepository,
    new: NewEmployee,
) -> Result<Employee, AppError> {
    for _ in 0..CODE_ATTEMPTS {
        let last = employees.last_employee_code().await?;
        let employee = Employee::new(
            next_employee_code(last.as_deref()),
            new.employee_name.clone(),
            new.email.clone(),
            new.contact_number.clone(),
            new.joining_date,
            new.reporting_manager,
        );

        match employees.insert(&employee).await {
            Ok(()) => return Ok(employee),
            Err(RepositoryError::Duplicate { field: "employeeId" }) => {
                log::warn!("Employee code {} taken, retrying", employee.employee_code);
            }
            Err(RepositoryError::Duplicate { field: "email" }) => {
                return Err(duplicate_employee_email(&new.email));
            }
            Err(error) => return Err(error.into()),
        }
    }

    Err(AppError::Conflict(
        "Could not allocate an employee ID. Please try again.".to_string(),
    ))
}

#[derive(Clone)]
pub struct EmployeeService {
    employees: Arc<dyn EmployeeRepository>,
    users: Arc<dyn UserRepository>,
    ledger: LeaveLedger,
    notifier: NotificationDispatcher,
    bcrypt_cost: u32,
}

impl EmployeeService {
    pub fn new(
        repositories: &Repositories,
        ledger: LeaveLedger,
        notifier: NotificationDispatcher,
        bcrypt_cost: u32,
    ) -> Self {
        Self {
            employees: Arc::clone(&repositories.employees),
            users: Arc::clone(&repositories.users),
            ledger,
            notifier,
            bcrypt_cost,
        }
    }

    pub async fn list(&self, actor: &Actor) -> Result<Vec<Employee>, AppError> {
        actor.requires(Operation::ListEmployees)?;

        match actor.scope() {
            Scope::All => Ok(self.employees.list().await?),
            Scope::Own(employee_id) => Ok(self
                .employees
                .find_by_id(employee_id)
                .await?
                .into_iter()
                .collect()),
            Scope::Nothing => Ok(Vec::new()),
        }
    }

    pub async fn get(&self, actor: &Actor, employee_id: Uuid) -> Result<Employee, AppError> {
        actor.requires(Operation::ViewEmployee)?;
        actor.scope().require(employee_id)?;

        self.load(employee_id).await
    }

    pub async fn leave_balance(
        &self,
        actor: &Actor,
        employee_id: Uuid,
    ) -> Result<LeaveBalanceView, AppError> {
        actor.requires(Operation::ViewLeaveBalance)?;
        actor.scope().require(employee_id)?;

        self.ledger.statement(employee_id).await
    }

    /// Creates the employee record and the Employee-role account linked to
    /// it, then sends a welcome notification.
    pub async fn create(&self, actor: &Actor, input: EmployeeInput) -> Result<Employee, AppError> {
        actor.requires(Operation::CreateEmployee)?;

        let employee_name = require_text(Some(&input.employee_name), "Employee name is required")?;
        let email = normalize_email(&input.email)?;
        let password = input.password.unwrap_or_default();
        validate_password(&password)?;
        validate_contact_number(input.contact_number.trim())?;
        validate_joining_date(input.joining_date)?;
        if let Some(manager_id) = input.reporting_manager {
            self.require_manager(manager_id).await?;
        }

        if self.employees.find_by_email(&email).await?.is_some() {
            return Err(duplicate_employee_email(&email));
        }
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(duplicate_user_email(&email));
        }

        let password_hash = hash(&password, self.bcrypt_cost)?;

        let employee = insert_with_next_code(
            self.employees.as_ref(),
            NewEmployee {
                employee_name,
                email: email.clone(),
                contact_number: input.contact_number.trim().to_string(),
                joining_date: input.joining_date,
                reporting_manager: input.reporting_manager,
            },
        )
        .await?;

        let user = User::new(email.clone(), password_hash, Role::Employee, Some(employee.id));
        if let Err(error) = self.users.insert(&user).await {
            // Leave no employee behind without its account.
            if let Err(cleanup) = self.employees.delete(employee.id).await {
                log::error!(
                    "Could not remove employee {} after its account failed: {}",
                    employee.employee_code,
                    cleanup
                );
            }
            return Err(match error {
                RepositoryError::Duplicate { field: "email" } => duplicate_user_email(&email),
                other => other.into(),
            });
        }

        log::info!(
            "Employee {} ({}) created by {}",
            employee.employee_code,
            employee.id,
            actor.email
        );

        self.notifier.dispatch(
            NotificationEvent::EmployeeWelcome {
                employee_name: employee.employee_name.clone(),
                employee_code: employee.employee_code.clone(),
                login_email: email.clone(),
            },
            email,
        );

        Ok(employee)
    }

    pub async fn update(
        &self,
        actor: &Actor,
        employee_id: Uuid,
        input: EmployeeUpdateInput,
    ) -> Result<Employee, AppError> {
        actor.requires(Operation::UpdateEmployee)?;

        let mut employee = self.load(employee_id).await?;

        if let Some(name) = input.employee_name.as_deref() {
            employee.employee_name = require_text(Some(name), "Employee name is required")?;
        }
        if let Some(contact_number) = input.contact_number.as_deref() {
            let contact_number = contact_number.trim();
            validate_contact_number(contact_number)?;
            employee.contact_number = contact_number.to_string();
        }
        if let Some(joining_date) = input.joining_date {
            validate_joining_date(joining_date)?;
            employee.joining_date = joining_date;
        }
        if let Some(email) = input.email.as_deref() {
            let email = normalize_email(email)?;
            if let Some(existing) = self.employees.find_by_email(&email).await? {
                if existing.id != employee_id {
                    return Err(duplicate_employee_email(&email));
                }
            }
            employee.email = email;
        }
        match input.reporting_manager.as_deref().map(str::trim) {
            None => {}
            Some("") => employee.reporting_manager = None,
            Some(raw) => {
                let manager_id = Uuid::parse_str(raw)
                    .map_err(|_| AppError::validation("Invalid reporting manager"))?;
                if manager_id == employee_id {
                    return Err(AppError::validation(
                        "An employee cannot report to themselves",
                    ));
                }
                self.require_manager(manager_id).await?;
                employee.reporting_manager = Some(manager_id);
            }
        }

        let updated = match self.employees.update_profile(&employee).await {
            Ok(updated) => updated,
            Err(RepositoryError::Duplicate { field: "email" }) => {
                return Err(duplicate_employee_email(&employee.email));
            }
            Err(error) => return Err(error.into()),
        };
        if !updated {
            return Err(AppError::not_found(EMPLOYEE_NOT_FOUND));
        }

        log::info!("Employee {} updated by {}", employee_id, actor.email);
        self.load(employee_id).await
    }

    /// Deletes the record. Its leave requests keep a snapshot of its name and
    /// are detached in the same storage transaction.
    pub async fn delete(&self, actor: &Actor, employee_id: Uuid) -> Result<(), AppError> {
        actor.requires(Operation::DeleteEmployee)?;

        let _lock = self.ledger.lock(employee_id).await;
        let detached = self
            .employees
            .delete(employee_id)
            .await?
            .ok_or_else(|| AppError::not_found(EMPLOYEE_NOT_FOUND))?;

        log::info!(
            "Employee {} deleted by {}; {} leave request(s) detached",
            employee_id,
            actor.email,
            detached
        );
        Ok(())
    }

    async fn load(&self, employee_id: Uuid) -> Result<Employee, AppError> {
        self.employees
            .find_by_id(employee_id)
            .await?
            .ok_or_else(|| AppError::not_found(EMPLOYEE_NOT_FOUND))
    }

    async fn require_manager(&self, manager_id: Uuid) -> Result<(), AppError> {
        match self.employees.find_by_id(manager_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::validation("Reporting manager not found")),
        }
    }
}
