//! Leave request lifecycle: `Pending` moves once to `Approved` or
//! `Rejected`; Admins may delete a request in any state. Approval is the only
//! transition that touches the ledger.

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::database::models::{
    leave_days_between, ApproverSummary, Decision, DecisionInput, Employee, EmployeeRef,
    EmployeeSummary, LeaveRequest, LeaveRequestInput, LeaveType, LeaveView,
};
use crate::database::repositories::{EmployeeRepository, LeaveRepository, Repositories};
use crate::error::AppError;
use crate::services::authorization::{Operation, Scope};
use crate::services::ledger::{LeaveLedger, ALREADY_DECIDED, EMPLOYEE_NOT_FOUND};
use crate::services::notifications::{NotificationDispatcher, NotificationEvent};
use crate::services::user_context::Actor;
use crate::services::validation::require_text;

pub const LEAVE_NOT_FOUND: &str = "Leave request not found";
const OWN_LEAVE_ONLY: &str = "Access denied: You can only submit leave requests for yourself";
const OWN_LEAVE_VIEW_ONLY: &str = "Access denied: You can only view your own leave requests";

#[derive(Clone)]
pub struct LeaveService {
    leaves: Arc<dyn LeaveRepository>,
    employees: Arc<dyn EmployeeRepository>,
    ledger: LeaveLedger,
    notifier: NotificationDispatcher,
}

impl LeaveService {
    pub fn new(
        repositories: &Repositories,
        ledger: LeaveLedger,
        notifier: NotificationDispatcher,
    ) -> Self {
        Self {
            leaves: Arc::clone(&repositories.leaves),
            employees: Arc::clone(&repositories.employees),
            ledger,
            notifier,
        }
    }

    pub async fn submit(
        &self,
        actor: &Actor,
        input: LeaveRequestInput,
    ) -> Result<LeaveView, AppError> {
        actor.requires(Operation::SubmitLeave)?;
        if actor.is_employee() && !actor.scope().permits(input.employee) {
            return Err(AppError::forbidden(OWN_LEAVE_ONLY));
        }

        let leave_days = leave_days_between(input.start_date, input.end_date)
            .ok_or_else(|| AppError::validation("Start date must be before end date"))?;
        let leave_days = i32::try_from(leave_days)
            .map_err(|_| AppError::validation("Leave period is too long"))?;

        let leave_type = require_text(input.leave_type.as_deref(), "Leave type is required")?
            .parse::<LeaveType>()
            .map_err(|_| AppError::validation("Invalid leave type"))?;
        let reason = require_text(input.reason.as_deref(), "Reason is required")?;

        let employee = self.load_employee(input.employee).await?;
        let available = self.ledger.get_available(employee.id, leave_type).await?;
        if available < leave_days {
            return Err(AppError::InsufficientBalance {
                leave_type,
                available,
                requested: leave_days,
            });
        }

        let request = LeaveRequest::pending(
            &employee,
            leave_type,
            input.start_date,
            input.end_date,
            reason,
            leave_days,
        );
        self.leaves.insert(&request).await?;

        log::info!(
            "Leave request {} submitted for {} ({} day(s) of {})",
            request.id,
            employee.employee_code,
            leave_days,
            leave_type
        );

        self.notify_submitted(&employee, &request).await;

        let mut cache = HashMap::from([(employee.id, Some(employee))]);
        self.view(request, &mut cache).await
    }

    /// Records `Approved` or `Rejected` on a pending request. Approval goes
    /// through the ledger while the employee's balance is held, so concurrent
    /// approvals for one employee each see the previous one's result, and the
    /// debit and the status change are stored together.
    pub async fn decide(
        &self,
        actor: &Actor,
        request_id: Uuid,
        input: DecisionInput,
    ) -> Result<LeaveView, AppError> {
        actor.requires(Operation::DecideLeave)?;

        let decision = require_text(input.status.as_deref(), "Status is required")?
            .parse::<Decision>()
            .map_err(|_| AppError::validation("Invalid status. Use Approved or Rejected"))?;
        let rejection_reason = match decision {
            Decision::Reject => input
                .rejection_reason
                .as_deref()
                .map(str::trim)
                .filter(|reason| !reason.is_empty())
                .map(str::to_string),
            Decision::Approve => None,
        };
        let request = self.load_request(request_id).await?;
        ensure_pending(&request)?;

        let lock = match &request.employee {
            EmployeeRef::Live { id } => Some(self.ledger.lock(*id).await),
            EmployeeRef::Tombstoned { .. } => None,
        };

        // State may have moved while waiting for the lock.
        let request = self.load_request(request_id).await?;
        ensure_pending(&request)?;

        let decided = match (decision, &lock) {
            (Decision::Approve, Some(lock)) => {
                self.ledger.reserve(lock, &request, actor.employee_id).await?
            }
            (Decision::Approve, None) => return Err(AppError::not_found(EMPLOYEE_NOT_FOUND)),
            (Decision::Reject, _) => self
                .leaves
                .record_rejection(request_id, rejection_reason.clone())
                .await?
                .ok_or_else(|| {
                    log::error!(
                        "Leave request {} changed state during decision by {}",
                        request_id,
                        actor.email
                    );
                    AppError::Conflict(ALREADY_DECIDED.to_string())
                })?,
        };

        log::info!(
            "Leave request {} {} by {}",
            decided.id,
            decided.status,
            actor.email
        );

        let mut cache = HashMap::new();
        if let Some(employee_id) = decided.employee.live_id() {
            if let Some(employee) = self.cached_employee(employee_id, &mut cache).await? {
                self.notifier.dispatch(
                    NotificationEvent::LeaveDecided {
                        leave_type: decided.leave_type,
                        start_date: decided.start_date,
                        end_date: decided.end_date,
                        leave_days: decided.leave_days,
                        status: decided.status,
                        rejection_reason,
                    },
                    employee.email,
                );
            }
        }

        self.view(decided, &mut cache).await
    }

    pub async fn delete(&self, actor: &Actor, request_id: Uuid) -> Result<(), AppError> {
        actor.requires(Operation::DeleteLeave)?;

        if !self.leaves.delete(request_id).await? {
            return Err(AppError::not_found(LEAVE_NOT_FOUND));
        }

        log::info!("Leave request {} deleted by {}", request_id, actor.email);
        Ok(())
    }

    /// Newest first. Employees only see requests filed for their own record.
    pub async fn list(&self, actor: &Actor) -> Result<Vec<LeaveView>, AppError> {
        actor.requires(Operation::ListLeaves)?;

        let requests = match actor.scope() {
            Scope::All => self.leaves.list(None).await?,
            Scope::Own(employee_id) => self.leaves.list(Some(employee_id)).await?,
            Scope::Nothing => return Ok(Vec::new()),
        };

        let mut cache = HashMap::new();
        let mut views = Vec::with_capacity(requests.len());
        for request in requests {
            views.push(self.view(request, &mut cache).await?);
        }
        Ok(views)
    }

    pub async fn get(&self, actor: &Actor, request_id: Uuid) -> Result<LeaveView, AppError> {
        actor.requires(Operation::ListLeaves)?;

        let request = self.load_request(request_id).await?;
        let visible = match request.employee.live_id() {
            Some(employee_id) => actor.scope().permits(employee_id),
            None => actor.scope() == Scope::All,
        };
        if !visible {
            return Err(AppError::forbidden(OWN_LEAVE_VIEW_ONLY));
        }

        self.view(request, &mut HashMap::new()).await
    }

    async fn notify_submitted(&self, employee: &Employee, request: &LeaveRequest) {
        let manager = match employee.reporting_manager {
            Some(manager_id) => match self.employees.find_by_id(manager_id).await {
                Ok(manager) => manager,
                Err(error) => {
                    log::warn!("Could not load reporting manager {}: {}", manager_id, error);
                    None
                }
            },
            None => None,
        };

        match manager {
            Some(manager) => {
                self.notifier.dispatch(
                    NotificationEvent::LeaveSubmitted {
                        employee_name: employee.employee_name.clone(),
                        leave_type: request.leave_type,
                        start_date: request.start_date,
                        end_date: request.end_date,
                        leave_days: request.leave_days,
                        reason: request.reason.clone(),
                    },
                    manager.email,
                );
            }
            None => {
                log::warn!(
                    "No reporting manager for {}; confirming to the employee instead",
                    employee.employee_code
                );
                self.notifier.dispatch(
                    NotificationEvent::LeaveSubmittedConfirmation {
                        leave_type: request.leave_type,
                        start_date: request.start_date,
                        end_date: request.end_date,
                        leave_days: request.leave_days,
                    },
                    employee.email.clone(),
                );
            }
        }
    }

    async fn view(
        &self,
        request: LeaveRequest,
        cache: &mut HashMap<Uuid, Option<Employee>>,
    ) -> Result<LeaveView, AppError> {
        let employee = match &request.employee {
            EmployeeRef::Live { id } => match self.cached_employee(*id, cache).await? {
                Some(employee) => EmployeeSummary {
                    id: Some(employee.id),
                    employee_name: employee.employee_name,
                    email: Some(employee.email),
                    deleted: false,
                },
                None => EmployeeSummary {
                    id: Some(*id),
                    employee_name: request.employee_name.clone(),
                    email: None,
                    deleted: true,
                },
            },
            EmployeeRef::Tombstoned { employee_name } => EmployeeSummary {
                id: None,
                employee_name: employee_name.clone(),
                email: None,
                deleted: true,
            },
        };

        let approved_by = match request.approved_by {
            Some(approver_id) => Some(ApproverSummary {
                id: approver_id,
                employee_name: self
                    .cached_employee(approver_id, cache)
                    .await?
                    .map(|approver| approver.employee_name),
            }),
            None => None,
        };

        Ok(LeaveView {
            id: request.id,
            employee,
            employee_name: request.employee_name,
            leave_type: request.leave_type,
            start_date: request.start_date,
            end_date: request.end_date,
            reason: request.reason,
            leave_days: request.leave_days,
            status: request.status,
            approved_by,
            rejection_reason: request.rejection_reason,
            created_at: request.created_at,
            updated_at: request.updated_at,
        })
    }

    async fn cached_employee(
        &self,
        employee_id: Uuid,
        cache: &mut HashMap<Uuid, Option<Employee>>,
    ) -> Result<Option<Employee>, AppError> {
        if let Some(cached) = cache.get(&employee_id) {
            return Ok(cached.clone());
        }
        let employee = self.employees.find_by_id(employee_id).await?;
        cache.insert(employee_id, employee.clone());
        Ok(employee)
    }

    async fn load_employee(&self, employee_id: Uuid) -> Result<Employee, AppError> {
        self.employees
            .find_by_id(employee_id)
            .await?
            .ok_or_else(|| AppError::not_found(EMPLOYEE_NOT_FOUND))
    }

    async fn load_request(&self, request_id: Uuid) -> Result<LeaveRequest, AppError> {
        self.leaves
            .find_by_id(request_id)
            .await?
            .ok_or_else(|| AppError::not_found(LEAVE_NOT_FOUND))
    }
}

fn ensure_pending(request: &LeaveRequest) -> Result<(), AppError> {
    if request.is_pending() {
        Ok(())
    } else {
        Err(AppError::Conflict(format!(
            "Leave request has already been {}",
            request.status.as_str().to_lowercase()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{LeaveStatus, Role};
    use crate::database::repositories::faults::{Fault, FaultyStore};
    use crate::database::repositories::InMemoryStore;
    use crate::services::notifications::LogSink;
    use chrono::{DateTime, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    struct Fixture {
        service: LeaveService,
        ledger: LeaveLedger,
        repositories: Repositories,
    }

    fn fixture() -> Fixture {
        fixture_over(Repositories::in_memory())
    }

    fn fixture_over(repositories: Repositories) -> Fixture {
        let ledger = LeaveLedger::new(&repositories);
        let notifier = NotificationDispatcher::new(Arc::new(LogSink::new("test")));
        Fixture {
            service: LeaveService::new(&repositories, ledger.clone(), notifier),
            ledger,
            repositories,
        }
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
    }

    fn actor(role: Role, employee_id: Option<Uuid>) -> Actor {
        Actor {
            user_id: Uuid::new_v4(),
            email: "actor@ems.com".to_string(),
            role,
            employee_id,
        }
    }

    async fn employee(fixture: &Fixture, name: &str) -> Employee {
        let employee = Employee::new(
            format!("ER-{}", name),
            name.to_string(),
            format!("{}@example.com", name.to_lowercase()),
            "9876543210".to_string(),
            day(1),
            None,
        );
        fixture.repositories.employees.insert(&employee).await.unwrap();
        employee
    }

    fn request(employee_id: Uuid, leave_type: &str, start: u32, end: u32) -> LeaveRequestInput {
        LeaveRequestInput {
            employee: employee_id,
            leave_type: Some(leave_type.to_string()),
            start_date: day(start),
            end_date: day(end),
            reason: Some("personal".to_string()),
        }
    }

    fn approve() -> DecisionInput {
        DecisionInput {
            status: Some("Approved".to_string()),
            rejection_reason: None,
        }
    }

    #[tokio::test]
    async fn submit_computes_days_and_stays_pending() {
        let fixture = fixture();
        let asha = employee(&fixture, "Asha").await;

        let view = fixture
            .service
            .submit(&actor(Role::Admin, None), request(asha.id, "Casual Leave", 1, 4))
            .await
            .unwrap();

        assert_eq!(view.leave_days, 3);
        assert_eq!(view.status, LeaveStatus::Pending);
        assert_eq!(view.employee_name, "Asha");
    }

    #[tokio::test]
    async fn submit_validates_in_order() {
        let fixture = fixture();
        let asha = employee(&fixture, "Asha").await;
        let admin = actor(Role::Admin, None);

        let error = fixture
            .service
            .submit(&admin, request(asha.id, "Vacation", 4, 4))
            .await
            .unwrap_err();
        assert_eq!(error.to_string(), "Start date must be before end date");

        let error = fixture
            .service
            .submit(&admin, request(asha.id, "Vacation", 1, 2))
            .await
            .unwrap_err();
        assert_eq!(error.to_string(), "Invalid leave type");

        let error = fixture
            .service
            .submit(&admin, request(Uuid::new_v4(), "Sick Leave", 1, 2))
            .await
            .unwrap_err();
        assert!(matches!(error, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn employee_cannot_submit_for_someone_else() {
        let fixture = fixture();
        let asha = employee(&fixture, "Asha").await;
        let ravi = employee(&fixture, "Ravi").await;

        let error = fixture
            .service
            .submit(
                &actor(Role::Employee, Some(ravi.id)),
                request(asha.id, "Sick Leave", 1, 2),
            )
            .await
            .unwrap_err();
        assert!(matches!(error, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn approving_twice_is_a_conflict_and_debits_once() {
        let fixture = fixture();
        let asha = employee(&fixture, "Asha").await;
        let manager = actor(Role::Manager, None);
        let submitted = fixture
            .service
            .submit(&manager, request(asha.id, "Sick Leave", 1, 3))
            .await
            .unwrap();

        fixture
            .service
            .decide(&manager, submitted.id, approve())
            .await
            .unwrap();
        let error = fixture
            .service
            .decide(&manager, submitted.id, approve())
            .await
            .unwrap_err();
        assert!(matches!(error, AppError::Conflict(_)));

        let statement = fixture.ledger.statement(asha.id).await.unwrap();
        assert_eq!(statement.leave_balance.sick_leave, 6);
        assert_eq!(statement.leave_balance.total, 28);
    }

    #[tokio::test]
    async fn failed_approval_write_leaves_no_debit_behind() {
        let store = FaultyStore::new(Arc::new(InMemoryStore::new()));
        let fixture = fixture_over(store.repositories());
        let asha = employee(&fixture, "Asha").await;
        let manager = actor(Role::Manager, None);
        let submitted = fixture
            .service
            .submit(&manager, request(asha.id, "Sick Leave", 1, 3))
            .await
            .unwrap();

        store.fail_next(Fault::ApproveAndDebit);
        let error = fixture
            .service
            .decide(&manager, submitted.id, approve())
            .await
            .unwrap_err();
        assert!(matches!(error, AppError::Database(_)));

        let statement = fixture.ledger.statement(asha.id).await.unwrap();
        assert_eq!(statement.leave_balance.sick_leave, 8);
        assert_eq!(statement.leave_balance.total, 30);
        let pending = fixture.service.get(&manager, submitted.id).await.unwrap();
        assert_eq!(pending.status, LeaveStatus::Pending);

        // A retry settles the request with a single debit.
        let approved = fixture
            .service
            .decide(&manager, submitted.id, approve())
            .await
            .unwrap();
        assert_eq!(approved.status, LeaveStatus::Approved);
        let statement = fixture.ledger.statement(asha.id).await.unwrap();
        assert_eq!(statement.leave_balance.sick_leave, 6);
        assert_eq!(statement.leave_balance.total, 28);
    }

    #[tokio::test]
    async fn late_insufficiency_blocks_approval() {
        let fixture = fixture();
        let asha = employee(&fixture, "Asha").await;
        let manager = actor(Role::Manager, None);

        let first = fixture
            .service
            .submit(&manager, request(asha.id, "Casual Leave", 1, 6))
            .await
            .unwrap();
        let second = fixture
            .service
            .submit(&manager, request(asha.id, "Casual Leave", 10, 15))
            .await
            .unwrap();

        fixture.service.decide(&manager, first.id, approve()).await.unwrap();
        let error = fixture
            .service
            .decide(&manager, second.id, approve())
            .await
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "Insufficient Casual Leave balance. Available: 3 days, Requested: 5 days"
        );

        let still_pending = fixture
            .service
            .get(&manager, second.id)
            .await
            .unwrap();
        assert_eq!(still_pending.status, LeaveStatus::Pending);
    }

    #[tokio::test]
    async fn rejection_keeps_balance_and_reason() {
        let fixture = fixture();
        let asha = employee(&fixture, "Asha").await;
        let manager = actor(Role::Manager, None);
        let submitted = fixture
            .service
            .submit(&manager, request(asha.id, "Earned Leave", 1, 3))
            .await
            .unwrap();

        let decided = fixture
            .service
            .decide(
                &manager,
                submitted.id,
                DecisionInput {
                    status: Some("Rejected".to_string()),
                    rejection_reason: Some("Quarter end".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(decided.status, LeaveStatus::Rejected);
        assert_eq!(decided.rejection_reason.as_deref(), Some("Quarter end"));
        let statement = fixture.ledger.statement(asha.id).await.unwrap();
        assert_eq!(statement.leave_balance.earned_leave, 14);
    }

    #[tokio::test]
    async fn tombstoned_requests_cannot_be_approved() {
        let fixture = fixture();
        let asha = employee(&fixture, "Asha").await;
        let admin = actor(Role::Admin, None);
        let submitted = fixture
            .service
            .submit(&admin, request(asha.id, "Sick Leave", 1, 2))
            .await
            .unwrap();

        fixture.repositories.employees.delete(asha.id).await.unwrap();

        let error = fixture
            .service
            .decide(&admin, submitted.id, approve())
            .await
            .unwrap_err();
        assert_eq!(error.to_string(), "Employee not found");

        let listed = fixture.service.list(&admin).await.unwrap();
        assert_eq!(listed[0].employee.employee_name, "Asha");
        assert!(listed[0].employee.deleted);
    }

    #[tokio::test]
    async fn unlinked_employee_lists_nothing() {
        let fixture = fixture();
        let asha = employee(&fixture, "Asha").await;
        fixture
            .service
            .submit(&actor(Role::Admin, None), request(asha.id, "Sick Leave", 1, 2))
            .await
            .unwrap();

        let listed = fixture
            .service
            .list(&actor(Role::Employee, None))
            .await
            .unwrap();
        assert!(listed.is_empty());
    }
}
