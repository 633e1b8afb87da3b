//! Role-based capability checks consulted before every operation.

use uuid::Uuid;

use crate::database::models::Role;
use crate::error::AppError;

pub const GENERIC_DENIAL: &str = "Access denied: This action requires Administrator privileges. Please contact an Administrator for assistance.";
pub const MANAGER_DELETE_EMPLOYEE_DENIAL: &str = "Access denied: Only Administrators can delete employees. Managers can create and edit employees but cannot delete them.";
pub const OWN_PROFILE_ONLY: &str = "Access denied: You can only view your own profile";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListEmployees,
    ViewEmployee,
    ViewLeaveBalance,
    CreateEmployee,
    UpdateEmployee,
    DeleteEmployee,
    SubmitLeave,
    ListLeaves,
    DecideLeave,
    DeleteLeave,
    LinkEmployee,
}

const EVERYONE: &[Role] = &[Role::Admin, Role::Manager, Role::Employee];
const MANAGEMENT: &[Role] = &[Role::Admin, Role::Manager];
const ADMIN_ONLY: &[Role] = &[Role::Admin];
const EMPLOYEE_ONLY: &[Role] = &[Role::Employee];

impl Operation {
    pub fn required_roles(self) -> &'static [Role] {
        match self {
            Operation::ListEmployees
            | Operation::ViewEmployee
            | Operation::ViewLeaveBalance
            | Operation::SubmitLeave
            | Operation::ListLeaves => EVERYONE,
            Operation::CreateEmployee | Operation::UpdateEmployee | Operation::DecideLeave => {
                MANAGEMENT
            }
            Operation::DeleteEmployee | Operation::DeleteLeave => ADMIN_ONLY,
            Operation::LinkEmployee => EMPLOYEE_ONLY,
        }
    }

    /// Read paths where an Employee only sees records linked to them.
    pub fn is_self_scoped(self) -> bool {
        matches!(
            self,
            Operation::ListEmployees
                | Operation::ViewEmployee
                | Operation::ViewLeaveBalance
                | Operation::ListLeaves
                | Operation::SubmitLeave
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    /// A Manager reaching for an Admin-only employee deletion.
    ManagerCannotDeleteEmployees,
    Generic,
}

impl DenialReason {
    pub fn message(self) -> &'static str {
        match self {
            DenialReason::ManagerCannotDeleteEmployees => MANAGER_DELETE_EMPLOYEE_DENIAL,
            DenialReason::Generic => GENERIC_DENIAL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Deny(DenialReason),
}

/// Base rule: allowed iff the actor's role is one of `required`.
pub fn authorize_roles(actor_role: Role, required: &[Role]) -> Verdict {
    if required.contains(&actor_role) {
        Verdict::Allow
    } else {
        Verdict::Deny(DenialReason::Generic)
    }
}

pub fn authorize(actor_role: Role, operation: Operation) -> Verdict {
    match authorize_roles(actor_role, operation.required_roles()) {
        Verdict::Allow => Verdict::Allow,
        Verdict::Deny(_) => Verdict::Deny(denial_reason(actor_role, operation)),
    }
}

fn denial_reason(actor_role: Role, operation: Operation) -> DenialReason {
    match (actor_role, operation) {
        (Role::Manager, Operation::DeleteEmployee) => DenialReason::ManagerCannotDeleteEmployees,
        _ => DenialReason::Generic,
    }
}

/// `authorize` as a `Result`, for use with `?` inside services.
pub fn require(actor_role: Role, operation: Operation) -> Result<(), AppError> {
    match authorize(actor_role, operation) {
        Verdict::Allow => Ok(()),
        Verdict::Deny(reason) => {
            log::warn!("{} denied {:?}", actor_role, operation);
            Err(AppError::Forbidden(reason.message().to_string()))
        }
    }
}

/// Which employee records an actor may see on a self-scoped read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    Own(Uuid),
    Nothing,
}

impl Scope {
    pub fn for_actor(role: Role, linked_employee: Option<Uuid>) -> Self {
        match (role, linked_employee) {
            (Role::Employee, Some(employee_id)) => Scope::Own(employee_id),
            (Role::Employee, None) => Scope::Nothing,
            _ => Scope::All,
        }
    }

    pub fn permits(self, employee_id: Uuid) -> bool {
        match self {
            Scope::All => true,
            Scope::Own(own) => own == employee_id,
            Scope::Nothing => false,
        }
    }

    /// Single-record read of `employee_id`; foreign records are forbidden.
    pub fn require(self, employee_id: Uuid) -> Result<(), AppError> {
        if self.permits(employee_id) {
            Ok(())
        } else {
            Err(AppError::Forbidden(OWN_PROFILE_ONLY.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ALL_OPERATIONS: [Operation; 11] = [
        Operation::ListEmployees,
        Operation::ViewEmployee,
        Operation::ViewLeaveBalance,
        Operation::CreateEmployee,
        Operation::UpdateEmployee,
        Operation::DeleteEmployee,
        Operation::SubmitLeave,
        Operation::ListLeaves,
        Operation::DecideLeave,
        Operation::DeleteLeave,
        Operation::LinkEmployee,
    ];

    #[test]
    fn allows_exactly_the_required_roles() {
        for operation in ALL_OPERATIONS {
            for role in Role::ALL {
                let expected = operation.required_roles().contains(role);
                assert_eq!(
                    authorize(*role, operation) == Verdict::Allow,
                    expected,
                    "{:?} by {}",
                    operation,
                    role
                );
            }
        }
    }

    #[test]
    fn manager_deleting_employee_gets_dedicated_message() {
        assert_eq!(
            authorize(Role::Manager, Operation::DeleteEmployee),
            Verdict::Deny(DenialReason::ManagerCannotDeleteEmployees)
        );
        assert_eq!(
            DenialReason::ManagerCannotDeleteEmployees.message(),
            "Access denied: Only Administrators can delete employees. Managers can create and edit employees but cannot delete them."
        );
    }

    #[test]
    fn every_other_denial_is_generic() {
        assert_eq!(
            authorize(Role::Manager, Operation::DeleteLeave),
            Verdict::Deny(DenialReason::Generic)
        );
        assert_eq!(
            authorize(Role::Employee, Operation::DeleteEmployee),
            Verdict::Deny(DenialReason::Generic)
        );
        assert_eq!(
            authorize(Role::Employee, Operation::DecideLeave),
            Verdict::Deny(DenialReason::Generic)
        );
        assert_eq!(
            authorize(Role::Admin, Operation::LinkEmployee),
            Verdict::Deny(DenialReason::Generic)
        );
    }

    #[test]
    fn employees_are_scoped_to_their_own_record() {
        let own = Uuid::new_v4();
        let other = Uuid::new_v4();

        let scope = Scope::for_actor(Role::Employee, Some(own));
        assert!(scope.permits(own));
        assert!(!scope.permits(other));
        assert!(scope.require(other).is_err());

        assert_eq!(Scope::for_actor(Role::Employee, None), Scope::Nothing);
        assert_eq!(Scope::for_actor(Role::Manager, None), Scope::All);
        assert!(Scope::for_actor(Role::Admin, Some(own)).permits(other));
    }
}
