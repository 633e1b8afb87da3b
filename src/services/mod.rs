pub mod auth;
pub mod authorization;
pub mod employees;
pub mod ledger;
pub mod leave_workflow;
pub mod notifications;
pub mod user_context;
pub mod validation;

pub use auth::AuthService;
pub use employees::EmployeeService;
pub use ledger::LeaveLedger;
pub use leave_workflow::LeaveService;
pub use notifications::{LogSink, NotificationDispatcher, NotificationSink};
pub use user_context::Actor;
