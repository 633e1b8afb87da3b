pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;

use std::sync::Arc;

pub use config::Config;
pub use database::repositories::Repositories;
pub use error::AppError;
pub use services::{
    AuthService, EmployeeService, LeaveLedger, LeaveService, NotificationDispatcher,
    NotificationSink,
};

pub struct AppState {
    pub auth_service: AuthService,
    pub employee_service: EmployeeService,
    pub leave_service: LeaveService,
}

impl AppState {
    /// Wires the services over one set of repositories so they share a single
    /// ledger and its per-employee locks.
    pub fn new(
        config: &Config,
        repositories: Repositories,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        let ledger = LeaveLedger::new(&repositories);
        let notifier = NotificationDispatcher::new(sink);

        Self {
            auth_service: AuthService::new(config.clone(), &repositories),
            employee_service: EmployeeService::new(
                &repositories,
                ledger.clone(),
                notifier.clone(),
                config.bcrypt_cost,
            ),
            leave_service: LeaveService::new(&repositories, ledger, notifier),
        }
    }
}
