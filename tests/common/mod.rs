#![allow(dead_code, unused_macros)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use actix_web::web;
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use fake::Fake;
use fake::faker::name::en::Name;
use uuid::Uuid;

use ems::database::models::{Employee, LeaveBalance, LoginInput, Role, User};
use ems::database::repositories::{
    EmployeeRepository, InMemoryStore, Repositories, UserRepository,
};
use ems::services::Actor;
use ems::services::notifications::{NotificationEvent, NotificationSink, NotifyOutcome};
use ems::{AppState, Config};

pub const EMPLOYEE_PASSWORD: &str = "Secret@1";

static NEXT_CODE: AtomicU32 = AtomicU32::new(5000);

/// Builds the API the way `main` does, over the context's in-memory state.
macro_rules! init_app {
    ($ctx:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data($ctx.config_data.clone())
                .app_data($ctx.state.clone())
                .wrap(ems::middleware::RequestId)
                .configure(ems::routes::configure),
        )
        .await
    };
}

pub fn setup_test_env() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Captures every notification instead of delivering it.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<(NotificationEvent, String)>>,
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn notify(&self, event: &NotificationEvent, recipient: &str) -> NotifyOutcome {
        self.events
            .lock()
            .unwrap()
            .push((event.clone(), recipient.to_string()));
        NotifyOutcome::delivered()
    }
}

impl RecordingSink {
    pub fn events(&self) -> Vec<(NotificationEvent, String)> {
        self.events.lock().unwrap().clone()
    }

    /// Delivery happens on spawned tasks; poll until `count` have landed.
    pub async fn wait_for(&self, count: usize) -> Vec<(NotificationEvent, String)> {
        for _ in 0..100 {
            let events = self.events();
            if events.len() >= count {
                return events;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.events()
    }
}

pub struct TestContext {
    pub config: Config,
    pub config_data: web::Data<Config>,
    pub state: web::Data<AppState>,
    pub store: Arc<InMemoryStore>,
    pub sink: Arc<RecordingSink>,
}

impl TestContext {
    pub async fn new() -> Self {
        setup_test_env();

        let config = Config::test_config();
        let store = Arc::new(InMemoryStore::new());
        let sink = Arc::new(RecordingSink::default());
        let state = AppState::new(
            &config,
            Repositories::from_store(Arc::clone(&store)),
            sink.clone(),
        );
        state
            .auth_service
            .seed_fixed_users()
            .await
            .expect("fixed users seed");

        Self {
            config_data: web::Data::new(config.clone()),
            config,
            state: web::Data::new(state),
            store,
            sink,
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> (String, Actor) {
        let response = self
            .state
            .auth_service
            .login(LoginInput {
                email: email.to_string(),
                password: password.to_string(),
            })
            .await
            .expect("login");

        let actor = Actor {
            user_id: response.user.id,
            email: response.user.email,
            role: response.user.role,
            employee_id: response.user.employee_id,
        };
        (response.token, actor)
    }

    pub async fn admin(&self) -> (String, Actor) {
        let (email, password) = (self.config.admin_email.clone(), self.config.admin_password.clone());
        self.login(&email, &password).await
    }

    pub async fn manager(&self) -> (String, Actor) {
        let (email, password) = (
            self.config.manager_email.clone(),
            self.config.manager_password.clone(),
        );
        self.login(&email, &password).await
    }

    /// Stores an employee with `balance` and a linked Employee account that
    /// signs in with [`EMPLOYEE_PASSWORD`].
    pub async fn employee_with_balance(&self, balance: LeaveBalance) -> Employee {
        let name: String = Name().fake();
        let code = format!("ER{:04}", NEXT_CODE.fetch_add(1, Ordering::Relaxed));
        let mut employee = Employee::new(
            code,
            name,
            format!("emp.{}@example.com", Uuid::new_v4().simple()),
            "9876543210".to_string(),
            Utc::now() - ChronoDuration::days(30),
            None,
        );
        employee.leave_balance = balance;
        EmployeeRepository::insert(self.store.as_ref(), &employee)
            .await
            .expect("employee insert");

        let password_hash =
            bcrypt::hash(EMPLOYEE_PASSWORD, self.config.bcrypt_cost).expect("hash");
        UserRepository::insert(
            self.store.as_ref(),
            &User::new(
                employee.email.clone(),
                password_hash,
                Role::Employee,
                Some(employee.id),
            ),
        )
        .await
        .expect("user insert");

        employee
    }

    pub async fn employee(&self) -> Employee {
        self.employee_with_balance(LeaveBalance::default()).await
    }

    pub async fn employee_token(&self, employee: &Employee) -> String {
        self.login(&employee.email, EMPLOYEE_PASSWORD).await.0
    }

    pub async fn stored_employee(&self, id: Uuid) -> Option<Employee> {
        EmployeeRepository::find_by_id(self.store.as_ref(), id)
            .await
            .expect("employee lookup")
    }
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}

/// `{"employee", "leaveType", "startDate", "endDate", "reason"}` covering
/// `days` whole days, starting a week from now.
pub fn leave_body(employee_id: Uuid, leave_type: &str, days: i64) -> serde_json::Value {
    let start = Utc::now() + ChronoDuration::days(7);
    let end = start + ChronoDuration::days(days);
    serde_json::json!({
        "employee": employee_id,
        "leaveType": leave_type,
        "startDate": start.to_rfc3339(),
        "endDate": end.to_rfc3339(),
        "reason": "Family event",
    })
}
