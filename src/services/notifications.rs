//! Best-effort notification side channel. Delivery runs on its own task and
//! its outcome is only logged; callers never wait on it.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;

use crate::database::models::{LeaveStatus, LeaveType};

#[derive(Debug, Clone, PartialEq)]
pub enum NotificationEvent {
    /// Sent to the reporting manager of the requesting employee.
    LeaveSubmitted {
        employee_name: String,
        leave_type: LeaveType,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        leave_days: i32,
        reason: String,
    },
    /// Sent to the employee when there is no manager to notify.
    LeaveSubmittedConfirmation {
        leave_type: LeaveType,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        leave_days: i32,
    },
    LeaveDecided {
        leave_type: LeaveType,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        leave_days: i32,
        status: LeaveStatus,
        rejection_reason: Option<String>,
    },
    EmployeeWelcome {
        employee_name: String,
        employee_code: String,
        login_email: String,
    },
}

impl NotificationEvent {
    pub fn subject(&self) -> String {
        match self {
            NotificationEvent::LeaveSubmitted { employee_name, .. } => {
                format!("Leave Request Submitted - {}", employee_name)
            }
            NotificationEvent::LeaveSubmittedConfirmation { leave_type, .. } => {
                format!("Leave Request Submitted - {}", leave_type)
            }
            NotificationEvent::LeaveDecided {
                leave_type, status, ..
            } => format!("Leave Request {} - {}", status, leave_type),
            NotificationEvent::EmployeeWelcome { .. } => {
                "Welcome to Employee Management System - Your Login Details".to_string()
            }
        }
    }

    pub fn body(&self) -> String {
        match self {
            NotificationEvent::LeaveSubmitted {
                employee_name,
                leave_type,
                start_date,
                end_date,
                leave_days,
                reason,
            } => format!(
                "{} has requested {} from {} to {} ({} day(s)). Reason: {}",
                employee_name,
                leave_type,
                start_date.date_naive(),
                end_date.date_naive(),
                leave_days,
                reason
            ),
            NotificationEvent::LeaveSubmittedConfirmation {
                leave_type,
                start_date,
                end_date,
                leave_days,
            } => format!(
                "Your {} request from {} to {} ({} day(s)) is pending approval.",
                leave_type,
                start_date.date_naive(),
                end_date.date_naive(),
                leave_days
            ),
            NotificationEvent::LeaveDecided {
                leave_type,
                start_date,
                end_date,
                leave_days,
                status,
                rejection_reason,
            } => {
                let mut body = format!(
                    "Your {} request from {} to {} ({} day(s)) has been {}.",
                    leave_type,
                    start_date.date_naive(),
                    end_date.date_naive(),
                    leave_days,
                    status.as_str().to_lowercase()
                );
                if let Some(reason) = rejection_reason {
                    body.push_str(&format!(" Reason: {}", reason));
                }
                body
            }
            NotificationEvent::EmployeeWelcome {
                employee_name,
                employee_code,
                login_email,
            } => format!(
                "Welcome {}! Your employee ID is {}. Sign in with {} using the password provided by your administrator.",
                employee_name, employee_code, login_email
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyOutcome {
    pub success: bool,
    pub error: Option<String>,
}

impl NotifyOutcome {
    pub fn delivered() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Delivery backend. Implementations report failure through the outcome and
/// must not panic.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, event: &NotificationEvent, recipient: &str) -> NotifyOutcome;
}

/// Writes every notification to the application log.
pub struct LogSink {
    from: String,
}

impl LogSink {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

#[async_trait]
impl NotificationSink for LogSink {
    async fn notify(&self, event: &NotificationEvent, recipient: &str) -> NotifyOutcome {
        if recipient.trim().is_empty() {
            return NotifyOutcome::failed("Email recipient not provided");
        }

        log::info!(
            "📧 {} -> {}: {} | {}",
            self.from,
            recipient,
            event.subject(),
            event.body()
        );
        NotifyOutcome::delivered()
    }
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    sink: Arc<dyn NotificationSink>,
}

impl NotificationDispatcher {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self { sink }
    }

    /// Hands `event` to the sink on a separate task and returns immediately.
    pub fn dispatch(
        &self,
        event: NotificationEvent,
        recipient: impl Into<String>,
    ) -> JoinHandle<NotifyOutcome> {
        let sink = Arc::clone(&self.sink);
        let recipient = recipient.into();

        tokio::spawn(async move {
            let outcome = sink.notify(&event, &recipient).await;
            if outcome.success {
                log::debug!("Notification '{}' sent to {}", event.subject(), recipient);
            } else {
                log::warn!(
                    "Notification '{}' to {} failed: {}",
                    event.subject(),
                    recipient,
                    outcome.error.as_deref().unwrap_or("unknown error")
                );
            }
            outcome
        })
    }
}
