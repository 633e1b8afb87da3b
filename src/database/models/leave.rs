use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::employee::Employee;
use super::macros::string_enum;

const SECONDS_PER_DAY: i64 = 86_400;

string_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum LeaveType {
        Casual => "Casual Leave",
        Sick => "Sick Leave",
        Earned => "Earned Leave",
    }
}

string_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum LeaveStatus {
        Pending => "Pending",
        Approved => "Approved",
        Rejected => "Rejected",
    }
}

string_enum! {
    /// Outcome a Manager or Admin may record on a pending request.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Decision {
        Approve => "Approved",
        Reject => "Rejected",
    }
}

impl From<Decision> for LeaveStatus {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Approve => LeaveStatus::Approved,
            Decision::Reject => LeaveStatus::Rejected,
        }
    }
}

/// Who a request was filed for. Once the employee is deleted only the name
/// survives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum EmployeeRef {
    Live { id: Uuid },
    #[serde(rename_all = "camelCase")]
    Tombstoned { employee_name: String },
}

impl EmployeeRef {
    pub fn live_id(&self) -> Option<Uuid> {
        match self {
            EmployeeRef::Live { id } => Some(*id),
            EmployeeRef::Tombstoned { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequest {
    pub id: Uuid,
    pub employee: EmployeeRef,
    pub employee_name: String,
    pub leave_type: LeaveType,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub reason: String,
    pub leave_days: i32,
    pub status: LeaveStatus,
    pub approved_by: Option<Uuid>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LeaveRequest {
    pub fn pending(
        employee: &Employee,
        leave_type: LeaveType,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        reason: String,
        leave_days: i32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            employee: EmployeeRef::Live { id: employee.id },
            employee_name: employee.employee_name.clone(),
            leave_type,
            start_date,
            end_date,
            reason,
            leave_days,
            status: LeaveStatus::Pending,
            approved_by: None,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == LeaveStatus::Pending
    }
}

/// Whole days covered by `[start, end)`, rounding partial days up.
/// `None` unless `start < end`.
pub fn leave_days_between(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<i64> {
    if start >= end {
        return None;
    }
    let seconds = (end - start).num_seconds().max(1);
    Some((seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY)
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LeaveRow {
    pub id: Uuid,
    pub employee_id: Option<Uuid>,
    pub employee_name: String,
    pub leave_type: LeaveType,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub reason: String,
    pub leave_days: i32,
    pub status: LeaveStatus,
    pub approved_by: Option<Uuid>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<LeaveRow> for LeaveRequest {
    fn from(row: LeaveRow) -> Self {
        let employee = match row.employee_id {
            Some(id) => EmployeeRef::Live { id },
            None => EmployeeRef::Tombstoned {
                employee_name: row.employee_name.clone(),
            },
        };

        Self {
            id: row.id,
            employee,
            employee_name: row.employee_name,
            leave_type: row.leave_type,
            start_date: row.start_date,
            end_date: row.end_date,
            reason: row.reason,
            leave_days: row.leave_days,
            status: row.status,
            approved_by: row.approved_by,
            rejection_reason: row.rejection_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequestInput {
    pub employee: Uuid,
    /// Kept as text so an unknown category surfaces as a validation message.
    pub leave_type: Option<String>,
    #[serde(with = "super::dates::flexible")]
    pub start_date: DateTime<Utc>,
    #[serde(with = "super::dates::flexible")]
    pub end_date: DateTime<Utc>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionInput {
    pub status: Option<String>,
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeSummary {
    pub id: Option<Uuid>,
    pub employee_name: String,
    pub email: Option<String>,
    pub deleted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApproverSummary {
    pub id: Uuid,
    pub employee_name: Option<String>,
}

/// A request as shown to clients, with references resolved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeaveView {
    pub id: Uuid,
    pub employee: EmployeeSummary,
    pub employee_name: String,
    pub leave_type: LeaveType,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub reason: String,
    pub leave_days: i32,
    pub status: LeaveStatus,
    pub approved_by: Option<ApproverSummary>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
