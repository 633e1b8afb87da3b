use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::leave::LeaveType;

pub const DEFAULT_CASUAL_LEAVE: i32 = 8;
pub const DEFAULT_SICK_LEAVE: i32 = 8;
pub const DEFAULT_EARNED_LEAVE: i32 = 14;

const EMPLOYEE_CODE_PREFIX: &str = "ER";

/// Remaining leave days per category. `total` is stored alongside the three
/// categories and only ever moves together with one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LeaveBalance {
    pub casual_leave: i32,
    pub sick_leave: i32,
    pub earned_leave: i32,
    pub total: i32,
}

impl Default for LeaveBalance {
    fn default() -> Self {
        Self::new(DEFAULT_CASUAL_LEAVE, DEFAULT_SICK_LEAVE, DEFAULT_EARNED_LEAVE)
    }
}

impl LeaveBalance {
    pub fn new(casual_leave: i32, sick_leave: i32, earned_leave: i32) -> Self {
        Self {
            casual_leave,
            sick_leave,
            earned_leave,
            total: casual_leave + sick_leave + earned_leave,
        }
    }

    pub fn available(&self, leave_type: LeaveType) -> i32 {
        match leave_type {
            LeaveType::Casual => self.casual_leave,
            LeaveType::Sick => self.sick_leave,
            LeaveType::Earned => self.earned_leave,
        }
    }

    /// Balance after taking `days` of `leave_type`, or `None` when the
    /// category cannot cover it.
    pub fn debit(&self, leave_type: LeaveType, days: i32) -> Option<LeaveBalance> {
        if days <= 0 || self.available(leave_type) < days {
            return None;
        }

        let mut next = *self;
        match leave_type {
            LeaveType::Casual => next.casual_leave -= days,
            LeaveType::Sick => next.sick_leave -= days,
            LeaveType::Earned => next.earned_leave -= days,
        }
        next.total -= days;
        Some(next)
    }

    pub fn is_consistent(&self) -> bool {
        self.total == self.casual_leave + self.sick_leave + self.earned_leave
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: Uuid,
    pub employee_code: String,
    pub employee_name: String,
    pub email: String,
    pub contact_number: String,
    pub joining_date: DateTime<Utc>,
    pub reporting_manager: Option<Uuid>,
    pub leave_balance: LeaveBalance,
    pub leave_allocation_year: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Employee {
    pub fn new(
        employee_code: String,
        employee_name: String,
        email: String,
        contact_number: String,
        joining_date: DateTime<Utc>,
        reporting_manager: Option<Uuid>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            employee_code,
            employee_name,
            email,
            contact_number,
            joining_date,
            reporting_manager,
            leave_balance: LeaveBalance::default(),
            leave_allocation_year: now.year(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Flat row as stored in the `employees` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EmployeeRow {
    pub id: Uuid,
    pub employee_code: String,
    pub employee_name: String,
    pub email: String,
    pub contact_number: String,
    pub joining_date: DateTime<Utc>,
    pub reporting_manager: Option<Uuid>,
    pub casual_leave: i32,
    pub sick_leave: i32,
    pub earned_leave: i32,
    pub total_leave: i32,
    pub leave_allocation_year: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<EmployeeRow> for Employee {
    fn from(row: EmployeeRow) -> Self {
        Self {
            id: row.id,
            employee_code: row.employee_code,
            employee_name: row.employee_name,
            email: row.email,
            contact_number: row.contact_number,
            joining_date: row.joining_date,
            reporting_manager: row.reporting_manager,
            leave_balance: LeaveBalance {
                casual_leave: row.casual_leave,
                sick_leave: row.sick_leave,
                earned_leave: row.earned_leave,
                total: row.total_leave,
            },
            leave_allocation_year: row.leave_allocation_year,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeInput {
    pub employee_name: String,
    pub email: String,
    pub contact_number: String,
    #[serde(with = "super::dates::flexible")]
    pub joining_date: DateTime<Utc>,
    pub reporting_manager: Option<Uuid>,
    pub password: Option<String>,
}

/// Partial update. An empty `reporting_manager` clears the manager.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeUpdateInput {
    pub employee_name: Option<String>,
    pub email: Option<String>,
    pub contact_number: Option<String>,
    #[serde(default, with = "super::dates::flexible_option")]
    pub joining_date: Option<DateTime<Utc>>,
    pub reporting_manager: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeaveBalanceView {
    pub employee_name: String,
    pub employee_id: String,
    pub leave_balance: LeaveBalance,
    pub allocation_year: i32,
}

impl From<&Employee> for LeaveBalanceView {
    fn from(employee: &Employee) -> Self {
        Self {
            employee_name: employee.employee_name.clone(),
            employee_id: employee.employee_code.clone(),
            leave_balance: employee.leave_balance,
            allocation_year: employee.leave_allocation_year,
        }
    }
}

/// Next code in the `ER0001` sequence after `last`.
pub fn next_employee_code(last: Option<&str>) -> String {
    let next = last
        .and_then(|code| code.strip_prefix(EMPLOYEE_CODE_PREFIX))
        .and_then(|digits| digits.parse::<u32>().ok())
        .map_or(1, |n| n + 1);
    format!("{}{:04}", EMPLOYEE_CODE_PREFIX, next)
}
