use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// ─── Salary Payment ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "salary_payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SalaryPaymentStatus {
    Pending,
    Paid,
}

/// Snapshot of one staff member's payroll calculation for a month.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct SalaryPayment {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub staff_id: Uuid,
    pub month: String,
    pub basic_salary: Decimal,
    pub gross_salary: Decimal,
    pub present_days: i32,
    pub absent_days: i32,
    pub late_days: i32,
    pub absent_deduction: Decimal,
    pub late_deduction: Decimal,
    pub overtime_pay: Decimal,
    pub loan_deduction: Decimal,
    pub net_salary: Decimal,
    pub status: SalaryPaymentStatus,
    pub payment_method: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MarkSalaryPaidRequest {
    pub payment_method: String,
}

// ─── Payroll Run ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "payroll_run_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PayrollRunStatus {
    Processing,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PayrollRun {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub month: String,
    pub status: PayrollRunStatus,
    pub total_staff: i32,
    pub total_gross: Decimal,
    pub total_deductions: Decimal,
    pub total_net: Decimal,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RunPayrollRequest {
    /// Format: "YYYY-MM"
    pub month: String,
}

/// Output of the payroll calculator. `late_deduction` combines the late and
/// half-day penalties; `present_days` counts late marks as present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SalaryBreakdown {
    pub working_days: i32,
    pub basic_salary: Decimal,
    pub gross_salary: Decimal,
    pub present_days: i32,
    pub absent_days: i32,
    pub late_days: i32,
    pub leave_days: i32,
    pub half_days: i32,
    pub absent_deduction: Decimal,
    pub late_deduction: Decimal,
    pub overtime_pay: Decimal,
    pub loan_deduction: Decimal,
    pub net_salary: Decimal,
}

impl SalaryBreakdown {
    pub fn total_deductions(&self) -> Decimal {
        self.absent_deduction + self.late_deduction + self.loan_deduction
    }
}
