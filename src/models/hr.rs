use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

// ─── Staff ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Staff {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub designation: Option<String>,
    /// Monthly base salary
    pub salary: Decimal,
    pub salary_type: String,
    pub is_active: bool,
    pub join_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateStaffRequest {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub designation: Option<String>,
    pub salary: Decimal,
    pub salary_type: Option<String>,
    pub join_date: NaiveDate,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStaffRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub designation: Option<String>,
    pub salary: Option<Decimal>,
    pub salary_type: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListStaffQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

// ─── Attendance ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "attendance_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    HalfDay,
    Leave,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Attendance {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub staff_id: Uuid,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    #[schema(value_type = Option<String>)]
    pub check_in: Option<NaiveTime>,
    #[schema(value_type = Option<String>)]
    pub check_out: Option<NaiveTime>,
    pub overtime_hours: Decimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MarkAttendanceRequest {
    pub staff_id: Uuid,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    #[schema(value_type = Option<String>)]
    pub check_in: Option<NaiveTime>,
    #[schema(value_type = Option<String>)]
    pub check_out: Option<NaiveTime>,
    pub overtime_hours: Option<Decimal>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AttendanceQuery {
    /// Format: "YYYY-MM"
    pub month: String,
    pub staff_id: Option<Uuid>,
}

// ─── Leave ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LeaveType {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub max_days_per_year: i32,
    pub is_paid: bool,
    pub color: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateLeaveTypeRequest {
    pub name: String,
    pub max_days_per_year: i32,
    #[serde(default = "default_true")]
    pub is_paid: bool,
    pub color: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "leave_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LeaveRequest {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub staff_id: Uuid,
    pub leave_type_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_days: i32,
    pub reason: Option<String>,
    pub status: LeaveStatus,
    pub rejection_reason: Option<String>,
    /// Set on approval and on rejection
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitLeaveRequest {
    pub staff_id: Uuid,
    pub leave_type_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RejectLeaveRequest {
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LeaveRequestQuery {
    pub status: Option<LeaveStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LeaveBalance {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub staff_id: Uuid,
    pub leave_type_id: Uuid,
    pub year: i32,
    pub total_days: i32,
    pub used_days: i32,
    /// total_days - used_days; may go negative
    pub remaining_days: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AllocateLeaveBalanceRequest {
    pub staff_id: Uuid,
    pub leave_type_id: Uuid,
    pub year: i32,
    pub total_days: i32,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LeaveBalanceQuery {
    pub year: i32,
}

// ─── Staff Loans ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "loan_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LoanType {
    Advance,
    Loan,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "loan_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct StaffLoan {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub staff_id: Uuid,
    pub loan_type: LoanType,
    pub amount: Decimal,
    pub remaining_amount: Decimal,
    pub monthly_deduction: Decimal,
    pub status: LoanStatus,
    pub reason: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateLoanRequest {
    pub staff_id: Uuid,
    pub loan_type: LoanType,
    pub amount: Decimal,
    pub monthly_deduction: Decimal,
    pub reason: Option<String>,
}
