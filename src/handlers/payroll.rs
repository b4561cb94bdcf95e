// src/handlers/payroll.rs

use crate::{
    auth::AuthTenant,
    errors::{AppError, AppResult},
    models::{
        Attendance, MarkSalaryPaidRequest, MonthQuery, PayrollRun, RunPayrollRequest,
        SalaryBreakdown, SalaryPayment, Staff, StaffLoan,
    },
    services::{
        calendar::PayPeriod,
        email::EmailService,
        payroll::{PayrollService, run_payroll as process_payroll},
    },
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Preview one staff member's salary for a month without saving anything
#[utoipa::path(
    get,
    path = "/api/v1/payroll/preview/{staff_id}",
    params(
        ("staff_id" = Uuid, Path, description = "Staff ID"),
        MonthQuery,
    ),
    responses(
        (status = 200, description = "Salary breakdown", body = SalaryBreakdown),
        (status = 400, description = "Invalid month"),
        (status = 404, description = "Staff member not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn preview_salary(
    auth: AuthTenant,
    State(state): State<AppState>,
    Path(staff_id): Path<Uuid>,
    Query(query): Query<MonthQuery>,
) -> AppResult<Json<SalaryBreakdown>> {
    let period = PayPeriod::parse(&query.month)?;

    let staff = sqlx::query_as::<_, Staff>("SELECT * FROM staff WHERE id = $1 AND tenant_id = $2")
        .bind(staff_id)
        .bind(auth.id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Staff member {} not found", staff_id)))?;

    let attendance = sqlx::query_as::<_, Attendance>(
        "SELECT * FROM attendance WHERE staff_id = $1 AND date BETWEEN $2 AND $3",
    )
    .bind(staff_id)
    .bind(period.start)
    .bind(period.end)
    .fetch_all(&state.db)
    .await?;

    let loans = sqlx::query_as::<_, StaffLoan>(
        "SELECT * FROM staff_loans WHERE staff_id = $1 AND status = 'approved' AND remaining_amount > 0",
    )
    .bind(staff_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(PayrollService::calculate(
        staff.salary,
        &period,
        &attendance,
        &loans,
    )))
}

/// Process payroll for every active staff member for a month.
/// Running the same month again refreshes pending salary rows and never
/// charges a loan installment twice.
#[utoipa::path(
    post,
    path = "/api/v1/payroll/run",
    request_body = RunPayrollRequest,
    responses(
        (status = 200, description = "Payroll run completed", body = PayrollRun),
        (status = 400, description = "Invalid month"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn run_payroll(
    auth: AuthTenant,
    State(state): State<AppState>,
    Json(body): Json<RunPayrollRequest>,
) -> AppResult<Json<PayrollRun>> {
    let period = PayPeriod::parse(&body.month)?;
    let run = process_payroll(&state.db, auth.id, &period).await?;
    Ok(Json(run))
}

/// List all payroll runs for the tenant
#[utoipa::path(
    get,
    path = "/api/v1/payroll/runs",
    responses((status = 200, description = "List of payroll runs", body = Vec<PayrollRun>)),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn list_payroll_runs(
    auth: AuthTenant,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<PayrollRun>>> {
    let runs = sqlx::query_as::<_, PayrollRun>(
        "SELECT * FROM payroll_runs WHERE tenant_id = $1 ORDER BY month DESC",
    )
    .bind(auth.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(runs))
}

/// Get the payroll run for a month
#[utoipa::path(
    get,
    path = "/api/v1/payroll/runs/{month}",
    params(("month" = String, Path, description = "Month in YYYY-MM format")),
    responses(
        (status = 200, description = "Payroll run detail", body = PayrollRun),
        (status = 404, description = "No run for this month"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn get_payroll_run(
    auth: AuthTenant,
    State(state): State<AppState>,
    Path(month): Path<String>,
) -> AppResult<Json<PayrollRun>> {
    let period = PayPeriod::parse(&month)?;

    let run = sqlx::query_as::<_, PayrollRun>(
        "SELECT * FROM payroll_runs WHERE tenant_id = $1 AND month = $2",
    )
    .bind(auth.id)
    .bind(&period.month)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("No payroll run for {}", period.month)))?;

    Ok(Json(run))
}

/// List the salary snapshots produced for a month
#[utoipa::path(
    get,
    path = "/api/v1/payroll/salaries",
    params(MonthQuery),
    responses((status = 200, description = "Salary payments", body = Vec<SalaryPayment>)),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn list_salary_payments(
    auth: AuthTenant,
    State(state): State<AppState>,
    Query(query): Query<MonthQuery>,
) -> AppResult<Json<Vec<SalaryPayment>>> {
    let period = PayPeriod::parse(&query.month)?;

    let payments = sqlx::query_as::<_, SalaryPayment>(
        "SELECT * FROM salary_payments WHERE tenant_id = $1 AND month = $2 ORDER BY created_at",
    )
    .bind(auth.id)
    .bind(&period.month)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(payments))
}

/// Mark a salary as paid and email the staff member a payslip
#[utoipa::path(
    post,
    path = "/api/v1/payroll/salaries/{payment_id}/pay",
    request_body = MarkSalaryPaidRequest,
    params(("payment_id" = Uuid, Path, description = "Salary payment ID")),
    responses(
        (status = 200, description = "Salary marked paid", body = SalaryPayment),
        (status = 404, description = "Salary payment not found"),
        (status = 409, description = "Already paid"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn mark_salary_paid(
    auth: AuthTenant,
    State(state): State<AppState>,
    Path(payment_id): Path<Uuid>,
    Json(body): Json<MarkSalaryPaidRequest>,
) -> AppResult<Json<SalaryPayment>> {
    if body.payment_method.trim().is_empty() {
        return Err(AppError::Validation("payment_method is required".to_string()));
    }

    let payment = sqlx::query_as::<_, SalaryPayment>(
        r#"UPDATE salary_payments
           SET status = 'paid', payment_method = $1, paid_at = NOW(), updated_at = NOW()
           WHERE id = $2 AND tenant_id = $3 AND status = 'pending'
           RETURNING *"#,
    )
    .bind(body.payment_method.trim())
    .bind(payment_id)
    .bind(auth.id)
    .fetch_optional(&state.db)
    .await?;

    let Some(payment) = payment else {
        let exists = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM salary_payments WHERE id = $1 AND tenant_id = $2",
        )
        .bind(payment_id)
        .bind(auth.id)
        .fetch_optional(&state.db)
        .await?;

        return Err(match exists {
            Some(_) => AppError::Conflict("Salary is already paid".to_string()),
            None => AppError::NotFound(format!("Salary payment {} not found", payment_id)),
        });
    };

    info!(
        "Salary {} for {} paid via {}",
        payment.id, payment.month, body.payment_method
    );

    let staff = sqlx::query_as::<_, (String, Option<String>)>(
        "SELECT name, email FROM staff WHERE id = $1",
    )
    .bind(payment.staff_id)
    .fetch_one(&state.db)
    .await?;

    match (&state.config.smtp, staff) {
        (Some(smtp), (name, Some(email))) => {
            EmailService::new(smtp.clone()).spawn_payslip_email(
                email,
                name,
                auth.name.clone(),
                payment.clone(),
            );
        }
        (None, _) => debug!("Payslip email disabled; {} not emailed", payment.id),
        (Some(_), (name, None)) => warn!("{} has no email address; payslip not sent", name),
    }

    Ok(Json(payment))
}
