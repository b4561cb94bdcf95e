// src/handlers/loans.rs

use crate::{
    auth::AuthTenant,
    errors::{AppError, AppResult},
    models::{CreateLoanRequest, LoanStatus, StaffLoan},
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

/// Request a salary advance or loan. The full amount is outstanding until
/// payroll starts deducting installments.
#[utoipa::path(
    post,
    path = "/api/v1/loans",
    request_body = CreateLoanRequest,
    responses(
        (status = 201, description = "Loan requested", body = StaffLoan),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Staff member not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Loans"
)]
pub async fn create_loan(
    auth: AuthTenant,
    State(state): State<AppState>,
    Json(body): Json<CreateLoanRequest>,
) -> AppResult<(StatusCode, Json<StaffLoan>)> {
    if body.amount <= Decimal::ZERO || body.monthly_deduction <= Decimal::ZERO {
        return Err(AppError::Validation(
            "Amount and monthly deduction must be greater than zero".to_string(),
        ));
    }
    if body.monthly_deduction > body.amount {
        return Err(AppError::Validation(
            "Monthly deduction cannot exceed the loan amount".to_string(),
        ));
    }

    let staff_exists = sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM staff WHERE id = $1 AND tenant_id = $2",
    )
    .bind(body.staff_id)
    .bind(auth.id)
    .fetch_optional(&state.db)
    .await?;

    if staff_exists.is_none() {
        return Err(AppError::NotFound(format!(
            "Staff member {} not found",
            body.staff_id
        )));
    }

    let loan = sqlx::query_as::<_, StaffLoan>(
        r#"INSERT INTO staff_loans (
            id, tenant_id, staff_id, loan_type, amount, remaining_amount,
            monthly_deduction, status, reason, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $5, $6, 'pending', $7, NOW(), NOW())
        RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(auth.id)
    .bind(body.staff_id)
    .bind(body.loan_type)
    .bind(body.amount)
    .bind(body.monthly_deduction)
    .bind(&body.reason)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(loan)))
}

#[utoipa::path(
    get,
    path = "/api/v1/loans",
    responses((status = 200, description = "All staff loans", body = Vec<StaffLoan>)),
    security(("bearer_auth" = [])),
    tag = "Loans"
)]
pub async fn list_loans(
    auth: AuthTenant,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<StaffLoan>>> {
    let loans = sqlx::query_as::<_, StaffLoan>(
        "SELECT * FROM staff_loans WHERE tenant_id = $1 ORDER BY created_at DESC",
    )
    .bind(auth.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(loans))
}

async fn decide_loan(
    state: &AppState,
    tenant_id: Uuid,
    loan_id: Uuid,
    decision: LoanStatus,
) -> AppResult<StaffLoan> {
    let loan = sqlx::query_as::<_, StaffLoan>(
        r#"UPDATE staff_loans
           SET status = $1,
               approved_at = CASE WHEN $1 = 'approved'::loan_status THEN NOW() ELSE approved_at END,
               updated_at = NOW()
           WHERE id = $2 AND tenant_id = $3 AND status = 'pending'
           RETURNING *"#,
    )
    .bind(decision)
    .bind(loan_id)
    .bind(tenant_id)
    .fetch_optional(&state.db)
    .await?;

    match loan {
        Some(loan) => {
            info!("Loan {} {:?}", loan.id, loan.status);
            Ok(loan)
        }
        None => {
            let exists = sqlx::query_scalar::<_, Uuid>(
                "SELECT id FROM staff_loans WHERE id = $1 AND tenant_id = $2",
            )
            .bind(loan_id)
            .bind(tenant_id)
            .fetch_optional(&state.db)
            .await?;

            Err(match exists {
                Some(_) => AppError::Conflict("Only pending loans can be decided".to_string()),
                None => AppError::NotFound(format!("Loan {} not found", loan_id)),
            })
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/loans/{loan_id}/approve",
    params(("loan_id" = Uuid, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Loan approved", body = StaffLoan),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Loan is not pending"),
    ),
    security(("bearer_auth" = [])),
    tag = "Loans"
)]
pub async fn approve_loan(
    auth: AuthTenant,
    State(state): State<AppState>,
    Path(loan_id): Path<Uuid>,
) -> AppResult<Json<StaffLoan>> {
    Ok(Json(decide_loan(&state, auth.id, loan_id, LoanStatus::Approved).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/loans/{loan_id}/reject",
    params(("loan_id" = Uuid, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Loan rejected", body = StaffLoan),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Loan is not pending"),
    ),
    security(("bearer_auth" = [])),
    tag = "Loans"
)]
pub async fn reject_loan(
    auth: AuthTenant,
    State(state): State<AppState>,
    Path(loan_id): Path<Uuid>,
) -> AppResult<Json<StaffLoan>> {
    Ok(Json(decide_loan(&state, auth.id, loan_id, LoanStatus::Rejected).await?))
}
