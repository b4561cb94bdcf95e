// src/handlers/leave.rs

use crate::{
    auth::AuthTenant,
    errors::{AppError, AppResult},
    models::{
        AllocateLeaveBalanceRequest, CreateLeaveTypeRequest, LeaveBalance, LeaveBalanceQuery,
        LeaveRequest, LeaveRequestQuery, LeaveType, RejectLeaveRequest, SubmitLeaveRequest,
    },
    services::leave::{BALANCE_COLUMNS, LeaveService},
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{Datelike, Utc};
use uuid::Uuid;

// ─── Leave types ──────────────────────────────────────────────────────────────

#[utoipa::path(
    post,
    path = "/api/v1/leave/types",
    request_body = CreateLeaveTypeRequest,
    responses(
        (status = 201, description = "Leave type created", body = LeaveType),
        (status = 400, description = "Validation error"),
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn create_leave_type(
    auth: AuthTenant,
    State(state): State<AppState>,
    Json(body): Json<CreateLeaveTypeRequest>,
) -> AppResult<(StatusCode, Json<LeaveType>)> {
    if body.name.trim().is_empty() || body.max_days_per_year < 0 {
        return Err(AppError::Validation(
            "Leave type needs a name and a non-negative yearly allowance".to_string(),
        ));
    }

    let leave_type = sqlx::query_as::<_, LeaveType>(
        r#"INSERT INTO leave_types (id, tenant_id, name, max_days_per_year, is_paid, color, is_active, created_at)
           VALUES ($1, $2, $3, $4, $5, $6, true, NOW())
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(auth.id)
    .bind(body.name.trim())
    .bind(body.max_days_per_year)
    .bind(body.is_paid)
    .bind(body.color.as_deref().unwrap_or("#3b82f6"))
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(leave_type)))
}

#[utoipa::path(
    get,
    path = "/api/v1/leave/types",
    responses((status = 200, description = "Active leave types", body = Vec<LeaveType>)),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn list_leave_types(
    auth: AuthTenant,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<LeaveType>>> {
    let types = sqlx::query_as::<_, LeaveType>(
        "SELECT * FROM leave_types WHERE tenant_id = $1 AND is_active = true ORDER BY name",
    )
    .bind(auth.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(types))
}

/// Deactivate a leave type. Existing requests and balances keep referencing it.
#[utoipa::path(
    delete,
    path = "/api/v1/leave/types/{leave_type_id}",
    params(("leave_type_id" = Uuid, Path, description = "Leave type ID")),
    responses(
        (status = 200, description = "Leave type deactivated"),
        (status = 404, description = "Leave type not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn deactivate_leave_type(
    auth: AuthTenant,
    State(state): State<AppState>,
    Path(leave_type_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let result =
        sqlx::query("UPDATE leave_types SET is_active = false WHERE id = $1 AND tenant_id = $2")
            .bind(leave_type_id)
            .bind(auth.id)
            .execute(&state.db)
            .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "Leave type {} not found",
            leave_type_id
        )));
    }

    Ok(Json(serde_json::json!({ "message": "Leave type deactivated successfully" })))
}

// ─── Balances ─────────────────────────────────────────────────────────────────

/// Set a staff member's allowance for one leave type and year
#[utoipa::path(
    put,
    path = "/api/v1/leave/balances",
    request_body = AllocateLeaveBalanceRequest,
    responses(
        (status = 200, description = "Balance saved", body = LeaveBalance),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Staff or leave type not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn allocate_leave_balance(
    auth: AuthTenant,
    State(state): State<AppState>,
    Json(body): Json<AllocateLeaveBalanceRequest>,
) -> AppResult<Json<LeaveBalance>> {
    let balance = LeaveService::allocate_balance(&state.db, auth.id, &body).await?;

    Ok(Json(balance))
}

#[utoipa::path(
    get,
    path = "/api/v1/leave/balances",
    params(LeaveBalanceQuery),
    responses((status = 200, description = "Balances for the year", body = Vec<LeaveBalance>)),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn list_leave_balances(
    auth: AuthTenant,
    State(state): State<AppState>,
    Query(query): Query<LeaveBalanceQuery>,
) -> AppResult<Json<Vec<LeaveBalance>>> {
    let balances = sqlx::query_as::<_, LeaveBalance>(&format!(
        "SELECT {} FROM leave_balances WHERE tenant_id = $1 AND year = $2 ORDER BY staff_id",
        BALANCE_COLUMNS
    ))
    .bind(auth.id)
    .bind(query.year)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(balances))
}

// ─── Requests ─────────────────────────────────────────────────────────────────

#[utoipa::path(
    post,
    path = "/api/v1/leave/requests",
    request_body = SubmitLeaveRequest,
    responses(
        (status = 201, description = "Leave request submitted", body = LeaveRequest),
        (status = 400, description = "End date before start date"),
        (status = 404, description = "Staff member or leave type not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn submit_leave_request(
    auth: AuthTenant,
    State(state): State<AppState>,
    Json(body): Json<SubmitLeaveRequest>,
) -> AppResult<(StatusCode, Json<LeaveRequest>)> {
    let staff_exists = sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM staff WHERE id = $1 AND tenant_id = $2 AND is_active = true",
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

    let request = LeaveService::submit(&state.db, auth.id, &body).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

#[utoipa::path(
    get,
    path = "/api/v1/leave/requests",
    params(LeaveRequestQuery),
    responses((status = 200, description = "Leave requests", body = Vec<LeaveRequest>)),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn list_leave_requests(
    auth: AuthTenant,
    State(state): State<AppState>,
    Query(query): Query<LeaveRequestQuery>,
) -> AppResult<Json<Vec<LeaveRequest>>> {
    let requests = sqlx::query_as::<_, LeaveRequest>(
        r#"SELECT * FROM leave_requests
           WHERE tenant_id = $1 AND ($2::leave_status IS NULL OR status = $2)
           ORDER BY created_at DESC"#,
    )
    .bind(auth.id)
    .bind(query.status)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(requests))
}

/// Approve a pending request. Charges the current year's balance and marks
/// each weekday in range as leave.
#[utoipa::path(
    post,
    path = "/api/v1/leave/requests/{request_id}/approve",
    params(("request_id" = Uuid, Path, description = "Leave request ID")),
    responses(
        (status = 200, description = "Approved", body = LeaveRequest),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request is not pending"),
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn approve_leave_request(
    auth: AuthTenant,
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
) -> AppResult<Json<LeaveRequest>> {
    let year = Utc::now().year();
    let request = LeaveService::approve(&state.db, auth.id, request_id, year).await?;
    Ok(Json(request))
}

#[utoipa::path(
    post,
    path = "/api/v1/leave/requests/{request_id}/reject",
    request_body = RejectLeaveRequest,
    params(("request_id" = Uuid, Path, description = "Leave request ID")),
    responses(
        (status = 200, description = "Rejected", body = LeaveRequest),
        (status = 400, description = "Rejection reason missing"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request is not pending"),
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn reject_leave_request(
    auth: AuthTenant,
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
    Json(body): Json<RejectLeaveRequest>,
) -> AppResult<Json<LeaveRequest>> {
    let request = LeaveService::reject(
        &state.db,
        auth.id,
        request_id,
        body.rejection_reason.as_deref(),
    )
    .await?;
    Ok(Json(request))
}

#[utoipa::path(
    post,
    path = "/api/v1/leave/requests/{request_id}/cancel",
    params(("request_id" = Uuid, Path, description = "Leave request ID")),
    responses(
        (status = 200, description = "Cancelled", body = LeaveRequest),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request is not pending"),
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn cancel_leave_request(
    auth: AuthTenant,
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
) -> AppResult<Json<LeaveRequest>> {
    let request = LeaveService::cancel(&state.db, auth.id, request_id).await?;
    Ok(Json(request))
}
