// src/handlers/staff.rs

use crate::{
    auth::AuthTenant,
    errors::{AppError, AppResult},
    models::{CreateStaffRequest, ListStaffQuery, Staff, UpdateStaffRequest},
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Add a staff member
#[utoipa::path(
    post,
    path = "/api/v1/staff",
    request_body = CreateStaffRequest,
    responses(
        (status = 201, description = "Staff member created", body = Staff),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Staff"
)]
pub async fn create_staff(
    auth: AuthTenant,
    State(state): State<AppState>,
    Json(body): Json<CreateStaffRequest>,
) -> AppResult<(StatusCode, Json<Staff>)> {
    if body.name.trim().is_empty() {
        return Err(AppError::Validation("Staff name is required".to_string()));
    }
    if body.salary < Decimal::ZERO {
        return Err(AppError::Validation("Salary cannot be negative".to_string()));
    }

    let staff = sqlx::query_as::<_, Staff>(
        r#"INSERT INTO staff (
            id, tenant_id, name, email, phone, designation,
            salary, salary_type, is_active, join_date, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, true, $9, NOW(), NOW())
        RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(auth.id)
    .bind(body.name.trim())
    .bind(&body.email)
    .bind(&body.phone)
    .bind(&body.designation)
    .bind(body.salary)
    .bind(body.salary_type.as_deref().unwrap_or("monthly"))
    .bind(body.join_date)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(staff)))
}

/// List staff. Inactive staff are hidden unless `include_inactive=true`.
#[utoipa::path(
    get,
    path = "/api/v1/staff",
    params(ListStaffQuery),
    responses((status = 200, description = "Staff list", body = Vec<Staff>)),
    security(("bearer_auth" = [])),
    tag = "Staff"
)]
pub async fn list_staff(
    auth: AuthTenant,
    State(state): State<AppState>,
    Query(query): Query<ListStaffQuery>,
) -> AppResult<Json<Vec<Staff>>> {
    let staff = sqlx::query_as::<_, Staff>(
        r#"SELECT * FROM staff
           WHERE tenant_id = $1 AND ($2 OR is_active = true)
           ORDER BY name"#,
    )
    .bind(auth.id)
    .bind(query.include_inactive)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(staff))
}

#[utoipa::path(
    get,
    path = "/api/v1/staff/{staff_id}",
    params(("staff_id" = Uuid, Path, description = "Staff ID")),
    responses(
        (status = 200, description = "Staff member", body = Staff),
        (status = 404, description = "Staff member not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Staff"
)]
pub async fn get_staff(
    auth: AuthTenant,
    State(state): State<AppState>,
    Path(staff_id): Path<Uuid>,
) -> AppResult<Json<Staff>> {
    let staff = sqlx::query_as::<_, Staff>("SELECT * FROM staff WHERE id = $1 AND tenant_id = $2")
        .bind(staff_id)
        .bind(auth.id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Staff member {} not found", staff_id)))?;

    Ok(Json(staff))
}

/// Update a staff member's details. Omitted fields are left unchanged.
#[utoipa::path(
    patch,
    path = "/api/v1/staff/{staff_id}",
    request_body = UpdateStaffRequest,
    params(("staff_id" = Uuid, Path, description = "Staff ID")),
    responses(
        (status = 200, description = "Staff member updated", body = Staff),
        (status = 404, description = "Staff member not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Staff"
)]
pub async fn update_staff(
    auth: AuthTenant,
    State(state): State<AppState>,
    Path(staff_id): Path<Uuid>,
    Json(body): Json<UpdateStaffRequest>,
) -> AppResult<Json<Staff>> {
    if body.salary.is_some_and(|s| s < Decimal::ZERO) {
        return Err(AppError::Validation("Salary cannot be negative".to_string()));
    }

    let staff = sqlx::query_as::<_, Staff>(
        r#"UPDATE staff
           SET name = COALESCE($1, name),
               email = COALESCE($2, email),
               phone = COALESCE($3, phone),
               designation = COALESCE($4, designation),
               salary = COALESCE($5, salary),
               salary_type = COALESCE($6, salary_type),
               updated_at = NOW()
           WHERE id = $7 AND tenant_id = $8
           RETURNING *"#,
    )
    .bind(&body.name)
    .bind(&body.email)
    .bind(&body.phone)
    .bind(&body.designation)
    .bind(body.salary)
    .bind(&body.salary_type)
    .bind(staff_id)
    .bind(auth.id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Staff member {} not found", staff_id)))?;

    Ok(Json(staff))
}

/// Deactivate (soft-delete) a staff member
#[utoipa::path(
    delete,
    path = "/api/v1/staff/{staff_id}",
    params(("staff_id" = Uuid, Path, description = "Staff ID")),
    responses(
        (status = 200, description = "Staff member deactivated"),
        (status = 404, description = "Staff member not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Staff"
)]
pub async fn deactivate_staff(
    auth: AuthTenant,
    State(state): State<AppState>,
    Path(staff_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let result = sqlx::query(
        "UPDATE staff SET is_active = false, updated_at = NOW() WHERE id = $1 AND tenant_id = $2",
    )
    .bind(staff_id)
    .bind(auth.id)
    .execute(&state.db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Staff member {} not found", staff_id)));
    }

    Ok(Json(serde_json::json!({ "message": "Staff member deactivated successfully" })))
}
