// src/handlers/attendance.rs

use crate::{
    auth::AuthTenant,
    errors::{AppError, AppResult},
    models::{Attendance, AttendanceQuery, MarkAttendanceRequest},
    services::calendar::PayPeriod,
    state::AppState,
};
use axum::{
    Json,
    extract::{Query, State},
};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Mark attendance for one staff member on one date.
/// A second mark for the same day replaces the first.
#[utoipa::path(
    put,
    path = "/api/v1/attendance",
    request_body = MarkAttendanceRequest,
    responses(
        (status = 200, description = "Attendance recorded", body = Attendance),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Staff member not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn mark_attendance(
    auth: AuthTenant,
    State(state): State<AppState>,
    Json(body): Json<MarkAttendanceRequest>,
) -> AppResult<Json<Attendance>> {
    let overtime = body.overtime_hours.unwrap_or(Decimal::ZERO);
    if overtime < Decimal::ZERO {
        return Err(AppError::Validation("Overtime hours cannot be negative".to_string()));
    }
    if let (Some(check_in), Some(check_out)) = (body.check_in, body.check_out) {
        if check_out < check_in {
            return Err(AppError::Validation(
                "Check-out cannot be earlier than check-in".to_string(),
            ));
        }
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

    let record = sqlx::query_as::<_, Attendance>(
        r#"INSERT INTO attendance (
            id, tenant_id, staff_id, date, status, check_in, check_out,
            overtime_hours, notes, created_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW())
        ON CONFLICT (staff_id, date) DO UPDATE
        SET status = EXCLUDED.status,
            check_in = EXCLUDED.check_in,
            check_out = EXCLUDED.check_out,
            overtime_hours = EXCLUDED.overtime_hours,
            notes = EXCLUDED.notes
        RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(auth.id)
    .bind(body.staff_id)
    .bind(body.date)
    .bind(body.status)
    .bind(body.check_in)
    .bind(body.check_out)
    .bind(overtime)
    .bind(&body.notes)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(record))
}

/// List attendance for a month, optionally for a single staff member
#[utoipa::path(
    get,
    path = "/api/v1/attendance",
    params(AttendanceQuery),
    responses(
        (status = 200, description = "Attendance records", body = Vec<Attendance>),
        (status = 400, description = "Invalid month"),
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn list_attendance(
    auth: AuthTenant,
    State(state): State<AppState>,
    Query(query): Query<AttendanceQuery>,
) -> AppResult<Json<Vec<Attendance>>> {
    let period = PayPeriod::parse(&query.month)?;

    let records = sqlx::query_as::<_, Attendance>(
        r#"SELECT * FROM attendance
           WHERE tenant_id = $1
             AND date BETWEEN $2 AND $3
             AND ($4::uuid IS NULL OR staff_id = $4)
           ORDER BY date, staff_id"#,
    )
    .bind(auth.id)
    .bind(period.start)
    .bind(period.end)
    .bind(query.staff_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(records))
}
