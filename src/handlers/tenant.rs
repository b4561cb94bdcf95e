// src/handlers/tenant.rs

use crate::{
    auth::{AuthTenant, generate_token},
    errors::{AppError, AppResult},
    models::{AuthResponse, LoginRequest, RegisterTenantRequest, TenantPublic},
    state::AppState,
};
use axum::{Json, extract::State, http::StatusCode};
use bcrypt::{DEFAULT_COST, hash, verify};
use tracing::info;
use uuid::Uuid;

/// Register a new ISP tenant
#[utoipa::path(
    post,
    path = "/api/v1/tenants/register",
    request_body = RegisterTenantRequest,
    responses(
        (status = 201, description = "Tenant registered", body = AuthResponse),
        (status = 400, description = "Missing fields"),
        (status = 409, description = "Email already exists"),
    ),
    tag = "Tenants"
)]
pub async fn register_tenant(
    State(state): State<AppState>,
    Json(body): Json<RegisterTenantRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    if body.name.trim().is_empty() || body.email.trim().is_empty() || body.password.len() < 8 {
        return Err(AppError::Validation(
            "Name and email are required and the password must be at least 8 characters"
                .to_string(),
        ));
    }

    let existing = sqlx::query_scalar::<_, Uuid>("SELECT id FROM tenants WHERE email = $1")
        .bind(&body.email)
        .fetch_optional(&state.db)
        .await?;

    if existing.is_some() {
        return Err(AppError::Conflict(format!(
            "Tenant with email '{}' already exists",
            body.email
        )));
    }

    let password_hash =
        hash(&body.password, DEFAULT_COST).map_err(|e| AppError::Internal(e.to_string()))?;

    let tenant = sqlx::query_as::<_, TenantPublic>(
        r#"INSERT INTO tenants (id, name, email, password_hash, created_at, updated_at)
           VALUES ($1, $2, $3, $4, NOW(), NOW())
           RETURNING id, name, email, created_at"#,
    )
    .bind(Uuid::new_v4())
    .bind(body.name.trim())
    .bind(body.email.trim())
    .bind(password_hash)
    .fetch_one(&state.db)
    .await?;

    let token = generate_token(
        tenant.id,
        &tenant.name,
        &state.config.jwt_secret,
        state.config.jwt_expiry_hours,
    )?;

    info!("Tenant {} registered", tenant.id);
    Ok((StatusCode::CREATED, Json(AuthResponse { token, tenant })))
}

/// Login a tenant administrator
#[utoipa::path(
    post,
    path = "/api/v1/tenants/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
    ),
    tag = "Tenants"
)]
pub async fn login_tenant(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let row = sqlx::query_as::<_, (Uuid, String, String, String, chrono::DateTime<chrono::Utc>)>(
        "SELECT id, name, email, password_hash, created_at FROM tenants WHERE email = $1",
    )
    .bind(&body.email)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;

    let (id, name, email, password_hash, created_at) = row;

    let valid =
        verify(&body.password, &password_hash).map_err(|e| AppError::Internal(e.to_string()))?;

    if !valid {
        return Err(AppError::Unauthorized("Invalid email or password".to_string()));
    }

    let token = generate_token(
        id,
        &name,
        &state.config.jwt_secret,
        state.config.jwt_expiry_hours,
    )?;

    Ok(Json(AuthResponse {
        token,
        tenant: TenantPublic {
            id,
            name,
            email,
            created_at,
        },
    }))
}

/// Get the authenticated tenant's profile
#[utoipa::path(
    get,
    path = "/api/v1/tenants/me",
    responses(
        (status = 200, description = "Tenant profile", body = TenantPublic),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Tenants"
)]
pub async fn get_tenant_profile(
    auth: AuthTenant,
    State(state): State<AppState>,
) -> AppResult<Json<TenantPublic>> {
    let tenant = sqlx::query_as::<_, TenantPublic>(
        "SELECT id, name, email, created_at FROM tenants WHERE id = $1",
    )
    .bind(auth.id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound("Tenant not found".to_string()))?;

    Ok(Json(tenant))
}
