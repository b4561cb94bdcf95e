// src/models/mod.rs

mod customer;
mod hr;
mod inventory;
mod network;
mod payments;
mod payroll;

pub use customer::*;
pub use hr::*;
pub use inventory::*;
pub use network::*;
pub use payments::*;
pub use payroll::*;

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

// ─── Tenant ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct TenantPublic {
    pub id: uuid::Uuid,
    pub name: String,
    pub email: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterTenantRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub tenant: TenantPublic,
}

// ─── Shared query params ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MonthQuery {
    /// Format: "YYYY-MM"
    pub month: String,
}

// ─── JWT Claims ───────────────────────────────────────────────────────────────

pub const ADMIN_AUDIENCE: &str = "admin";
pub const CUSTOMER_AUDIENCE: &str = "customer";

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminClaims {
    pub sub: String,
    pub tenant_name: String,
    pub aud: String,
    pub exp: usize,
    pub iat: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CustomerClaims {
    pub sub: String,
    pub tenant_id: String,
    pub aud: String,
    pub exp: usize,
    pub iat: usize,
}
