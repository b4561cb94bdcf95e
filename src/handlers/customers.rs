// src/handlers/customers.rs
//
// Tenant-side management of packages, subscribers and their bills.

use crate::{
    auth::AuthTenant,
    errors::{AppError, AppResult},
    models::{
        CreateBillRequest, CreateCustomerRequest, CreatePackageRequest, Customer, CustomerBill,
        Package,
    },
    services::calendar::PayPeriod,
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use bcrypt::{DEFAULT_COST, hash};
use rust_decimal::Decimal;
use uuid::Uuid;

// ─── Packages ─────────────────────────────────────────────────────────────────

#[utoipa::path(
    post,
    path = "/api/v1/packages",
    request_body = CreatePackageRequest,
    responses(
        (status = 201, description = "Package created", body = Package),
        (status = 400, description = "Validation error"),
    ),
    security(("bearer_auth" = [])),
    tag = "Customers"
)]
pub async fn create_package(
    auth: AuthTenant,
    State(state): State<AppState>,
    Json(body): Json<CreatePackageRequest>,
) -> AppResult<(StatusCode, Json<Package>)> {
    if body.name.trim().is_empty() || body.price < Decimal::ZERO {
        return Err(AppError::Validation(
            "Package needs a name and a non-negative price".to_string(),
        ));
    }
    if body.download_mbps <= 0 || body.upload_mbps <= 0 {
        return Err(AppError::Validation("Bandwidth must be positive".to_string()));
    }

    let package = sqlx::query_as::<_, Package>(
        r#"INSERT INTO packages (id, tenant_id, name, download_mbps, upload_mbps, price, validity_days, is_active, created_at)
           VALUES ($1, $2, $3, $4, $5, $6, $7, true, NOW())
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(auth.id)
    .bind(body.name.trim())
    .bind(body.download_mbps)
    .bind(body.upload_mbps)
    .bind(body.price)
    .bind(body.validity_days.unwrap_or(30))
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(package)))
}

#[utoipa::path(
    get,
    path = "/api/v1/packages",
    responses((status = 200, description = "Packages", body = Vec<Package>)),
    security(("bearer_auth" = [])),
    tag = "Customers"
)]
pub async fn list_packages(
    auth: AuthTenant,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Package>>> {
    let packages =
        sqlx::query_as::<_, Package>("SELECT * FROM packages WHERE tenant_id = $1 ORDER BY price")
            .bind(auth.id)
            .fetch_all(&state.db)
            .await?;

    Ok(Json(packages))
}

// ─── Customers ────────────────────────────────────────────────────────────────

/// Create a subscriber with a customer-portal password
#[utoipa::path(
    post,
    path = "/api/v1/customers",
    request_body = CreateCustomerRequest,
    responses(
        (status = 201, description = "Customer created", body = Customer),
        (status = 400, description = "Validation error"),
        (status = 409, description = "Phone number already registered"),
    ),
    security(("bearer_auth" = [])),
    tag = "Customers"
)]
pub async fn create_customer(
    auth: AuthTenant,
    State(state): State<AppState>,
    Json(body): Json<CreateCustomerRequest>,
) -> AppResult<(StatusCode, Json<Customer>)> {
    if body.name.trim().is_empty() || body.phone.trim().is_empty() {
        return Err(AppError::Validation("Name and phone are required".to_string()));
    }
    if body.password.len() < 6 {
        return Err(AppError::Validation(
            "Password must be at least 6 characters".to_string(),
        ));
    }

    let duplicate = sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM customers WHERE tenant_id = $1 AND phone = $2",
    )
    .bind(auth.id)
    .bind(body.phone.trim())
    .fetch_optional(&state.db)
    .await?;

    if duplicate.is_some() {
        return Err(AppError::Conflict(format!(
            "A customer with phone '{}' already exists",
            body.phone
        )));
    }

    let password_hash =
        hash(&body.password, DEFAULT_COST).map_err(|e| AppError::Internal(e.to_string()))?;

    let customer = sqlx::query_as::<_, Customer>(
        r#"INSERT INTO customers (
            id, tenant_id, customer_code, name, phone, email, address, password_hash,
            package_id, pppoe_username, status, expiry_date, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'active', $11, NOW(), NOW())
        RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(auth.id)
    .bind(&body.customer_code)
    .bind(body.name.trim())
    .bind(body.phone.trim())
    .bind(&body.email)
    .bind(&body.address)
    .bind(password_hash)
    .bind(body.package_id)
    .bind(&body.pppoe_username)
    .bind(body.expiry_date)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(customer)))
}

#[utoipa::path(
    get,
    path = "/api/v1/customers",
    responses((status = 200, description = "Customers", body = Vec<Customer>)),
    security(("bearer_auth" = [])),
    tag = "Customers"
)]
pub async fn list_customers(
    auth: AuthTenant,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Customer>>> {
    let customers =
        sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE tenant_id = $1 ORDER BY name")
            .bind(auth.id)
            .fetch_all(&state.db)
            .await?;

    Ok(Json(customers))
}

// ─── Bills ────────────────────────────────────────────────────────────────────

#[utoipa::path(
    post,
    path = "/api/v1/customers/{customer_id}/bills",
    request_body = CreateBillRequest,
    params(("customer_id" = Uuid, Path, description = "Customer ID")),
    responses(
        (status = 201, description = "Bill issued", body = CustomerBill),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Customer not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Customers"
)]
pub async fn create_bill(
    auth: AuthTenant,
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
    Json(body): Json<CreateBillRequest>,
) -> AppResult<(StatusCode, Json<CustomerBill>)> {
    let period = PayPeriod::parse(&body.billing_month)?;
    if body.amount <= Decimal::ZERO {
        return Err(AppError::Validation("Bill amount must be greater than zero".to_string()));
    }

    let customer_exists = sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM customers WHERE id = $1 AND tenant_id = $2",
    )
    .bind(customer_id)
    .bind(auth.id)
    .fetch_optional(&state.db)
    .await?;

    if customer_exists.is_none() {
        return Err(AppError::NotFound(format!("Customer {} not found", customer_id)));
    }

    let bill = sqlx::query_as::<_, CustomerBill>(
        r#"INSERT INTO customer_bills (id, tenant_id, customer_id, billing_month, amount, paid_amount, due_date, status, created_at)
           VALUES ($1, $2, $3, $4, $5, 0, $6, 'unpaid', NOW())
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(auth.id)
    .bind(customer_id)
    .bind(&period.month)
    .bind(body.amount)
    .bind(body.due_date)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(bill)))
}

#[utoipa::path(
    get,
    path = "/api/v1/customers/{customer_id}/bills",
    params(("customer_id" = Uuid, Path, description = "Customer ID")),
    responses((status = 200, description = "Customer bills", body = Vec<CustomerBill>)),
    security(("bearer_auth" = [])),
    tag = "Customers"
)]
pub async fn list_customer_bills(
    auth: AuthTenant,
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
) -> AppResult<Json<Vec<CustomerBill>>> {
    let bills = sqlx::query_as::<_, CustomerBill>(
        r#"SELECT * FROM customer_bills
           WHERE tenant_id = $1 AND customer_id = $2
           ORDER BY billing_month DESC"#,
    )
    .bind(auth.id)
    .bind(customer_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(bills))
}
