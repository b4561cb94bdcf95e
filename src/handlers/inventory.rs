// src/handlers/inventory.rs

use crate::{
    auth::AuthTenant,
    errors::{AppError, AppResult},
    models::{CreateProductRequest, LabelQuery, Product},
    services::reports::{inventory_summary_html, product_labels_html},
    state::AppState,
};
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::Html,
};
use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/api/v1/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = Product),
        (status = 400, description = "Validation error"),
        (status = 409, description = "Product code already used"),
    ),
    security(("bearer_auth" = [])),
    tag = "Inventory"
)]
pub async fn create_product(
    auth: AuthTenant,
    State(state): State<AppState>,
    Json(body): Json<CreateProductRequest>,
) -> AppResult<(StatusCode, Json<Product>)> {
    if body.code.trim().is_empty() || body.name.trim().is_empty() {
        return Err(AppError::Validation("Code and name are required".to_string()));
    }
    if body.quantity < 0 || body.unit_price < Decimal::ZERO {
        return Err(AppError::Validation(
            "Quantity and unit price cannot be negative".to_string(),
        ));
    }

    let duplicate = sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM products WHERE tenant_id = $1 AND code = $2",
    )
    .bind(auth.id)
    .bind(body.code.trim())
    .fetch_optional(&state.db)
    .await?;

    if duplicate.is_some() {
        return Err(AppError::Conflict(format!(
            "Product code '{}' is already used",
            body.code
        )));
    }

    let product = sqlx::query_as::<_, Product>(
        r#"INSERT INTO products (id, tenant_id, code, name, category, quantity, unit_price, reorder_level, created_at)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(auth.id)
    .bind(body.code.trim())
    .bind(body.name.trim())
    .bind(body.category.as_deref().unwrap_or("general"))
    .bind(body.quantity)
    .bind(body.unit_price)
    .bind(body.reorder_level.unwrap_or(0))
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(product)))
}

async fn fetch_products(state: &AppState, tenant_id: Uuid) -> AppResult<Vec<Product>> {
    let products = sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE tenant_id = $1 ORDER BY category, name",
    )
    .bind(tenant_id)
    .fetch_all(&state.db)
    .await?;
    Ok(products)
}

#[utoipa::path(
    get,
    path = "/api/v1/products",
    responses((status = 200, description = "Products", body = Vec<Product>)),
    security(("bearer_auth" = [])),
    tag = "Inventory"
)]
pub async fn list_products(
    auth: AuthTenant,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Product>>> {
    Ok(Json(fetch_products(&state, auth.id).await?))
}

/// Printable inventory summary
#[utoipa::path(
    get,
    path = "/api/v1/inventory/report",
    responses((status = 200, description = "HTML report", content_type = "text/html")),
    security(("bearer_auth" = [])),
    tag = "Inventory"
)]
pub async fn inventory_report(
    auth: AuthTenant,
    State(state): State<AppState>,
) -> AppResult<Html<String>> {
    let products = fetch_products(&state, auth.id).await?;
    Ok(Html(inventory_summary_html(&auth.name, &products, Utc::now())))
}

/// Printable product code labels
#[utoipa::path(
    get,
    path = "/api/v1/inventory/labels",
    params(LabelQuery),
    responses((status = 200, description = "HTML label sheet", content_type = "text/html")),
    security(("bearer_auth" = [])),
    tag = "Inventory"
)]
pub async fn product_labels(
    auth: AuthTenant,
    State(state): State<AppState>,
    Query(query): Query<LabelQuery>,
) -> AppResult<Html<String>> {
    let products = fetch_products(&state, auth.id).await?;
    Ok(Html(product_labels_html(&products, query.copies.unwrap_or(1))))
}
