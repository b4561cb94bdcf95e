// src/handlers/payments.rs

use crate::{
    auth::AuthTenant,
    errors::{AppError, AppResult},
    models::{
        ConfirmManualPaymentRequest, GatewayKind, InitiatePaymentRequest,
        InitiatePaymentResponse, Payment, PaymentGatewayConfig, UpsertGatewayConfigRequest,
    },
    services::payment::{NewPayment, PaymentService},
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use tracing::info;
use uuid::Uuid;

/// Start a payment with one of the supported gateways.
/// Returns the provider's hosted checkout URL (`null` for manual payments).
#[utoipa::path(
    post,
    path = "/api/v1/initiate-payment",
    request_body = InitiatePaymentRequest,
    responses(
        (status = 200, description = "Checkout created", body = InitiatePaymentResponse),
        (status = 400, description = "Missing fields, unconfigured gateway or provider error"),
    ),
    tag = "Payments"
)]
pub async fn initiate_payment(
    State(state): State<AppState>,
    payload: Result<Json<InitiatePaymentRequest>, JsonRejection>,
) -> AppResult<Json<InitiatePaymentResponse>> {
    let Json(body) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let payment = NewPayment::try_from(body)?;

    let response = PaymentService::initiate(
        &state.db,
        &state.gateways,
        &state.config.payment_callback_url,
        payment,
    )
    .await?;

    Ok(Json(response))
}

/// Configure a gateway for the tenant. Credentials are stored as given and
/// never returned.
#[utoipa::path(
    put,
    path = "/api/v1/payment-gateways/{gateway}",
    request_body = UpsertGatewayConfigRequest,
    params(("gateway" = String, Path, description = "sslcommerz, shurjopay, uddoktapay, aamarpay, piprapay, bkash, nagad or manual")),
    responses(
        (status = 200, description = "Gateway configuration saved", body = PaymentGatewayConfig),
        (status = 400, description = "Unsupported gateway"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn upsert_gateway_config(
    auth: AuthTenant,
    State(state): State<AppState>,
    Path(gateway): Path<String>,
    Json(body): Json<UpsertGatewayConfigRequest>,
) -> AppResult<Json<PaymentGatewayConfig>> {
    let kind: GatewayKind = gateway.parse().map_err(AppError::Validation)?;
    if !body.config.is_object() {
        return Err(AppError::Validation(
            "Gateway config must be a JSON object".to_string(),
        ));
    }

    let config = sqlx::query_as::<_, PaymentGatewayConfig>(
        r#"INSERT INTO payment_gateways (id, tenant_id, gateway, is_enabled, sandbox, config, created_at, updated_at)
           VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW())
           ON CONFLICT (tenant_id, gateway) DO UPDATE
           SET is_enabled = EXCLUDED.is_enabled,
               sandbox = EXCLUDED.sandbox,
               config = EXCLUDED.config,
               updated_at = NOW()
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(auth.id)
    .bind(kind.as_str())
    .bind(body.is_enabled)
    .bind(body.sandbox)
    .bind(&body.config)
    .fetch_one(&state.db)
    .await?;

    info!(
        "Tenant {} {} gateway {} (sandbox: {})",
        auth.id,
        if config.is_enabled { "enabled" } else { "disabled" },
        kind,
        config.sandbox
    );

    Ok(Json(config))
}

#[utoipa::path(
    get,
    path = "/api/v1/payment-gateways",
    responses((status = 200, description = "Tenant gateway configurations", body = Vec<PaymentGatewayConfig>)),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn list_gateway_configs(
    auth: AuthTenant,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<PaymentGatewayConfig>>> {
    let configs = sqlx::query_as::<_, PaymentGatewayConfig>(
        "SELECT * FROM payment_gateways WHERE tenant_id = $1 ORDER BY gateway",
    )
    .bind(auth.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(configs))
}

#[utoipa::path(
    get,
    path = "/api/v1/payments",
    responses((status = 200, description = "Payments, newest first", body = Vec<Payment>)),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn list_payments(
    auth: AuthTenant,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Payment>>> {
    let payments = sqlx::query_as::<_, Payment>(
        "SELECT * FROM payments WHERE tenant_id = $1 ORDER BY created_at DESC",
    )
    .bind(auth.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(payments))
}

/// Record the out-of-band reference for a pending manual payment
#[utoipa::path(
    post,
    path = "/api/v1/payments/{payment_id}/confirm",
    request_body = ConfirmManualPaymentRequest,
    params(("payment_id" = Uuid, Path, description = "Payment ID")),
    responses(
        (status = 200, description = "Payment completed", body = Payment),
        (status = 400, description = "Not a manual payment"),
        (status = 404, description = "Payment not found"),
        (status = 409, description = "Payment is not pending"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn confirm_manual_payment(
    auth: AuthTenant,
    State(state): State<AppState>,
    Path(payment_id): Path<Uuid>,
    Json(body): Json<ConfirmManualPaymentRequest>,
) -> AppResult<Json<Payment>> {
    let payment =
        PaymentService::confirm_manual(&state.db, auth.id, payment_id, &body.transaction_id)
            .await?;
    Ok(Json(payment))
}
