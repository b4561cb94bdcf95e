use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};
use utoipa::ToSchema;
use uuid::Uuid;

// ─── Gateway identifiers ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GatewayKind {
    Sslcommerz,
    Shurjopay,
    Uddoktapay,
    Aamarpay,
    Piprapay,
    Bkash,
    Nagad,
    Manual,
}

impl GatewayKind {
    pub const ALL: [GatewayKind; 8] = [
        GatewayKind::Sslcommerz,
        GatewayKind::Shurjopay,
        GatewayKind::Uddoktapay,
        GatewayKind::Aamarpay,
        GatewayKind::Piprapay,
        GatewayKind::Bkash,
        GatewayKind::Nagad,
        GatewayKind::Manual,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayKind::Sslcommerz => "sslcommerz",
            GatewayKind::Shurjopay => "shurjopay",
            GatewayKind::Uddoktapay => "uddoktapay",
            GatewayKind::Aamarpay => "aamarpay",
            GatewayKind::Piprapay => "piprapay",
            GatewayKind::Bkash => "bkash",
            GatewayKind::Nagad => "nagad",
            GatewayKind::Manual => "manual",
        }
    }
}

impl fmt::Display for GatewayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GatewayKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        GatewayKind::ALL
            .into_iter()
            .find(|g| g.as_str() == needle)
            .ok_or_else(|| format!("Unsupported payment gateway '{}'", s))
    }
}

// ─── Gateway configuration ────────────────────────────────────────────────────

/// Credentials for one gateway. `tenant_id = None` is the platform-wide
/// fallback used when a tenant has no configuration of its own.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PaymentGatewayConfig {
    pub id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub gateway: String,
    pub is_enabled: bool,
    pub sandbox: bool,
    #[serde(skip_serializing)]
    #[schema(value_type = Object)]
    pub config: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpsertGatewayConfigRequest {
    pub is_enabled: bool,
    #[serde(default = "default_sandbox")]
    pub sandbox: bool,
    /// Provider credentials, e.g. `{"store_id": "...", "store_password": "..."}`
    #[schema(value_type = Object)]
    pub config: serde_json::Value,
}

fn default_sandbox() -> bool {
    true
}

// ─── Payment ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentPurpose {
    Subscription,
    CustomerBill,
}

impl PaymentPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentPurpose::Subscription => "subscription",
            PaymentPurpose::CustomerBill => "customer_bill",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Payment {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub invoice_id: Option<Uuid>,
    pub amount: Decimal,
    /// Gateway identifier
    pub payment_method: String,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
    #[schema(value_type = Object)]
    pub gateway_response: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /initiate-payment`. Required fields are optional here so
/// missing ones surface as a validation error instead of a decode failure.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct InitiatePaymentRequest {
    pub gateway: Option<String>,
    pub amount: Option<Decimal>,
    pub tenant_id: Option<Uuid>,
    pub invoice_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub description: Option<String>,
    pub return_url: Option<String>,
    pub cancel_url: Option<String>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub payment_for: Option<PaymentPurpose>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InitiatePaymentResponse {
    pub success: bool,
    pub payment_id: Uuid,
    /// `null` for the manual gateway
    pub checkout_url: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ConfirmManualPaymentRequest {
    pub transaction_id: String,
}
