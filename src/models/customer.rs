use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// ─── Package ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Package {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub download_mbps: i32,
    pub upload_mbps: i32,
    pub price: Decimal,
    pub validity_days: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePackageRequest {
    pub name: String,
    pub download_mbps: i32,
    pub upload_mbps: i32,
    pub price: Decimal,
    pub validity_days: Option<i32>,
}

// ─── Customer ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Customer {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub customer_code: String,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub package_id: Option<Uuid>,
    pub pppoe_username: Option<String>,
    pub status: String,
    pub expiry_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCustomerRequest {
    pub customer_code: String,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub password: String,
    pub package_id: Option<Uuid>,
    pub pppoe_username: Option<String>,
    pub expiry_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CustomerLoginRequest {
    pub phone: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CustomerAuthResponse {
    pub token: String,
    pub customer: Customer,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyTokenRequest {
    pub token: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangePackageRequest {
    pub package_id: Uuid,
}

// ─── Bills ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "bill_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BillStatus {
    Unpaid,
    Partial,
    Paid,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CustomerBill {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub customer_id: Uuid,
    pub billing_month: String,
    pub amount: Decimal,
    pub paid_amount: Decimal,
    pub due_date: NaiveDate,
    pub status: BillStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateBillRequest {
    /// Format: "YYYY-MM"
    pub billing_month: String,
    pub amount: Decimal,
    pub due_date: NaiveDate,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PayBillRequest {
    pub bill_id: Uuid,
    pub gateway: String,
    pub return_url: String,
    pub cancel_url: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RechargeRequest {
    pub amount: Decimal,
    pub gateway: String,
    pub return_url: String,
    pub cancel_url: Option<String>,
}

// ─── Support & device control ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct SupportTicket {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub customer_id: Uuid,
    pub subject: String,
    pub description: String,
    pub category: String,
    pub priority: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTicketRequest {
    pub subject: String,
    pub description: String,
    pub category: Option<String>,
    pub priority: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct DeviceAction {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub customer_id: Uuid,
    /// reboot_router | reboot_onu | disconnect
    pub action: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NetworkStatus {
    pub connection_status: String,
    pub expiry_date: Option<NaiveDate>,
    pub onu_status: Option<String>,
    pub rx_power: Option<Decimal>,
    pub tx_power: Option<Decimal>,
    pub last_online: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BandwidthInfo {
    pub package_name: Option<String>,
    pub download_mbps: i32,
    pub upload_mbps: i32,
}
