use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// ONU row joined with the name of the OLT it hangs off.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct OnuDevice {
    pub id: Uuid,
    pub olt_name: String,
    pub pon_port: String,
    pub onu_name: Option<String>,
    pub router_name: Option<String>,
    pub pppoe_username: Option<String>,
    pub mac_address: Option<String>,
    pub serial_number: Option<String>,
    pub rx_power: Option<Decimal>,
    pub tx_power: Option<Decimal>,
    pub status: String,
    pub last_online: Option<DateTime<Utc>>,
}
