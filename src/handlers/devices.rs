// src/handlers/devices.rs

use crate::{
    auth::AuthTenant,
    errors::AppResult,
    models::OnuDevice,
    services::export::{onu_devices_csv, onu_export_filename},
    state::AppState,
};
use axum::{
    Json,
    extract::State,
    http::header,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::info;

async fn fetch_onu_devices(state: &AppState, tenant_id: uuid::Uuid) -> AppResult<Vec<OnuDevice>> {
    let devices = sqlx::query_as::<_, OnuDevice>(
        r#"SELECT d.id, o.name AS olt_name, d.pon_port, d.onu_name, d.router_name,
                  d.pppoe_username, d.mac_address, d.serial_number,
                  d.rx_power, d.tx_power, d.status, d.last_online
           FROM onu_devices d
           JOIN olts o ON o.id = d.olt_id
           WHERE d.tenant_id = $1
           ORDER BY o.name, d.pon_port"#,
    )
    .bind(tenant_id)
    .fetch_all(&state.db)
    .await?;

    Ok(devices)
}

#[utoipa::path(
    get,
    path = "/api/v1/onu-devices",
    responses((status = 200, description = "ONU devices with their OLT", body = Vec<OnuDevice>)),
    security(("bearer_auth" = [])),
    tag = "Devices"
)]
pub async fn list_onu_devices(
    auth: AuthTenant,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<OnuDevice>>> {
    Ok(Json(fetch_onu_devices(&state, auth.id).await?))
}

/// Download the ONU table as a CSV file
#[utoipa::path(
    get,
    path = "/api/v1/onu-devices/export",
    responses((status = 200, description = "CSV attachment", content_type = "text/csv")),
    security(("bearer_auth" = [])),
    tag = "Devices"
)]
pub async fn export_onu_devices(
    auth: AuthTenant,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let devices = fetch_onu_devices(&state, auth.id).await?;
    let csv = onu_devices_csv(&devices)?;
    let filename = onu_export_filename(Utc::now().date_naive());

    info!("Tenant {} exported {} ONU devices", auth.id, devices.len());

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        csv,
    ))
}
