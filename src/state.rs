use crate::{config::Config, services::gateways::GatewayRegistry};
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub gateways: Arc<GatewayRegistry>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> anyhow::Result<Self> {
        let gateways = GatewayRegistry::new(config.gateway_timeout_secs)?;
        Ok(Self {
            db,
            config: Arc::new(config),
            gateways: Arc::new(gateways),
        })
    }
}
