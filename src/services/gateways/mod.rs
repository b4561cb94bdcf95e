// src/services/gateways/mod.rs
//
// One strategy per payment provider behind the `PaymentGateway` trait. The
// dispatcher looks the strategy up by `GatewayKind` and never branches on
// provider details itself.

mod aamarpay;
mod bkash;
mod manual;
mod nagad;
mod piprapay;
mod shurjopay;
mod sslcommerz;
mod uddoktapay;

pub use aamarpay::AamarPayGateway;
pub use bkash::BkashGateway;
pub use manual::ManualGateway;
pub use nagad::NagadGateway;
pub use piprapay::PipraPayGateway;
pub use shurjopay::ShurjoPayGateway;
pub use sslcommerz::SslCommerzGateway;
pub use uddoktapay::UddoktaPayGateway;

use crate::{
    errors::{AppError, AppResult},
    models::{GatewayKind, PaymentGatewayConfig},
};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::Value;
use std::{collections::HashMap, sync::Arc, time::Duration};
use uuid::Uuid;

/// What every provider needs to open a hosted checkout.
#[derive(Debug, Clone)]
pub struct PaymentIntent {
    /// The pending payment's id; used as the provider order/transaction id.
    pub payment_id: Uuid,
    pub amount: Decimal,
    pub description: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub success_url: String,
    pub fail_url: String,
    pub cancel_url: String,
    pub ipn_url: String,
}

impl PaymentIntent {
    /// Providers in this family take amounts as "1234.50".
    pub fn amount_str(&self) -> String {
        format!("{:.2}", self.amount)
    }

    pub fn order_id(&self) -> String {
        self.payment_id.to_string()
    }
}

/// Provider credentials as stored in `payment_gateways.config`.
#[derive(Debug, Clone)]
pub struct GatewayCredentials {
    pub sandbox: bool,
    pub config: Value,
}

impl GatewayCredentials {
    pub fn new(sandbox: bool, config: Value) -> Self {
        Self { sandbox, config }
    }

    pub fn require(&self, key: &str) -> AppResult<String> {
        self.config
            .get(key)
            .and_then(Value::as_str)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .ok_or_else(|| AppError::Validation(format!("Gateway credential '{}' is missing", key)))
    }

    pub fn optional(&self, key: &str) -> Option<String> {
        self.config
            .get(key)
            .and_then(Value::as_str)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    /// `config.base_url` wins, otherwise the provider's sandbox or live host.
    pub fn base_url(&self, sandbox: &str, live: &str) -> String {
        let default = if self.sandbox { sandbox } else { live };
        self.optional("base_url")
            .unwrap_or_else(|| default.to_string())
            .trim_end_matches('/')
            .to_string()
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn kind(&self) -> GatewayKind;

    /// Opens a checkout with the provider and returns the URL the customer
    /// is redirected to, or `None` when no redirect is involved.
    async fn initiate(
        &self,
        intent: &PaymentIntent,
        credentials: &GatewayCredentials,
    ) -> AppResult<Option<String>>;
}

pub struct GatewayRegistry {
    gateways: HashMap<GatewayKind, Arc<dyn PaymentGateway>>,
}

impl GatewayRegistry {
    pub fn new(timeout_secs: u64) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: Client) -> Self {
        let strategies: Vec<Arc<dyn PaymentGateway>> = vec![
            Arc::new(SslCommerzGateway::new(client.clone())),
            Arc::new(ShurjoPayGateway::new(client.clone())),
            Arc::new(UddoktaPayGateway::new(client.clone())),
            Arc::new(AamarPayGateway::new(client.clone())),
            Arc::new(PipraPayGateway::new(client.clone())),
            Arc::new(BkashGateway::new(client)),
            Arc::new(NagadGateway),
            Arc::new(ManualGateway),
        ];

        Self {
            gateways: strategies.into_iter().map(|g| (g.kind(), g)).collect(),
        }
    }

    pub fn get(&self, kind: GatewayKind) -> AppResult<Arc<dyn PaymentGateway>> {
        self.gateways
            .get(&kind)
            .cloned()
            .ok_or_else(|| AppError::Validation(format!("Unsupported payment gateway '{}'", kind)))
    }
}

/// Picks the tenant's own enabled configuration, falling back to the
/// platform-wide one.
pub fn resolve_config(
    kind: GatewayKind,
    tenant: Option<PaymentGatewayConfig>,
    global: Option<PaymentGatewayConfig>,
) -> AppResult<GatewayCredentials> {
    tenant
        .filter(|c| c.is_enabled)
        .or_else(|| global.filter(|c| c.is_enabled))
        .map(|c| GatewayCredentials::new(c.sandbox, c.config))
        .ok_or_else(|| {
            AppError::Validation(format!(
                "Payment gateway '{}' is not configured or enabled",
                kind
            ))
        })
}

/// Pulls a human-readable message out of a provider error body.
pub(crate) fn provider_message(body: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| body.get(*k))
        .find_map(|v| match v {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Null => None,
            other if !other.is_string() => Some(other.to_string()),
            _ => None,
        })
}

pub(crate) fn http_error(kind: GatewayKind, err: reqwest::Error) -> AppError {
    AppError::Gateway(format!("{} request failed: {}", kind, err))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use rust_decimal_macros::dec;

    pub fn intent() -> PaymentIntent {
        PaymentIntent {
            payment_id: Uuid::parse_str("7f0c6d2e-9a51-4c8e-b1f4-3f2a9e8d6c10").unwrap(),
            amount: dec!(1500),
            description: "Monthly internet bill".to_string(),
            customer_name: "Rahim Uddin".to_string(),
            customer_email: "rahim@example.com".to_string(),
            customer_phone: "01711000000".to_string(),
            success_url: "http://cb/payment-callback?status=success".to_string(),
            fail_url: "http://cb/payment-callback?status=failed".to_string(),
            cancel_url: "http://cb/payment-callback?status=cancelled".to_string(),
            ipn_url: "http://cb/payment-callback/ipn".to_string(),
        }
    }

    pub fn credentials(base_url: &str, mut config: Value) -> GatewayCredentials {
        config["base_url"] = Value::String(base_url.to_string());
        GatewayCredentials::new(true, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn config(tenant_id: Option<Uuid>, enabled: bool, sandbox: bool) -> PaymentGatewayConfig {
        PaymentGatewayConfig {
            id: Uuid::new_v4(),
            tenant_id,
            gateway: "bkash".to_string(),
            is_enabled: enabled,
            sandbox,
            config: json!({ "app_key": if tenant_id.is_some() { "tenant" } else { "global" } }),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn tenant_config_wins_over_global() {
        let tenant = config(Some(Uuid::new_v4()), true, false);
        let creds =
            resolve_config(GatewayKind::Bkash, Some(tenant), Some(config(None, true, true))).unwrap();
        assert_eq!(creds.require("app_key").unwrap(), "tenant");
        assert!(!creds.sandbox);
    }

    #[test]
    fn disabled_tenant_config_falls_back_to_global() {
        let tenant = config(Some(Uuid::new_v4()), false, false);
        let creds =
            resolve_config(GatewayKind::Bkash, Some(tenant), Some(config(None, true, true))).unwrap();
        assert_eq!(creds.require("app_key").unwrap(), "global");
    }

    #[test]
    fn unconfigured_gateway_error_names_the_gateway() {
        let err = resolve_config(GatewayKind::Nagad, None, Some(config(None, false, true)))
            .err()
            .unwrap();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(err.to_string().contains("'nagad'"));
    }

    #[test]
    fn base_url_override_and_defaults() {
        let live = GatewayCredentials::new(false, json!({}));
        assert_eq!(live.base_url("https://sandbox", "https://live"), "https://live");

        let custom = GatewayCredentials::new(true, json!({ "base_url": "http://127.0.0.1:9/" }));
        assert_eq!(custom.base_url("https://sandbox", "https://live"), "http://127.0.0.1:9");
    }

    #[test]
    fn missing_credential_is_reported_by_name() {
        let creds = GatewayCredentials::new(true, json!({ "store_id": "" }));
        let err = creds.require("store_id").unwrap_err();
        assert!(err.to_string().contains("store_id"));
    }

    #[test]
    fn registry_has_every_gateway() {
        let registry = GatewayRegistry::with_client(Client::new());
        for kind in GatewayKind::ALL {
            assert_eq!(registry.get(kind).unwrap().kind(), kind);
        }
    }

    #[test]
    fn gateway_names_parse_case_insensitively() {
        assert_eq!("SSLCommerz".parse::<GatewayKind>().unwrap(), GatewayKind::Sslcommerz);
        assert!("paypal".parse::<GatewayKind>().is_err());
    }

    #[test]
    fn provider_message_prefers_first_present_key() {
        let body = json!({ "statusMessage": "Invalid app key", "message": "" });
        assert_eq!(
            provider_message(&body, &["errorMessage", "statusMessage"]).as_deref(),
            Some("Invalid app key")
        );
        assert_eq!(provider_message(&body, &["message"]), None);
    }
}
