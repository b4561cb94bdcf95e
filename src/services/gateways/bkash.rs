use super::{GatewayCredentials, PaymentGateway, PaymentIntent, http_error, provider_message};
use crate::{
    errors::{AppError, AppResult},
    models::GatewayKind,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const SANDBOX_URL: &str = "https://tokenized.sandbox.bka.sh/v1.2.0-beta";
const LIVE_URL: &str = "https://tokenized.pay.bka.sh/v1.2.0-beta";

/// bKash tokenized checkout.
pub struct BkashGateway {
    client: Client,
}

// ─── Token grant ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GrantRequest {
    app_key: String,
    app_secret: String,
}

#[derive(Debug, Deserialize)]
struct GrantResponse {
    id_token: Option<String>,
}

// ─── Create payment ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatePaymentRequest<'a> {
    mode: &'a str,
    payer_reference: &'a str,
    #[serde(rename = "callbackURL")]
    callback_url: &'a str,
    amount: String,
    currency: &'a str,
    intent: &'a str,
    merchant_invoice_number: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePaymentResponse {
    status_code: Option<String>,
    #[serde(rename = "bkashURL")]
    bkash_url: Option<String>,
}

impl BkashGateway {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn grant_token(
        &self,
        base_url: &str,
        credentials: &GatewayCredentials,
    ) -> AppResult<String> {
        let body: Value = self
            .client
            .post(format!("{}/tokenized/checkout/token/grant", base_url))
            .header("username", credentials.require("username")?)
            .header("password", credentials.require("password")?)
            .json(&GrantRequest {
                app_key: credentials.require("app_key")?,
                app_secret: credentials.require("app_secret")?,
            })
            .send()
            .await
            .map_err(|e| http_error(self.kind(), e))?
            .json()
            .await
            .map_err(|e| http_error(self.kind(), e))?;

        let grant: GrantResponse = serde_json::from_value(body.clone())
            .map_err(|e| AppError::Gateway(format!("Unexpected bKash grant response: {}", e)))?;

        grant.id_token.ok_or_else(|| {
            AppError::Gateway(
                provider_message(&body, &["statusMessage", "msg", "message"])
                    .unwrap_or_else(|| "bKash token grant failed".to_string()),
            )
        })
    }
}

#[async_trait]
impl PaymentGateway for BkashGateway {
    fn kind(&self) -> GatewayKind {
        GatewayKind::Bkash
    }

    async fn initiate(
        &self,
        intent: &PaymentIntent,
        credentials: &GatewayCredentials,
    ) -> AppResult<Option<String>> {
        let base_url = credentials.base_url(SANDBOX_URL, LIVE_URL);
        let id_token = self.grant_token(&base_url, credentials).await?;

        let payer_reference = if intent.customer_phone.is_empty() {
            "N/A"
        } else {
            intent.customer_phone.as_str()
        };

        // bKash redirects every outcome to the one callback URL
        let payload = CreatePaymentRequest {
            mode: "0011",
            payer_reference,
            callback_url: &intent.ipn_url,
            amount: intent.amount_str(),
            currency: "BDT",
            intent: "sale",
            merchant_invoice_number: intent.order_id(),
        };

        let body: Value = self
            .client
            .post(format!("{}/tokenized/checkout/create", base_url))
            .header("Authorization", &id_token)
            .header("X-APP-Key", credentials.require("app_key")?)
            .json(&payload)
            .send()
            .await
            .map_err(|e| http_error(self.kind(), e))?
            .json()
            .await
            .map_err(|e| http_error(self.kind(), e))?;

        let created: CreatePaymentResponse = serde_json::from_value(body.clone())
            .map_err(|e| AppError::Gateway(format!("Unexpected bKash create response: {}", e)))?;

        match (created.status_code.as_deref(), created.bkash_url) {
            (Some("0000"), Some(url)) => Ok(Some(url)),
            _ => Err(AppError::Gateway(
                provider_message(&body, &["statusMessage", "errorMessage", "message"])
                    .unwrap_or_else(|| "bKash payment could not be created".to_string()),
            )),
        }
    }
}
