use super::{GatewayCredentials, PaymentGateway, PaymentIntent, http_error, provider_message};
use crate::{
    errors::{AppError, AppResult},
    models::GatewayKind,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{Value, json};

const SANDBOX_URL: &str = "https://sandbox.uddoktapay.com";
const LIVE_URL: &str = "https://pay.uddoktapay.com";

pub struct UddoktaPayGateway {
    client: Client,
}

#[derive(Debug, Serialize)]
struct CheckoutRequest<'a> {
    full_name: &'a str,
    email: &'a str,
    amount: String,
    metadata: Value,
    redirect_url: &'a str,
    return_type: &'a str,
    cancel_url: &'a str,
    webhook_url: &'a str,
}

impl UddoktaPayGateway {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PaymentGateway for UddoktaPayGateway {
    fn kind(&self) -> GatewayKind {
        GatewayKind::Uddoktapay
    }

    async fn initiate(
        &self,
        intent: &PaymentIntent,
        credentials: &GatewayCredentials,
    ) -> AppResult<Option<String>> {
        let url = format!(
            "{}/api/checkout-v2",
            credentials.base_url(SANDBOX_URL, LIVE_URL)
        );

        let payload = CheckoutRequest {
            full_name: &intent.customer_name,
            email: &intent.customer_email,
            amount: intent.amount_str(),
            metadata: json!({ "payment_id": intent.order_id() }),
            redirect_url: &intent.success_url,
            return_type: "GET",
            cancel_url: &intent.cancel_url,
            webhook_url: &intent.ipn_url,
        };

        let body: Value = self
            .client
            .post(&url)
            .header("RT-UDDOKTAPAY-API-KEY", credentials.require("api_key")?)
            .json(&payload)
            .send()
            .await
            .map_err(|e| http_error(self.kind(), e))?
            .json()
            .await
            .map_err(|e| http_error(self.kind(), e))?;

        let ok = body.get("status").and_then(Value::as_bool).unwrap_or(false);
        match body.get("payment_url").and_then(Value::as_str) {
            Some(payment_url) if ok => Ok(Some(payment_url.to_string())),
            _ => Err(AppError::Gateway(
                provider_message(&body, &["message"])
                    .unwrap_or_else(|| "UddoktaPay checkout could not be created".to_string()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::gateways::test_support::{credentials, intent};
    use mockito::Matcher;

    #[tokio::test]
    async fn sends_api_key_and_returns_payment_url() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/checkout-v2")
            .match_header("rt-uddoktapay-api-key", "udp-key")
            .match_body(Matcher::PartialJson(json!({
                "amount": "1500.00",
                "metadata": { "payment_id": intent().order_id() },
                "webhook_url": intent().ipn_url,
            })))
            .with_header("content-type", "application/json")
            .with_body(
                json!({ "status": true, "payment_url": "https://sandbox.uddoktapay.com/payment/x" })
                    .to_string(),
            )
            .create_async()
            .await;

        let creds = credentials(&server.url(), json!({ "api_key": "udp-key" }));
        let url = UddoktaPayGateway::new(Client::new())
            .initiate(&intent(), &creds)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(url.as_deref(), Some("https://sandbox.uddoktapay.com/payment/x"));
    }

    #[tokio::test]
    async fn missing_api_key_fails_without_calling_out() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("POST", "/api/checkout-v2").expect(0).create_async().await;

        let creds = credentials(&server.url(), json!({}));
        let err = UddoktaPayGateway::new(Client::new())
            .initiate(&intent(), &creds)
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert!(matches!(err, AppError::Validation(_)));
    }
}
