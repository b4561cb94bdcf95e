use super::{GatewayCredentials, PaymentGateway, PaymentIntent, http_error, provider_message};
use crate::{
    errors::{AppError, AppResult},
    models::GatewayKind,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{Value, json};

const SANDBOX_URL: &str = "https://sandbox.piprapay.com";
const LIVE_URL: &str = "https://piprapay.com";

pub struct PipraPayGateway {
    client: Client,
}

#[derive(Debug, Serialize)]
struct ChargeRequest<'a> {
    full_name: &'a str,
    email_mobile: &'a str,
    amount: String,
    currency: &'a str,
    metadata: Value,
    redirect_url: &'a str,
    return_type: &'a str,
    cancel_url: &'a str,
    webhook_url: &'a str,
}

impl PipraPayGateway {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PaymentGateway for PipraPayGateway {
    fn kind(&self) -> GatewayKind {
        GatewayKind::Piprapay
    }

    async fn initiate(
        &self,
        intent: &PaymentIntent,
        credentials: &GatewayCredentials,
    ) -> AppResult<Option<String>> {
        let url = format!(
            "{}/api/create-charge",
            credentials.base_url(SANDBOX_URL, LIVE_URL)
        );

        let contact = if intent.customer_email.is_empty() {
            &intent.customer_phone
        } else {
            &intent.customer_email
        };

        let payload = ChargeRequest {
            full_name: &intent.customer_name,
            email_mobile: contact,
            amount: intent.amount_str(),
            currency: "BDT",
            metadata: json!({ "payment_id": intent.order_id() }),
            redirect_url: &intent.success_url,
            return_type: "GET",
            cancel_url: &intent.cancel_url,
            webhook_url: &intent.ipn_url,
        };

        let body: Value = self
            .client
            .post(&url)
            .header("mh-piprapay-api-key", credentials.require("api_key")?)
            .json(&payload)
            .send()
            .await
            .map_err(|e| http_error(self.kind(), e))?
            .json()
            .await
            .map_err(|e| http_error(self.kind(), e))?;

        match body.get("pp_url").and_then(Value::as_str) {
            Some(pp_url) => Ok(Some(pp_url.to_string())),
            None => Err(AppError::Gateway(
                provider_message(&body, &["message", "error"])
                    .unwrap_or_else(|| "PipraPay charge could not be created".to_string()),
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
    async fn returns_hosted_charge_url() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/create-charge")
            .match_header("mh-piprapay-api-key", "pp-key")
            .match_body(Matcher::PartialJson(json!({
                "email_mobile": "rahim@example.com",
                "currency": "BDT",
            })))
            .with_header("content-type", "application/json")
            .with_body(json!({ "status": true, "pp_url": "https://piprapay.test/pay/9" }).to_string())
            .create_async()
            .await;

        let creds = credentials(&server.url(), json!({ "api_key": "pp-key" }));
        let url = PipraPayGateway::new(Client::new())
            .initiate(&intent(), &creds)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(url.as_deref(), Some("https://piprapay.test/pay/9"));
    }
}
