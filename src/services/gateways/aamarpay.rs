use super::{GatewayCredentials, PaymentGateway, PaymentIntent, http_error, provider_message};
use crate::{
    errors::{AppError, AppResult},
    models::GatewayKind,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

const SANDBOX_URL: &str = "https://sandbox.aamarpay.com";
const LIVE_URL: &str = "https://secure.aamarpay.com";

pub struct AamarPayGateway {
    client: Client,
}

#[derive(Debug, Serialize)]
struct JsonPostRequest<'a> {
    store_id: String,
    signature_key: String,
    tran_id: String,
    amount: String,
    currency: &'a str,
    desc: &'a str,
    cus_name: &'a str,
    cus_email: &'a str,
    cus_phone: &'a str,
    success_url: &'a str,
    fail_url: &'a str,
    cancel_url: &'a str,
    #[serde(rename = "type")]
    response_type: &'a str,
}

impl AamarPayGateway {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PaymentGateway for AamarPayGateway {
    fn kind(&self) -> GatewayKind {
        GatewayKind::Aamarpay
    }

    async fn initiate(
        &self,
        intent: &PaymentIntent,
        credentials: &GatewayCredentials,
    ) -> AppResult<Option<String>> {
        let url = format!("{}/jsonpost.php", credentials.base_url(SANDBOX_URL, LIVE_URL));

        let payload = JsonPostRequest {
            store_id: credentials.require("store_id")?,
            signature_key: credentials.require("signature_key")?,
            tran_id: intent.order_id(),
            amount: intent.amount_str(),
            currency: "BDT",
            desc: &intent.description,
            cus_name: &intent.customer_name,
            cus_email: &intent.customer_email,
            cus_phone: &intent.customer_phone,
            success_url: &intent.success_url,
            fail_url: &intent.fail_url,
            cancel_url: &intent.cancel_url,
            response_type: "json",
        };

        let body: Value = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| http_error(self.kind(), e))?
            .json()
            .await
            .map_err(|e| http_error(self.kind(), e))?;

        // `result` comes back as the string "true"
        let ok = matches!(body.get("result"), Some(Value::String(r)) if r == "true")
            || matches!(body.get("result"), Some(Value::Bool(true)));

        match body.get("payment_url").and_then(Value::as_str) {
            Some(payment_url) if ok => Ok(Some(payment_url.to_string())),
            _ => Err(AppError::Gateway(
                provider_message(&body, &["reason", "message"])
                    .unwrap_or_else(|| "aamarPay checkout could not be created".to_string()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::gateways::test_support::{credentials, intent};
    use mockito::Matcher;
    use serde_json::json;

    fn creds(url: &str) -> GatewayCredentials {
        credentials(url, json!({ "store_id": "aamarpaytest", "signature_key": "sig" }))
    }

    #[tokio::test]
    async fn returns_payment_url() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/jsonpost.php")
            .match_body(Matcher::PartialJson(json!({
                "store_id": "aamarpaytest",
                "tran_id": intent().order_id(),
                "type": "json",
            })))
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "result": "true",
                    "payment_url": "https://sandbox.aamarpay.com/paynow.php?track=1",
                })
                .to_string(),
            )
            .create_async()
            .await;

        let url = AamarPayGateway::new(Client::new())
            .initiate(&intent(), &creds(&server.url()))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(
            url.as_deref(),
            Some("https://sandbox.aamarpay.com/paynow.php?track=1")
        );
    }

    #[tokio::test]
    async fn rejected_request_reports_reason() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/jsonpost.php")
            .with_header("content-type", "application/json")
            .with_body(json!({ "result": "false", "reason": "Invalid store id" }).to_string())
            .create_async()
            .await;

        let err = AamarPayGateway::new(Client::new())
            .initiate(&intent(), &creds(&server.url()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Gateway(ref m) if m == "Invalid store id"));
    }
}
