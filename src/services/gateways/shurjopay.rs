use super::{GatewayCredentials, PaymentGateway, PaymentIntent, http_error, provider_message};
use crate::{
    errors::{AppError, AppResult},
    models::GatewayKind,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const SANDBOX_URL: &str = "https://sandbox.shurjopayment.com";
const LIVE_URL: &str = "https://engine.shurjopayment.com";

pub struct ShurjoPayGateway {
    client: Client,
}

// ─── Token grant ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct TokenRequest {
    username: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: Option<String>,
    store_id: Option<Value>,
}

// ─── Secret pay ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct CheckoutRequest<'a> {
    token: &'a str,
    store_id: &'a Value,
    prefix: String,
    currency: &'a str,
    return_url: &'a str,
    cancel_url: &'a str,
    amount: String,
    order_id: String,
    customer_name: &'a str,
    customer_phone: &'a str,
    customer_email: &'a str,
    customer_address: &'a str,
    customer_city: &'a str,
    client_ip: &'a str,
}

impl ShurjoPayGateway {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn grant_token(
        &self,
        base_url: &str,
        credentials: &GatewayCredentials,
    ) -> AppResult<(String, Value)> {
        let body: Value = self
            .client
            .post(format!("{}/api/get_token", base_url))
            .json(&TokenRequest {
                username: credentials.require("username")?,
                password: credentials.require("password")?,
            })
            .send()
            .await
            .map_err(|e| http_error(self.kind(), e))?
            .json()
            .await
            .map_err(|e| http_error(self.kind(), e))?;

        let token: TokenResponse = serde_json::from_value(body.clone())
            .map_err(|e| AppError::Gateway(format!("Unexpected ShurjoPay token response: {}", e)))?;

        match (token.token, token.store_id) {
            (Some(token), Some(store_id)) => Ok((token, store_id)),
            _ => Err(AppError::Gateway(
                provider_message(&body, &["message", "sp_message"])
                    .unwrap_or_else(|| "ShurjoPay authentication failed".to_string()),
            )),
        }
    }
}

#[async_trait]
impl PaymentGateway for ShurjoPayGateway {
    fn kind(&self) -> GatewayKind {
        GatewayKind::Shurjopay
    }

    async fn initiate(
        &self,
        intent: &PaymentIntent,
        credentials: &GatewayCredentials,
    ) -> AppResult<Option<String>> {
        let base_url = credentials.base_url(SANDBOX_URL, LIVE_URL);
        let (token, store_id) = self.grant_token(&base_url, credentials).await?;

        let payload = CheckoutRequest {
            token: &token,
            store_id: &store_id,
            prefix: credentials.optional("prefix").unwrap_or_else(|| "ISP".to_string()),
            currency: "BDT",
            return_url: &intent.success_url,
            cancel_url: &intent.cancel_url,
            amount: intent.amount_str(),
            order_id: intent.order_id(),
            customer_name: &intent.customer_name,
            customer_phone: &intent.customer_phone,
            customer_email: &intent.customer_email,
            customer_address: "Dhaka",
            customer_city: "Dhaka",
            client_ip: "127.0.0.1",
        };

        let body: Value = self
            .client
            .post(format!("{}/api/secret-pay", base_url))
            .bearer_auth(&token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| http_error(self.kind(), e))?
            .json()
            .await
            .map_err(|e| http_error(self.kind(), e))?;

        match body.get("checkout_url").and_then(Value::as_str) {
            Some(url) => Ok(Some(url.to_string())),
            None => Err(AppError::Gateway(
                provider_message(&body, &["message", "sp_message"])
                    .unwrap_or_else(|| "ShurjoPay checkout could not be created".to_string()),
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
        credentials(url, json!({ "username": "sp_sandbox", "password": "pass123" }))
    }

    #[tokio::test]
    async fn grants_token_then_creates_checkout() {
        let mut server = mockito::Server::new_async().await;
        let token = server
            .mock("POST", "/api/get_token")
            .match_body(Matcher::PartialJson(json!({ "username": "sp_sandbox" })))
            .with_header("content-type", "application/json")
            .with_body(json!({ "token": "tok-1", "store_id": 1, "token_type": "Bearer" }).to_string())
            .create_async()
            .await;
        let checkout = server
            .mock("POST", "/api/secret-pay")
            .match_header("authorization", "Bearer tok-1")
            .match_body(Matcher::PartialJson(json!({
                "store_id": 1,
                "amount": "1500.00",
                "order_id": intent().order_id(),
            })))
            .with_header("content-type", "application/json")
            .with_body(
                json!({ "checkout_url": "https://sandbox.shurjopayment.com/spaycheckout/?token=x" })
                    .to_string(),
            )
            .create_async()
            .await;

        let gateway = ShurjoPayGateway::new(Client::new());
        let url = gateway.initiate(&intent(), &creds(&server.url())).await.unwrap();

        token.assert_async().await;
        checkout.assert_async().await;
        assert!(url.unwrap().contains("spaycheckout"));
    }

    #[tokio::test]
    async fn auth_failure_stops_before_checkout() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/get_token")
            .with_header("content-type", "application/json")
            .with_body(json!({ "sp_code": "1064", "message": "Invalid credentials" }).to_string())
            .create_async()
            .await;
        let checkout = server
            .mock("POST", "/api/secret-pay")
            .expect(0)
            .create_async()
            .await;

        let gateway = ShurjoPayGateway::new(Client::new());
        let err = gateway
            .initiate(&intent(), &creds(&server.url()))
            .await
            .unwrap_err();

        checkout.assert_async().await;
        assert_eq!(err.to_string(), "Payment gateway error: Invalid credentials");
    }
}
