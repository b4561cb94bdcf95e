use super::{GatewayCredentials, PaymentGateway, PaymentIntent, http_error};
use crate::{
    errors::{AppError, AppResult},
    models::GatewayKind,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const SANDBOX_URL: &str = "https://sandbox.sslcommerz.com";
const LIVE_URL: &str = "https://securepay.sslcommerz.com";

pub struct SslCommerzGateway {
    client: Client,
}

// ─── Session init ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct SessionRequest<'a> {
    store_id: String,
    store_passwd: String,
    total_amount: String,
    currency: &'a str,
    tran_id: String,
    success_url: &'a str,
    fail_url: &'a str,
    cancel_url: &'a str,
    ipn_url: &'a str,
    cus_name: &'a str,
    cus_email: &'a str,
    cus_phone: &'a str,
    cus_add1: &'a str,
    cus_city: &'a str,
    cus_country: &'a str,
    shipping_method: &'a str,
    product_name: &'a str,
    product_category: &'a str,
    product_profile: &'a str,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    status: String,
    #[serde(rename = "GatewayPageURL")]
    gateway_page_url: Option<String>,
    failedreason: Option<String>,
}

impl SslCommerzGateway {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PaymentGateway for SslCommerzGateway {
    fn kind(&self) -> GatewayKind {
        GatewayKind::Sslcommerz
    }

    async fn initiate(
        &self,
        intent: &PaymentIntent,
        credentials: &GatewayCredentials,
    ) -> AppResult<Option<String>> {
        let url = format!(
            "{}/gwprocess/v4/api.php",
            credentials.base_url(SANDBOX_URL, LIVE_URL)
        );

        let payload = SessionRequest {
            store_id: credentials.require("store_id")?,
            store_passwd: credentials.require("store_password")?,
            total_amount: intent.amount_str(),
            currency: "BDT",
            tran_id: intent.order_id(),
            success_url: &intent.success_url,
            fail_url: &intent.fail_url,
            cancel_url: &intent.cancel_url,
            ipn_url: &intent.ipn_url,
            cus_name: &intent.customer_name,
            cus_email: &intent.customer_email,
            cus_phone: &intent.customer_phone,
            cus_add1: "Dhaka",
            cus_city: "Dhaka",
            cus_country: "Bangladesh",
            shipping_method: "NO",
            product_name: &intent.description,
            product_category: "Internet Service",
            product_profile: "non-physical-goods",
        };

        let resp: SessionResponse = self
            .client
            .post(&url)
            .form(&payload)
            .send()
            .await
            .map_err(|e| http_error(self.kind(), e))?
            .json()
            .await
            .map_err(|e| http_error(self.kind(), e))?;

        if resp.status != "SUCCESS" {
            return Err(AppError::Gateway(
                resp.failedreason
                    .unwrap_or_else(|| "SSLCommerz session could not be created".to_string()),
            ));
        }

        resp.gateway_page_url
            .map(Some)
            .ok_or_else(|| AppError::Gateway("No GatewayPageURL in SSLCommerz response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::gateways::test_support::{credentials, intent};
    use mockito::Matcher;
    use serde_json::json;

    fn creds(url: &str) -> GatewayCredentials {
        credentials(url, json!({ "store_id": "isp01", "store_password": "isp01@ssl" }))
    }

    #[tokio::test]
    async fn returns_gateway_page_url() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/gwprocess/v4/api.php")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("store_id".into(), "isp01".into()),
                Matcher::UrlEncoded("total_amount".into(), "1500.00".into()),
                Matcher::UrlEncoded("tran_id".into(), intent().order_id()),
                Matcher::UrlEncoded("ipn_url".into(), intent().ipn_url),
            ]))
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "status": "SUCCESS",
                    "GatewayPageURL": "https://sandbox.sslcommerz.com/EasyCheckOut/abc"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let gateway = SslCommerzGateway::new(Client::new());
        let url = gateway.initiate(&intent(), &creds(&server.url())).await.unwrap();

        mock.assert_async().await;
        assert_eq!(
            url.as_deref(),
            Some("https://sandbox.sslcommerz.com/EasyCheckOut/abc")
        );
    }

    #[tokio::test]
    async fn surfaces_failed_reason() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/gwprocess/v4/api.php")
            .with_header("content-type", "application/json")
            .with_body(
                json!({ "status": "FAILED", "failedreason": "Store Credential Error" }).to_string(),
            )
            .create_async()
            .await;

        let gateway = SslCommerzGateway::new(Client::new());
        let err = gateway
            .initiate(&intent(), &creds(&server.url()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Gateway(ref m) if m == "Store Credential Error"));
    }
}
