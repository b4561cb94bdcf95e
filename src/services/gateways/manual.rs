use super::{GatewayCredentials, PaymentGateway, PaymentIntent};
use crate::{errors::AppResult, models::GatewayKind};
use async_trait::async_trait;

/// Cash, bank deposit and other out-of-band payments. Nothing is sent
/// anywhere; the tenant confirms the payment later with a transaction
/// reference.
pub struct ManualGateway;

#[async_trait]
impl PaymentGateway for ManualGateway {
    fn kind(&self) -> GatewayKind {
        GatewayKind::Manual
    }

    async fn initiate(
        &self,
        _intent: &PaymentIntent,
        _credentials: &GatewayCredentials,
    ) -> AppResult<Option<String>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::gateways::test_support::intent;
    use serde_json::json;

    #[tokio::test]
    async fn has_no_checkout_url() {
        let creds = GatewayCredentials::new(false, json!({}));
        assert_eq!(ManualGateway.initiate(&intent(), &creds).await.unwrap(), None);
    }
}
