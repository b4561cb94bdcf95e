use super::{GatewayCredentials, PaymentGateway, PaymentIntent};
use crate::{
    errors::{AppError, AppResult},
    models::GatewayKind,
};
use async_trait::async_trait;
use tracing::warn;

/// Nagad checkout needs every request signed with the merchant's private
/// key and the payload encrypted for Nagad's public key. That signing is not
/// implemented, so this strategy refuses up front instead of sending a
/// request Nagad would reject.
// TODO: implement initialize/complete signing against Nagad's current merchant API docs
pub struct NagadGateway;

#[async_trait]
impl PaymentGateway for NagadGateway {
    fn kind(&self) -> GatewayKind {
        GatewayKind::Nagad
    }

    async fn initiate(
        &self,
        intent: &PaymentIntent,
        _credentials: &GatewayCredentials,
    ) -> AppResult<Option<String>> {
        warn!(
            "Nagad checkout requested for payment {} but request signing is not implemented",
            intent.payment_id
        );
        Err(AppError::Gateway(
            "Nagad integration is incomplete: request signing is not implemented".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::gateways::test_support::intent;
    use serde_json::json;

    #[tokio::test]
    async fn refuses_instead_of_sending_unsigned_requests() {
        let creds = GatewayCredentials::new(true, json!({ "merchant_id": "683002007104225" }));
        let err = NagadGateway.initiate(&intent(), &creds).await.unwrap_err();
        assert!(matches!(err, AppError::Gateway(ref m) if m.contains("signing")));
    }
}
