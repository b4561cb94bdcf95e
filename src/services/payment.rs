// src/services/payment.rs

use crate::{
    errors::{AppError, AppResult},
    models::{
        GatewayKind, InitiatePaymentRequest, InitiatePaymentResponse, Payment,
        PaymentGatewayConfig, PaymentPurpose, PaymentStatus,
    },
    services::gateways::{GatewayRegistry, PaymentIntent, resolve_config},
};
use rust_decimal::Decimal;
use serde_json::json;
use sqlx::PgPool;
use tracing::{error, info};
use uuid::Uuid;

/// A payment request with every required field present.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub gateway: GatewayKind,
    pub amount: Decimal,
    pub tenant_id: Uuid,
    pub payment_for: PaymentPurpose,
    pub return_url: String,
    pub cancel_url: Option<String>,
    pub invoice_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub description: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
}

impl TryFrom<InitiatePaymentRequest> for NewPayment {
    type Error = AppError;

    fn try_from(req: InitiatePaymentRequest) -> AppResult<Self> {
        let mut missing = Vec::new();
        if req.gateway.as_deref().is_none_or(|g| g.trim().is_empty()) {
            missing.push("gateway");
        }
        if req.amount.is_none() {
            missing.push("amount");
        }
        if req.tenant_id.is_none() {
            missing.push("tenant_id");
        }
        if req.return_url.as_deref().is_none_or(|u| u.trim().is_empty()) {
            missing.push("return_url");
        }
        if req.payment_for.is_none() {
            missing.push("payment_for");
        }
        if !missing.is_empty() {
            return Err(AppError::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        let (Some(gateway), Some(amount), Some(tenant_id), Some(return_url), Some(payment_for)) = (
            req.gateway,
            req.amount,
            req.tenant_id,
            req.return_url,
            req.payment_for,
        ) else {
            return Err(AppError::Validation("Missing required fields".to_string()));
        };

        if amount <= Decimal::ZERO {
            return Err(AppError::Validation("Amount must be greater than zero".to_string()));
        }

        let gateway: GatewayKind = gateway.parse().map_err(AppError::Validation)?;

        Ok(Self {
            gateway,
            amount,
            tenant_id,
            payment_for,
            return_url,
            cancel_url: req.cancel_url,
            invoice_id: req.invoice_id,
            customer_id: req.customer_id,
            description: req
                .description
                .unwrap_or_else(|| default_description(payment_for).to_string()),
            customer_name: req.customer_name.unwrap_or_else(|| "Customer".to_string()),
            customer_email: req.customer_email.unwrap_or_default(),
            customer_phone: req.customer_phone.unwrap_or_default(),
        })
    }
}

fn default_description(purpose: PaymentPurpose) -> &'static str {
    match purpose {
        PaymentPurpose::Subscription => "Subscription payment",
        PaymentPurpose::CustomerBill => "Internet bill payment",
    }
}

/// Provider-facing URLs for one payment. They point at the callback handler,
/// which records the outcome and then forwards the customer to `return_url`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackUrls {
    pub success: String,
    pub fail: String,
    pub cancel: String,
    pub ipn: String,
}

impl CallbackUrls {
    pub fn new(callback_base: &str, gateway: GatewayKind, payment_id: Uuid) -> Self {
        let base = callback_base.trim_end_matches('/');
        let with_status = |status: &str| {
            format!(
                "{}?payment_id={}&gateway={}&status={}",
                base, payment_id, gateway, status
            )
        };
        Self {
            success: with_status("success"),
            fail: with_status("failed"),
            cancel: with_status("cancelled"),
            ipn: format!("{}/ipn?payment_id={}&gateway={}", base, payment_id, gateway),
        }
    }
}

pub struct PaymentService;

impl PaymentService {
    /// Validates, records a pending payment, and opens a checkout with the
    /// selected provider.
    ///
    /// Gateway configuration is resolved before anything is written, so an
    /// unconfigured gateway fails without a payment row or outbound call.
    pub async fn initiate(
        db: &PgPool,
        gateways: &GatewayRegistry,
        callback_base: &str,
        payment: NewPayment,
    ) -> AppResult<InitiatePaymentResponse> {
        let tenant_exists = sqlx::query_scalar::<_, Uuid>("SELECT id FROM tenants WHERE id = $1")
            .bind(payment.tenant_id)
            .fetch_optional(db)
            .await?;
        if tenant_exists.is_none() {
            return Err(AppError::Validation(format!(
                "Unknown tenant {}",
                payment.tenant_id
            )));
        }

        Self::ensure_references(db, &payment).await?;

        let (tenant_config, global_config) =
            Self::load_configs(db, payment.tenant_id, payment.gateway).await?;
        let credentials = resolve_config(payment.gateway, tenant_config, global_config)?;
        let strategy = gateways.get(payment.gateway)?;

        let payment_id = Uuid::new_v4();
        let metadata = json!({
            "return_url": payment.return_url,
            "cancel_url": payment.cancel_url,
            "payment_for": payment.payment_for.as_str(),
            "customer_id": payment.customer_id,
            "invoice_id": payment.invoice_id,
            "description": payment.description,
        });

        sqlx::query(
            r#"INSERT INTO payments
               (id, tenant_id, customer_id, invoice_id, amount, payment_method, status, gateway_response)
               VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7)"#,
        )
        .bind(payment_id)
        .bind(payment.tenant_id)
        .bind(payment.customer_id)
        .bind(payment.invoice_id)
        .bind(payment.amount)
        .bind(payment.gateway.as_str())
        .bind(&metadata)
        .execute(db)
        .await?;

        info!(
            "Payment {} created: {} {} via {}",
            payment_id,
            payment.payment_for.as_str(),
            payment.amount,
            payment.gateway
        );

        let urls = CallbackUrls::new(callback_base, payment.gateway, payment_id);
        let intent = PaymentIntent {
            payment_id,
            amount: payment.amount,
            description: payment.description,
            customer_name: payment.customer_name,
            customer_email: payment.customer_email,
            customer_phone: payment.customer_phone,
            success_url: urls.success,
            fail_url: urls.fail,
            cancel_url: urls.cancel,
            ipn_url: urls.ipn,
        };

        match strategy.initiate(&intent, &credentials).await {
            Ok(checkout_url) => Ok(InitiatePaymentResponse {
                success: true,
                payment_id,
                checkout_url,
            }),
            Err(e) => {
                error!("{} checkout for payment {} failed: {}", payment.gateway, payment_id, e);
                Self::mark_failed(db, payment_id, &e.to_string()).await?;
                Err(e)
            }
        }
    }

    /// The customer and invoice a payment points at must belong to its tenant,
    /// and an invoice must belong to the named customer.
    async fn ensure_references(db: &PgPool, payment: &NewPayment) -> AppResult<()> {
        if let Some(customer_id) = payment.customer_id {
            sqlx::query_scalar::<_, Uuid>(
                "SELECT id FROM customers WHERE id = $1 AND tenant_id = $2",
            )
            .bind(customer_id)
            .bind(payment.tenant_id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Customer {} not found", customer_id)))?;
        }

        if let Some(invoice_id) = payment.invoice_id {
            let owner = sqlx::query_scalar::<_, Uuid>(
                "SELECT customer_id FROM customer_bills WHERE id = $1 AND tenant_id = $2",
            )
            .bind(invoice_id)
            .bind(payment.tenant_id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Invoice {} not found", invoice_id)))?;

            if payment.customer_id.is_some_and(|c| c != owner) {
                return Err(AppError::NotFound(format!("Invoice {} not found", invoice_id)));
            }
        }

        Ok(())
    }

    async fn load_configs(
        db: &PgPool,
        tenant_id: Uuid,
        gateway: GatewayKind,
    ) -> AppResult<(Option<PaymentGatewayConfig>, Option<PaymentGatewayConfig>)> {
        let rows = sqlx::query_as::<_, PaymentGatewayConfig>(
            r#"SELECT * FROM payment_gateways
               WHERE gateway = $1 AND (tenant_id = $2 OR tenant_id IS NULL)"#,
        )
        .bind(gateway.as_str())
        .bind(tenant_id)
        .fetch_all(db)
        .await?;

        let (tenant, global): (Vec<_>, Vec<_>) =
            rows.into_iter().partition(|c| c.tenant_id.is_some());
        Ok((tenant.into_iter().next(), global.into_iter().next()))
    }

    async fn mark_failed(db: &PgPool, payment_id: Uuid, reason: &str) -> AppResult<()> {
        sqlx::query(
            r#"UPDATE payments
               SET status = 'failed',
                   gateway_response = gateway_response || jsonb_build_object('error', $2::text),
                   updated_at = NOW()
               WHERE id = $1"#,
        )
        .bind(payment_id)
        .bind(reason)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Settles a pending manual payment with the tenant's out-of-band reference.
    pub async fn confirm_manual(
        db: &PgPool,
        tenant_id: Uuid,
        payment_id: Uuid,
        transaction_id: &str,
    ) -> AppResult<Payment> {
        if transaction_id.trim().is_empty() {
            return Err(AppError::Validation("transaction_id is required".to_string()));
        }

        let existing = sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE id = $1 AND tenant_id = $2",
        )
        .bind(payment_id)
        .bind(tenant_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Payment not found".to_string()))?;

        if existing.payment_method != GatewayKind::Manual.as_str() {
            return Err(AppError::BadRequest(
                "Only manual payments can be confirmed by hand".to_string(),
            ));
        }
        if existing.status != PaymentStatus::Pending {
            return Err(AppError::Conflict(format!(
                "Payment is already {:?}",
                existing.status
            )));
        }

        let payment = sqlx::query_as::<_, Payment>(
            r#"UPDATE payments
               SET status = 'completed', transaction_id = $3, updated_at = NOW()
               WHERE id = $1 AND tenant_id = $2 AND status = 'pending'
               RETURNING *"#,
        )
        .bind(payment_id)
        .bind(tenant_id)
        .bind(transaction_id.trim())
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::Conflict("Payment was settled concurrently".to_string()))?;

        info!("Manual payment {} confirmed with reference {}", payment_id, transaction_id);
        Ok(payment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fixtures;
    use rust_decimal_macros::dec;

    fn request() -> InitiatePaymentRequest {
        InitiatePaymentRequest {
            gateway: Some("bKash".to_string()),
            amount: Some(dec!(500)),
            tenant_id: Some(Uuid::new_v4()),
            return_url: Some("https://portal.example.com/bills".to_string()),
            payment_for: Some(PaymentPurpose::CustomerBill),
            ..Default::default()
        }
    }

    #[test]
    fn complete_request_is_accepted() {
        let payment = NewPayment::try_from(request()).unwrap();
        assert_eq!(payment.gateway, GatewayKind::Bkash);
        assert_eq!(payment.description, "Internet bill payment");
        assert_eq!(payment.customer_name, "Customer");
    }

    #[test]
    fn missing_fields_are_listed() {
        let err = NewPayment::try_from(InitiatePaymentRequest {
            gateway: Some("manual".to_string()),
            ..Default::default()
        })
        .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        let msg = err.to_string();
        for field in ["amount", "tenant_id", "return_url", "payment_for"] {
            assert!(msg.contains(field), "{msg} should mention {field}");
        }
        assert!(!msg.contains("gateway"));
    }

    #[test]
    fn non_positive_amount_is_rejected() {
        let err = NewPayment::try_from(InitiatePaymentRequest {
            amount: Some(Decimal::ZERO),
            ..request()
        })
        .unwrap_err();
        assert!(err.to_string().contains("greater than zero"));
    }

    #[test]
    fn unknown_gateway_is_named() {
        let err = NewPayment::try_from(InitiatePaymentRequest {
            gateway: Some("paypal".to_string()),
            ..request()
        })
        .unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("'paypal'"));
    }

    #[test]
    fn callback_urls_carry_payment_and_gateway() {
        let id = Uuid::nil();
        let urls = CallbackUrls::new("https://api.example.com/payment-callback/", GatewayKind::Sslcommerz, id);
        assert_eq!(
            urls.success,
            format!("https://api.example.com/payment-callback?payment_id={id}&gateway=sslcommerz&status=success")
        );
        assert!(urls.cancel.ends_with("status=cancelled"));
        assert_eq!(
            urls.ipn,
            format!("https://api.example.com/payment-callback/ipn?payment_id={id}&gateway=sslcommerz")
        );
    }

    fn manual_payment(
        tenant_id: Uuid,
        customer_id: Option<Uuid>,
        invoice_id: Option<Uuid>,
    ) -> NewPayment {
        NewPayment::try_from(InitiatePaymentRequest {
            gateway: Some("manual".to_string()),
            tenant_id: Some(tenant_id),
            customer_id,
            invoice_id,
            ..request()
        })
        .unwrap()
    }

    async fn enable_manual(db: &PgPool, tenant_id: Uuid) {
        sqlx::query(
            r#"INSERT INTO payment_gateways (id, tenant_id, gateway, is_enabled, sandbox)
               VALUES ($1, $2, 'manual', true, true)"#,
        )
        .bind(Uuid::new_v4())
        .bind(tenant_id)
        .execute(db)
        .await
        .unwrap();
    }

    async fn payment_count(db: &PgPool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM payments")
            .fetch_one(db)
            .await
            .unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn unconfigured_gateway_stores_nothing(pool: PgPool) {
        let tenant = fixtures::tenant(&pool).await;
        let registry = GatewayRegistry::with_client(reqwest::Client::new());

        let err = PaymentService::initiate(
            &pool,
            &registry,
            "https://api.isp.test/payment-callback",
            manual_payment(tenant, None, None),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert!(err.to_string().contains("not configured"));
        assert_eq!(payment_count(&pool).await, 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn foreign_customer_or_invoice_is_refused(pool: PgPool) {
        let tenant = fixtures::tenant(&pool).await;
        let other = fixtures::tenant(&pool).await;
        enable_manual(&pool, tenant).await;
        let registry = GatewayRegistry::with_client(reqwest::Client::new());

        let own_customer = fixtures::customer(&pool, tenant).await;
        let foreign_customer = fixtures::customer(&pool, other).await;
        let foreign_bill = fixtures::bill(&pool, other, foreign_customer, dec!(500)).await;
        let second_customer = fixtures::customer(&pool, tenant).await;
        let sibling_bill = fixtures::bill(&pool, tenant, second_customer, dec!(500)).await;

        for payment in [
            manual_payment(tenant, Some(foreign_customer), None),
            manual_payment(tenant, None, Some(foreign_bill)),
            manual_payment(tenant, Some(own_customer), Some(sibling_bill)),
        ] {
            let err = PaymentService::initiate(&pool, &registry, "https://api.isp.test", payment)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::NotFound(_)), "{err}");
        }
        assert_eq!(payment_count(&pool).await, 0);

        let own_bill = fixtures::bill(&pool, tenant, own_customer, dec!(500)).await;
        let response = PaymentService::initiate(
            &pool,
            &registry,
            "https://api.isp.test",
            manual_payment(tenant, Some(own_customer), Some(own_bill)),
        )
        .await
        .unwrap();

        assert!(response.checkout_url.is_none());
        assert_eq!(payment_count(&pool).await, 1);
    }
}
