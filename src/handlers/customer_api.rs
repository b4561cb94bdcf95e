// src/handlers/customer_api.rs
//
// Subscriber-facing API. Every response uses the `{ success, data?, message? }`
// envelope; failures come back as `{ success: false, error }`.

use crate::{
    auth::{AuthCustomer, generate_customer_token, verify_customer_token},
    errors::{ApiResponse, AppError, AppResult},
    models::{
        BandwidthInfo, BillStatus, ChangePackageRequest, CreateTicketRequest, Customer,
        CustomerAuthResponse, CustomerBill, CustomerLoginRequest, DeviceAction,
        GatewayKind, InitiatePaymentResponse, NetworkStatus, Package, PayBillRequest, Payment,
        PaymentPurpose, RechargeRequest, SupportTicket, UpdateProfileRequest, VerifyTokenRequest,
    },
    services::payment::{NewPayment, PaymentService},
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, State},
    http::HeaderMap,
};
use bcrypt::verify;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

type Envelope<T> = AppResult<Json<ApiResponse<T>>>;

fn tenant_from_headers(headers: &HeaderMap) -> AppResult<Uuid> {
    let raw = headers
        .get("x-tenant-id")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Validation("x-tenant-id header is required".to_string()))?;

    Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::Validation("x-tenant-id must be a UUID".to_string()))
}

async fn load_customer(state: &AppState, auth: &AuthCustomer) -> AppResult<Customer> {
    sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = $1 AND tenant_id = $2")
        .bind(auth.id)
        .bind(auth.tenant_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Customer not found".to_string()))
}

// ─── Auth ─────────────────────────────────────────────────────────────────────

/// Log in with phone number and password. The tenant is taken from the
/// `x-tenant-id` header.
#[utoipa::path(
    post,
    path = "/customer-api/auth/login",
    request_body = CustomerLoginRequest,
    params(("x-tenant-id" = Uuid, Header, description = "Tenant the customer belongs to")),
    responses(
        (status = 200, description = "Logged in", body = CustomerAuthResponse),
        (status = 400, description = "Missing tenant header or fields"),
        (status = 401, description = "Invalid credentials"),
    ),
    tag = "Customer API"
)]
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CustomerLoginRequest>,
) -> Envelope<CustomerAuthResponse> {
    let tenant_id = tenant_from_headers(&headers)?;
    if body.phone.trim().is_empty() || body.password.is_empty() {
        return Err(AppError::Validation("Phone and password are required".to_string()));
    }

    let customer = sqlx::query_as::<_, Customer>(
        "SELECT * FROM customers WHERE tenant_id = $1 AND phone = $2",
    )
    .bind(tenant_id)
    .bind(body.phone.trim())
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::Unauthorized("Invalid phone or password".to_string()))?;

    let valid = verify(&body.password, &customer.password_hash)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    if !valid {
        return Err(AppError::Unauthorized("Invalid phone or password".to_string()));
    }

    let token = generate_customer_token(
        customer.id,
        customer.tenant_id,
        &state.config.jwt_secret,
        state.config.customer_token_expiry_hours,
    )?;

    Ok(Json(ApiResponse::with_message(
        CustomerAuthResponse { token, customer },
        "Login successful",
    )))
}

/// Check a token and return the customer it belongs to
#[utoipa::path(
    post,
    path = "/customer-api/auth/verify",
    request_body = VerifyTokenRequest,
    responses(
        (status = 200, description = "Token is valid", body = Customer),
        (status = 401, description = "Invalid or expired token"),
    ),
    tag = "Customer API"
)]
pub async fn verify_token(
    State(state): State<AppState>,
    Json(body): Json<VerifyTokenRequest>,
) -> Envelope<Customer> {
    let auth = verify_customer_token(&body.token, &state.config.jwt_secret)?;
    let customer = load_customer(&state, &auth).await?;
    Ok(Json(ApiResponse::ok(customer)))
}

// ─── Profile ──────────────────────────────────────────────────────────────────

#[utoipa::path(
    get,
    path = "/customer-api/profile",
    responses(
        (status = 200, description = "Customer profile", body = Customer),
        (status = 401, description = "Invalid or expired token"),
    ),
    security(("bearer_auth" = [])),
    tag = "Customer API"
)]
pub async fn get_profile(auth: AuthCustomer, State(state): State<AppState>) -> Envelope<Customer> {
    Ok(Json(ApiResponse::ok(load_customer(&state, &auth).await?)))
}

#[utoipa::path(
    put,
    path = "/customer-api/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = Customer),
        (status = 401, description = "Invalid or expired token"),
    ),
    security(("bearer_auth" = [])),
    tag = "Customer API"
)]
pub async fn update_profile(
    auth: AuthCustomer,
    State(state): State<AppState>,
    Json(body): Json<UpdateProfileRequest>,
) -> Envelope<Customer> {
    if body.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(AppError::Validation("Name cannot be empty".to_string()));
    }

    let customer = sqlx::query_as::<_, Customer>(
        r#"UPDATE customers
           SET name = COALESCE($1, name),
               email = COALESCE($2, email),
               address = COALESCE($3, address),
               updated_at = NOW()
           WHERE id = $4 AND tenant_id = $5
           RETURNING *"#,
    )
    .bind(body.name.as_deref().map(str::trim))
    .bind(&body.email)
    .bind(&body.address)
    .bind(auth.id)
    .bind(auth.tenant_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound("Customer not found".to_string()))?;

    Ok(Json(ApiResponse::with_message(customer, "Profile updated")))
}

// ─── Network ──────────────────────────────────────────────────────────────────

#[utoipa::path(
    get,
    path = "/customer-api/network/status",
    responses(
        (status = 200, description = "Connection and ONU status", body = NetworkStatus),
        (status = 401, description = "Invalid or expired token"),
    ),
    security(("bearer_auth" = [])),
    tag = "Customer API"
)]
pub async fn network_status(
    auth: AuthCustomer,
    State(state): State<AppState>,
) -> Envelope<NetworkStatus> {
    let customer = load_customer(&state, &auth).await?;

    let onu = sqlx::query_as::<_, (String, Option<Decimal>, Option<Decimal>, Option<DateTime<Utc>>)>(
        r#"SELECT status, rx_power, tx_power, last_online
           FROM onu_devices
           WHERE customer_id = $1 AND tenant_id = $2
           ORDER BY last_online DESC NULLS LAST
           LIMIT 1"#,
    )
    .bind(auth.id)
    .bind(auth.tenant_id)
    .fetch_optional(&state.db)
    .await?;

    let (onu_status, rx_power, tx_power, last_online) = match onu {
        Some((status, rx, tx, last)) => (Some(status), rx, tx, last),
        None => (None, None, None, None),
    };

    Ok(Json(ApiResponse::ok(NetworkStatus {
        connection_status: customer.status,
        expiry_date: customer.expiry_date,
        onu_status,
        rx_power,
        tx_power,
        last_online,
    })))
}

#[utoipa::path(
    get,
    path = "/customer-api/network/bandwidth",
    responses(
        (status = 200, description = "Subscribed bandwidth", body = BandwidthInfo),
        (status = 401, description = "Invalid or expired token"),
    ),
    security(("bearer_auth" = [])),
    tag = "Customer API"
)]
pub async fn bandwidth(auth: AuthCustomer, State(state): State<AppState>) -> Envelope<BandwidthInfo> {
    let customer = load_customer(&state, &auth).await?;

    let package = match customer.package_id {
        Some(package_id) => {
            sqlx::query_as::<_, Package>("SELECT * FROM packages WHERE id = $1 AND tenant_id = $2")
                .bind(package_id)
                .bind(auth.tenant_id)
                .fetch_optional(&state.db)
                .await?
        }
        None => None,
    };

    let info = match package {
        Some(p) => BandwidthInfo {
            package_name: Some(p.name),
            download_mbps: p.download_mbps,
            upload_mbps: p.upload_mbps,
        },
        None => BandwidthInfo {
            package_name: None,
            download_mbps: 0,
            upload_mbps: 0,
        },
    };

    Ok(Json(ApiResponse::ok(info)))
}

// ─── Bills & payments ─────────────────────────────────────────────────────────

#[utoipa::path(
    get,
    path = "/customer-api/bills",
    responses(
        (status = 200, description = "Customer bills", body = Vec<CustomerBill>),
        (status = 401, description = "Invalid or expired token"),
    ),
    security(("bearer_auth" = [])),
    tag = "Customer API"
)]
pub async fn list_bills(
    auth: AuthCustomer,
    State(state): State<AppState>,
) -> Envelope<Vec<CustomerBill>> {
    let bills = sqlx::query_as::<_, CustomerBill>(
        r#"SELECT * FROM customer_bills
           WHERE customer_id = $1 AND tenant_id = $2
           ORDER BY billing_month DESC"#,
    )
    .bind(auth.id)
    .bind(auth.tenant_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(ApiResponse::ok(bills)))
}

async fn load_bill(state: &AppState, auth: &AuthCustomer, bill_id: Uuid) -> AppResult<CustomerBill> {
    sqlx::query_as::<_, CustomerBill>(
        "SELECT * FROM customer_bills WHERE id = $1 AND customer_id = $2 AND tenant_id = $3",
    )
    .bind(bill_id)
    .bind(auth.id)
    .bind(auth.tenant_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound("Bill not found".to_string()))
}

#[utoipa::path(
    get,
    path = "/customer-api/bills/{bill_id}",
    params(("bill_id" = Uuid, Path, description = "Bill ID")),
    responses(
        (status = 200, description = "Bill", body = CustomerBill),
        (status = 401, description = "Invalid or expired token"),
        (status = 404, description = "Bill not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Customer API"
)]
pub async fn get_bill(
    auth: AuthCustomer,
    State(state): State<AppState>,
    Path(bill_id): Path<Uuid>,
) -> Envelope<CustomerBill> {
    Ok(Json(ApiResponse::ok(load_bill(&state, &auth, bill_id).await?)))
}

#[utoipa::path(
    get,
    path = "/customer-api/payments",
    responses(
        (status = 200, description = "Payment history", body = Vec<Payment>),
        (status = 401, description = "Invalid or expired token"),
    ),
    security(("bearer_auth" = [])),
    tag = "Customer API"
)]
pub async fn list_payments(
    auth: AuthCustomer,
    State(state): State<AppState>,
) -> Envelope<Vec<Payment>> {
    let payments = sqlx::query_as::<_, Payment>(
        r#"SELECT * FROM payments
           WHERE customer_id = $1 AND tenant_id = $2
           ORDER BY created_at DESC"#,
    )
    .bind(auth.id)
    .bind(auth.tenant_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(ApiResponse::ok(payments)))
}

fn customer_payment(
    customer: &Customer,
    gateway: &str,
    amount: Decimal,
    invoice_id: Option<Uuid>,
    description: String,
    return_url: String,
    cancel_url: Option<String>,
) -> AppResult<NewPayment> {
    if return_url.trim().is_empty() {
        return Err(AppError::Validation("return_url is required".to_string()));
    }
    if amount <= Decimal::ZERO {
        return Err(AppError::Validation("Amount must be greater than zero".to_string()));
    }
    let gateway: GatewayKind = gateway.parse().map_err(AppError::Validation)?;

    Ok(NewPayment {
        gateway,
        amount,
        tenant_id: customer.tenant_id,
        payment_for: PaymentPurpose::CustomerBill,
        return_url,
        cancel_url,
        invoice_id,
        customer_id: Some(customer.id),
        description,
        customer_name: customer.name.clone(),
        customer_email: customer.email.clone().unwrap_or_default(),
        customer_phone: customer.phone.clone(),
    })
}

/// Pay the outstanding amount of a bill
#[utoipa::path(
    post,
    path = "/customer-api/payments/initiate",
    request_body = PayBillRequest,
    responses(
        (status = 200, description = "Checkout created", body = InitiatePaymentResponse),
        (status = 400, description = "Bill already paid, unconfigured gateway or provider error"),
        (status = 401, description = "Invalid or expired token"),
        (status = 404, description = "Bill not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Customer API"
)]
pub async fn initiate_bill_payment(
    auth: AuthCustomer,
    State(state): State<AppState>,
    Json(body): Json<PayBillRequest>,
) -> Envelope<InitiatePaymentResponse> {
    let customer = load_customer(&state, &auth).await?;
    let bill = load_bill(&state, &auth, body.bill_id).await?;

    if bill.status == BillStatus::Paid {
        return Err(AppError::BadRequest("Bill is already paid".to_string()));
    }

    let payment = customer_payment(
        &customer,
        &body.gateway,
        bill.amount - bill.paid_amount,
        Some(bill.id),
        format!("Internet bill {}", bill.billing_month),
        body.return_url,
        body.cancel_url,
    )?;

    let response = PaymentService::initiate(
        &state.db,
        &state.gateways,
        &state.config.payment_callback_url,
        payment,
    )
    .await?;

    Ok(Json(ApiResponse::ok(response)))
}

/// Top up the account with an arbitrary amount
#[utoipa::path(
    post,
    path = "/customer-api/recharge",
    request_body = RechargeRequest,
    responses(
        (status = 200, description = "Checkout created", body = InitiatePaymentResponse),
        (status = 400, description = "Invalid amount, unconfigured gateway or provider error"),
        (status = 401, description = "Invalid or expired token"),
    ),
    security(("bearer_auth" = [])),
    tag = "Customer API"
)]
pub async fn recharge(
    auth: AuthCustomer,
    State(state): State<AppState>,
    Json(body): Json<RechargeRequest>,
) -> Envelope<InitiatePaymentResponse> {
    let customer = load_customer(&state, &auth).await?;

    let payment = customer_payment(
        &customer,
        &body.gateway,
        body.amount,
        None,
        "Account recharge".to_string(),
        body.return_url,
        body.cancel_url,
    )?;

    let response = PaymentService::initiate(
        &state.db,
        &state.gateways,
        &state.config.payment_callback_url,
        payment,
    )
    .await?;

    Ok(Json(ApiResponse::ok(response)))
}

// ─── Device control ───────────────────────────────────────────────────────────

async fn queue_device_action(
    state: &AppState,
    auth: &AuthCustomer,
    action: &str,
    message: &str,
) -> Envelope<DeviceAction> {
    load_customer(state, auth).await?;

    let queued = sqlx::query_as::<_, DeviceAction>(
        r#"INSERT INTO device_actions (id, tenant_id, customer_id, action, status, created_at)
           VALUES ($1, $2, $3, $4, 'queued', NOW())
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(auth.tenant_id)
    .bind(auth.id)
    .bind(action)
    .fetch_one(&state.db)
    .await?;

    info!("Customer {} queued {}", auth.id, action);
    Ok(Json(ApiResponse::with_message(queued, message)))
}

#[utoipa::path(
    post,
    path = "/customer-api/device/reboot-router",
    responses(
        (status = 200, description = "Reboot queued", body = DeviceAction),
        (status = 401, description = "Invalid or expired token"),
    ),
    security(("bearer_auth" = [])),
    tag = "Customer API"
)]
pub async fn reboot_router(
    auth: AuthCustomer,
    State(state): State<AppState>,
) -> Envelope<DeviceAction> {
    queue_device_action(&state, &auth, "reboot_router", "Router reboot requested").await
}

#[utoipa::path(
    post,
    path = "/customer-api/device/reboot-onu",
    responses(
        (status = 200, description = "Reboot queued", body = DeviceAction),
        (status = 401, description = "Invalid or expired token"),
    ),
    security(("bearer_auth" = [])),
    tag = "Customer API"
)]
pub async fn reboot_onu(auth: AuthCustomer, State(state): State<AppState>) -> Envelope<DeviceAction> {
    queue_device_action(&state, &auth, "reboot_onu", "ONU reboot requested").await
}

#[utoipa::path(
    post,
    path = "/customer-api/device/disconnect",
    responses(
        (status = 200, description = "Disconnect queued", body = DeviceAction),
        (status = 401, description = "Invalid or expired token"),
    ),
    security(("bearer_auth" = [])),
    tag = "Customer API"
)]
pub async fn disconnect(auth: AuthCustomer, State(state): State<AppState>) -> Envelope<DeviceAction> {
    queue_device_action(&state, &auth, "disconnect", "Disconnect requested").await
}

// ─── Packages ─────────────────────────────────────────────────────────────────

#[utoipa::path(
    get,
    path = "/customer-api/packages",
    responses(
        (status = 200, description = "Packages on offer", body = Vec<Package>),
        (status = 401, description = "Invalid or expired token"),
    ),
    security(("bearer_auth" = [])),
    tag = "Customer API"
)]
pub async fn list_packages(
    auth: AuthCustomer,
    State(state): State<AppState>,
) -> Envelope<Vec<Package>> {
    let packages = sqlx::query_as::<_, Package>(
        "SELECT * FROM packages WHERE tenant_id = $1 AND is_active = true ORDER BY price",
    )
    .bind(auth.tenant_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(ApiResponse::ok(packages)))
}

#[utoipa::path(
    post,
    path = "/customer-api/packages/change",
    request_body = ChangePackageRequest,
    responses(
        (status = 200, description = "Package changed", body = Customer),
        (status = 401, description = "Invalid or expired token"),
        (status = 404, description = "Package not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Customer API"
)]
pub async fn change_package(
    auth: AuthCustomer,
    State(state): State<AppState>,
    Json(body): Json<ChangePackageRequest>,
) -> Envelope<Customer> {
    let package = sqlx::query_as::<_, Package>(
        "SELECT * FROM packages WHERE id = $1 AND tenant_id = $2 AND is_active = true",
    )
    .bind(body.package_id)
    .bind(auth.tenant_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound("Package not found".to_string()))?;

    let customer = sqlx::query_as::<_, Customer>(
        r#"UPDATE customers SET package_id = $1, updated_at = NOW()
           WHERE id = $2 AND tenant_id = $3
           RETURNING *"#,
    )
    .bind(package.id)
    .bind(auth.id)
    .bind(auth.tenant_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound("Customer not found".to_string()))?;

    info!("Customer {} moved to package {}", customer.id, package.name);
    Ok(Json(ApiResponse::with_message(
        customer,
        format!("Package changed to {}", package.name),
    )))
}

// ─── Support ──────────────────────────────────────────────────────────────────

#[utoipa::path(
    get,
    path = "/customer-api/support/tickets",
    responses(
        (status = 200, description = "Support tickets", body = Vec<SupportTicket>),
        (status = 401, description = "Invalid or expired token"),
    ),
    security(("bearer_auth" = [])),
    tag = "Customer API"
)]
pub async fn list_tickets(
    auth: AuthCustomer,
    State(state): State<AppState>,
) -> Envelope<Vec<SupportTicket>> {
    let tickets = sqlx::query_as::<_, SupportTicket>(
        r#"SELECT * FROM support_tickets
           WHERE customer_id = $1 AND tenant_id = $2
           ORDER BY created_at DESC"#,
    )
    .bind(auth.id)
    .bind(auth.tenant_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(ApiResponse::ok(tickets)))
}

#[utoipa::path(
    post,
    path = "/customer-api/support/tickets",
    request_body = CreateTicketRequest,
    responses(
        (status = 200, description = "Ticket opened", body = SupportTicket),
        (status = 400, description = "Subject or description missing"),
        (status = 401, description = "Invalid or expired token"),
    ),
    security(("bearer_auth" = [])),
    tag = "Customer API"
)]
pub async fn create_ticket(
    auth: AuthCustomer,
    State(state): State<AppState>,
    Json(body): Json<CreateTicketRequest>,
) -> Envelope<SupportTicket> {
    if body.subject.trim().is_empty() || body.description.trim().is_empty() {
        return Err(AppError::Validation(
            "Subject and description are required".to_string(),
        ));
    }

    let ticket = sqlx::query_as::<_, SupportTicket>(
        r#"INSERT INTO support_tickets (id, tenant_id, customer_id, subject, description, category, priority, status, created_at)
           VALUES ($1, $2, $3, $4, $5, $6, $7, 'open', NOW())
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(auth.tenant_id)
    .bind(auth.id)
    .bind(body.subject.trim())
    .bind(body.description.trim())
    .bind(body.category.as_deref().unwrap_or("general"))
    .bind(body.priority.as_deref().unwrap_or("normal"))
    .fetch_one(&state.db)
    .await?;

    Ok(Json(ApiResponse::with_message(ticket, "Ticket created")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn tenant_header_is_required_and_must_be_a_uuid() {
        let mut headers = HeaderMap::new();
        assert!(matches!(tenant_from_headers(&headers), Err(AppError::Validation(_))));

        headers.insert("x-tenant-id", HeaderValue::from_static("acme"));
        assert!(matches!(tenant_from_headers(&headers), Err(AppError::Validation(_))));

        let id = Uuid::new_v4();
        headers.insert("x-tenant-id", HeaderValue::from_str(&id.to_string()).unwrap());
        assert_eq!(tenant_from_headers(&headers).unwrap(), id);
    }

    fn customer() -> Customer {
        Customer {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            customer_code: "C-1001".to_string(),
            name: "Rahim Uddin".to_string(),
            phone: "01711000000".to_string(),
            email: None,
            address: None,
            password_hash: String::new(),
            package_id: None,
            pppoe_username: None,
            status: "active".to_string(),
            expiry_date: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn customer_payments_are_bill_payments_for_the_token_tenant() {
        let c = customer();
        let payment = customer_payment(
            &c,
            "sslcommerz",
            Decimal::new(80000, 2),
            None,
            "Account recharge".to_string(),
            "https://portal/return".to_string(),
            None,
        )
        .unwrap();

        assert_eq!(payment.tenant_id, c.tenant_id);
        assert_eq!(payment.customer_id, Some(c.id));
        assert_eq!(payment.payment_for, PaymentPurpose::CustomerBill);
        assert_eq!(payment.customer_email, "");
    }

    #[test]
    fn customer_payment_rejects_zero_amount() {
        let err = customer_payment(
            &customer(),
            "manual",
            Decimal::ZERO,
            None,
            String::new(),
            "https://portal/return".to_string(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
