// src/routes/mod.rs

use crate::{
    handlers::{
        attendance::{list_attendance, mark_attendance},
        customer_api,
        customers::{
            create_bill, create_customer, create_package, list_customer_bills, list_customers,
            list_packages,
        },
        devices::{export_onu_devices, list_onu_devices},
        inventory::{create_product, inventory_report, list_products, product_labels},
        leave::{
            allocate_leave_balance, approve_leave_request, cancel_leave_request,
            create_leave_type, deactivate_leave_type, list_leave_balances, list_leave_requests,
            list_leave_types, reject_leave_request, submit_leave_request,
        },
        loans::{approve_loan, create_loan, list_loans, reject_loan},
        payments::{
            confirm_manual_payment, initiate_payment, list_gateway_configs, list_payments,
            upsert_gateway_config,
        },
        payroll::{
            get_payroll_run, list_payroll_runs, list_salary_payments, mark_salary_paid,
            preview_salary, run_payroll,
        },
        staff::{create_staff, deactivate_staff, get_staff, list_staff, update_staff},
        tenant::{get_tenant_profile, login_tenant, register_tenant},
    },
    state::AppState,
};
use axum::{
    Router,
    routing::{delete, get, post, put},
};

/// Tenant administration API, nested under `/api/v1`.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // ─── Tenants ──────────────────────────────────────────
        .route("/tenants/register", post(register_tenant))
        .route("/tenants/login", post(login_tenant))
        .route("/tenants/me", get(get_tenant_profile))
        // ─── Staff ────────────────────────────────────────────
        .route("/staff", post(create_staff).get(list_staff))
        .route(
            "/staff/{staff_id}",
            get(get_staff).patch(update_staff).delete(deactivate_staff),
        )
        .route("/attendance", put(mark_attendance).get(list_attendance))
        // ─── Leave ────────────────────────────────────────────
        .route("/leave/types", post(create_leave_type).get(list_leave_types))
        .route("/leave/types/{leave_type_id}", delete(deactivate_leave_type))
        .route(
            "/leave/balances",
            put(allocate_leave_balance).get(list_leave_balances),
        )
        .route(
            "/leave/requests",
            post(submit_leave_request).get(list_leave_requests),
        )
        .route(
            "/leave/requests/{request_id}/approve",
            post(approve_leave_request),
        )
        .route("/leave/requests/{request_id}/reject", post(reject_leave_request))
        .route("/leave/requests/{request_id}/cancel", post(cancel_leave_request))
        // ─── Loans ────────────────────────────────────────────
        .route("/loans", post(create_loan).get(list_loans))
        .route("/loans/{loan_id}/approve", post(approve_loan))
        .route("/loans/{loan_id}/reject", post(reject_loan))
        // ─── Payroll ──────────────────────────────────────────
        .route("/payroll/preview/{staff_id}", get(preview_salary))
        .route("/payroll/run", post(run_payroll))
        .route("/payroll/runs", get(list_payroll_runs))
        .route("/payroll/runs/{month}", get(get_payroll_run))
        .route("/payroll/salaries", get(list_salary_payments))
        .route("/payroll/salaries/{payment_id}/pay", post(mark_salary_paid))
        // ─── Payments ─────────────────────────────────────────
        .route("/initiate-payment", post(initiate_payment))
        .route("/payment-gateways", get(list_gateway_configs))
        .route("/payment-gateways/{gateway}", put(upsert_gateway_config))
        .route("/payments", get(list_payments))
        .route("/payments/{payment_id}/confirm", post(confirm_manual_payment))
        // ─── Subscribers ──────────────────────────────────────
        .route("/packages", post(create_package).get(list_packages))
        .route("/customers", post(create_customer).get(list_customers))
        .route(
            "/customers/{customer_id}/bills",
            post(create_bill).get(list_customer_bills),
        )
        // ─── Network & inventory ──────────────────────────────
        .route("/onu-devices", get(list_onu_devices))
        .route("/onu-devices/export", get(export_onu_devices))
        .route("/products", post(create_product).get(list_products))
        .route("/inventory/report", get(inventory_report))
        .route("/inventory/labels", get(product_labels))
}

/// Subscriber-facing API, nested under `/customer-api`.
pub fn customer_api_routes() -> Router<AppState> {
    use customer_api::*;

    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/verify", post(verify_token))
        .route("/profile", get(get_profile).put(update_profile))
        .route("/network/status", get(network_status))
        .route("/network/bandwidth", get(bandwidth))
        .route("/bills", get(list_bills))
        .route("/bills/{bill_id}", get(get_bill))
        .route("/payments", get(customer_api::list_payments))
        .route("/payments/initiate", post(initiate_bill_payment))
        .route("/recharge", post(recharge))
        .route("/device/reboot-router", post(reboot_router))
        .route("/device/reboot-onu", post(reboot_onu))
        .route("/device/disconnect", post(disconnect))
        .route("/packages", get(customer_api::list_packages))
        .route("/packages/change", post(change_package))
        .route("/support/tickets", get(list_tickets).post(create_ticket))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::generate_customer_token, config::Config};
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode, header},
    };
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn app() -> Router {
        let config = Config::for_tests();
        let db = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap();
        let state = AppState::new(db, config).unwrap();

        Router::new()
            .nest("/api/v1", api_routes())
            .nest("/customer-api", customer_api_routes())
            .with_state(state)
    }

    const CUSTOMER_ENDPOINTS: [(&str, &str); 16] = [
        ("GET", "/customer-api/profile"),
        ("PUT", "/customer-api/profile"),
        ("GET", "/customer-api/network/status"),
        ("GET", "/customer-api/network/bandwidth"),
        ("GET", "/customer-api/bills"),
        ("GET", "/customer-api/bills/00000000-0000-0000-0000-000000000001"),
        ("GET", "/customer-api/payments"),
        ("POST", "/customer-api/payments/initiate"),
        ("POST", "/customer-api/recharge"),
        ("POST", "/customer-api/device/reboot-router"),
        ("POST", "/customer-api/device/reboot-onu"),
        ("POST", "/customer-api/device/disconnect"),
        ("GET", "/customer-api/packages"),
        ("POST", "/customer-api/packages/change"),
        ("GET", "/customer-api/support/tickets"),
        ("POST", "/customer-api/support/tickets"),
    ];

    #[tokio::test]
    async fn expired_customer_token_is_rejected_everywhere() {
        let config = Config::for_tests();
        let expired =
            generate_customer_token(Uuid::new_v4(), Uuid::new_v4(), &config.jwt_secret, -2)
                .unwrap();
        let app = app();

        for (method, uri) in CUSTOMER_ENDPOINTS {
            let request = Request::builder()
                .method(Method::from_bytes(method.as_bytes()).unwrap())
                .uri(uri)
                .header(header::AUTHORIZATION, format!("Bearer {expired}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))
                .unwrap();

            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");

            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(body["success"], false, "{method} {uri}");
        }
    }

    #[tokio::test]
    async fn customer_token_cannot_reach_admin_routes() {
        let config = Config::for_tests();
        let token =
            generate_customer_token(Uuid::new_v4(), Uuid::new_v4(), &config.jwt_secret, 1)
                .unwrap();

        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/staff")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn admin_routes_require_a_token() {
        for uri in ["/api/v1/staff", "/api/v1/payroll/runs", "/api/v1/onu-devices/export"] {
            let response = app()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }
    }

    #[tokio::test]
    async fn customer_login_requires_tenant_header() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/customer-api/auth/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"phone":"01711000000","password":"secret1"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn initiate_payment_reports_missing_fields() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/v1/initiate-payment")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"gateway":"sslcommerz"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let error = body["error"].as_str().unwrap();
        assert!(error.contains("Missing required fields"));
        assert!(error.contains("amount"));
    }
}
