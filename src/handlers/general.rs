// src/handlers/general.rs

use crate::state::AppState;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
};
use serde_json::json;

/// HTML landing page with links to the docs and the main routes
pub async fn root_handler() -> impl IntoResponse {
    Html(r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0"/>
  <title>ISP Back-Office API</title>
  <style>
    * { box-sizing: border-box; margin: 0; padding: 0; }
    body { font-family: 'Segoe UI', system-ui, sans-serif; background: #0f172a; color: #e2e8f0; min-height: 100vh; padding: 40px 20px; }
    .container { max-width: 860px; margin: 0 auto; }
    header { text-align: center; margin-bottom: 48px; }
    header h1 { font-size: 2.8rem; font-weight: 800; background: linear-gradient(135deg, #3b82f6, #8b5cf6); -webkit-background-clip: text; -webkit-text-fill-color: transparent; margin-bottom: 8px; }
    header p { color: #94a3b8; font-size: 1.1rem; }
    .badge { display: inline-block; background: #1e293b; border: 1px solid #334155; color: #38bdf8; padding: 4px 12px; border-radius: 20px; font-size: 0.8rem; margin-top: 12px; }
    .grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(260px, 1fr)); gap: 16px; margin-bottom: 32px; }
    .card { background: #1e293b; border: 1px solid #334155; border-radius: 12px; padding: 20px; transition: border-color 0.2s; }
    .card:hover { border-color: #3b82f6; }
    .card h3 { font-size: 1rem; font-weight: 600; color: #f1f5f9; margin-bottom: 6px; display: flex; align-items: center; gap: 8px; }
    .card p { font-size: 0.875rem; color: #94a3b8; line-height: 1.5; }
    .card a { color: #38bdf8; text-decoration: none; font-weight: 500; display: inline-block; margin-top: 8px; font-size: 0.875rem; }
    .card a:hover { text-decoration: underline; }
    .routes { background: #1e293b; border: 1px solid #334155; border-radius: 12px; padding: 24px; }
    .routes h2 { font-size: 1.2rem; font-weight: 700; color: #f1f5f9; margin-bottom: 16px; }
    .route-group { margin-bottom: 20px; }
    .route-group h4 { font-size: 0.8rem; font-weight: 600; text-transform: uppercase; letter-spacing: 0.1em; color: #64748b; margin-bottom: 8px; }
    .route-item { display: flex; align-items: flex-start; gap: 12px; padding: 8px 0; border-bottom: 1px solid #0f172a; }
    .route-item:last-child { border-bottom: none; }
    .method { font-size: 0.7rem; font-weight: 700; padding: 2px 8px; border-radius: 4px; min-width: 52px; text-align: center; font-family: monospace; }
    .get { background: #064e3b; color: #34d399; }
    .post { background: #1e3a5f; color: #60a5fa; }
    .put, .patch { background: #451a03; color: #fb923c; }
    .delete { background: #4c0519; color: #fb7185; }
    .route-path { font-family: monospace; font-size: 0.85rem; color: #e2e8f0; flex: 1; }
    .route-desc { font-size: 0.8rem; color: #64748b; }
    footer { text-align: center; margin-top: 40px; color: #475569; font-size: 0.85rem; }
  </style>
</head>
<body>
<div class="container">
  <header>
    <h1>📡 ISP Back-Office API</h1>
    <p>Staff payroll, leave, subscriber billing and payment gateways for internet service providers</p>
    <span class="badge">v1.0.0 · REST API · JSON</span>
  </header>

  <div class="grid">
    <div class="card">
      <h3>📖 API Documentation</h3>
      <p>Interactive Swagger UI with every endpoint and request/response schema.</p>
      <a href="/docs">Open Swagger UI →</a>
    </div>
    <div class="card">
      <h3>❤️ Health Check</h3>
      <p>Confirm the service is running and the database is reachable.</p>
      <a href="/health">GET /health →</a>
    </div>
    <div class="card">
      <h3>💳 Payment Gateways</h3>
      <p>SSLCommerz, shurjoPay, UddoktaPay, aamarPay, PipraPay, bKash and manual collection, configured per tenant.</p>
    </div>
    <div class="card">
      <h3>👤 Customer Portal</h3>
      <p>Subscribers log in under <code>/customer-api</code> to see bills, pay, open tickets and reboot devices.</p>
    </div>
  </div>

  <div class="routes">
    <h2>🗺️ Main Routes</h2>

    <div class="route-group">
      <h4>Tenants</h4>
      <div class="route-item"><span class="method post">POST</span><span class="route-path">/api/v1/tenants/register</span><span class="route-desc">Register an ISP</span></div>
      <div class="route-item"><span class="method post">POST</span><span class="route-path">/api/v1/tenants/login</span><span class="route-desc">Login and get an admin token</span></div>
    </div>

    <div class="route-group">
      <h4>Staff &amp; HR</h4>
      <div class="route-item"><span class="method post">POST</span><span class="route-path">/api/v1/staff</span><span class="route-desc">Add a staff member</span></div>
      <div class="route-item"><span class="method put">PUT</span><span class="route-path">/api/v1/attendance</span><span class="route-desc">Mark attendance for a day</span></div>
      <div class="route-item"><span class="method post">POST</span><span class="route-path">/api/v1/leave/requests</span><span class="route-desc">Submit a leave request</span></div>
      <div class="route-item"><span class="method post">POST</span><span class="route-path">/api/v1/loans</span><span class="route-desc">Record a staff loan or advance</span></div>
    </div>

    <div class="route-group">
      <h4>Payroll</h4>
      <div class="route-item"><span class="method get">GET</span><span class="route-path">/api/v1/payroll/preview/{staff_id}</span><span class="route-desc">Preview one salary</span></div>
      <div class="route-item"><span class="method post">POST</span><span class="route-path">/api/v1/payroll/run</span><span class="route-desc">Process payroll for a month</span></div>
      <div class="route-item"><span class="method post">POST</span><span class="route-path">/api/v1/payroll/salaries/{payment_id}/pay</span><span class="route-desc">Mark paid and email the payslip</span></div>
    </div>

    <div class="route-group">
      <h4>Payments</h4>
      <div class="route-item"><span class="method post">POST</span><span class="route-path">/api/v1/initiate-payment</span><span class="route-desc">Open a checkout with a gateway</span></div>
      <div class="route-item"><span class="method put">PUT</span><span class="route-path">/api/v1/payment-gateways/{gateway}</span><span class="route-desc">Configure a gateway</span></div>
    </div>

    <div class="route-group">
      <h4>Network &amp; Inventory</h4>
      <div class="route-item"><span class="method get">GET</span><span class="route-path">/api/v1/onu-devices/export</span><span class="route-desc">Download ONU devices as CSV</span></div>
      <div class="route-item"><span class="method get">GET</span><span class="route-path">/api/v1/inventory/report</span><span class="route-desc">Printable inventory summary</span></div>
      <div class="route-item"><span class="method get">GET</span><span class="route-path">/api/v1/inventory/labels</span><span class="route-desc">Printable product labels</span></div>
    </div>
  </div>

  <footer>
    <p>Built with 🦀 Rust · Axum · SQLx · reqwest · lettre</p>
  </footer>
</div>
</body>
</html>"#)
}

/// Health check endpoint
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    match sqlx::query("SELECT 1").fetch_one(&state.db).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "database": "connected",
                "service": "isp-backoffice",
                "version": "1.0.0"
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "unhealthy",
                "database": "disconnected",
                "error": e.to_string()
            })),
        ),
    }
}