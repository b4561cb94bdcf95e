// src/services/fixtures.rs
//
// Seed rows for tests that run against a migrated database.

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

pub async fn tenant(db: &PgPool) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO tenants (id, name, email, password_hash) VALUES ($1, $2, $3, 'x')")
        .bind(id)
        .bind(format!("ISP {}", &id.to_string()[..8]))
        .bind(format!("{id}@isp.test"))
        .execute(db)
        .await
        .unwrap();
    id
}

pub async fn staff(db: &PgPool, tenant_id: Uuid, salary: Decimal) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO staff (id, tenant_id, name, salary, join_date) VALUES ($1, $2, 'Rahim', $3, '2023-01-01')",
    )
    .bind(id)
    .bind(tenant_id)
    .bind(salary)
    .execute(db)
    .await
    .unwrap();
    id
}

pub async fn leave_type(db: &PgPool, tenant_id: Uuid) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO leave_types (id, tenant_id, name, max_days_per_year) VALUES ($1, $2, 'Annual', 14)",
    )
    .bind(id)
    .bind(tenant_id)
    .execute(db)
    .await
    .unwrap();
    id
}

pub async fn approved_loan(
    db: &PgPool,
    tenant_id: Uuid,
    staff_id: Uuid,
    remaining: Decimal,
    monthly: Decimal,
) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"INSERT INTO staff_loans
           (id, tenant_id, staff_id, loan_type, amount, remaining_amount, monthly_deduction, status, approved_at)
           VALUES ($1, $2, $3, 'loan', $4, $4, $5, 'approved', NOW())"#,
    )
    .bind(id)
    .bind(tenant_id)
    .bind(staff_id)
    .bind(remaining)
    .bind(monthly)
    .execute(db)
    .await
    .unwrap();
    id
}

pub async fn customer(db: &PgPool, tenant_id: Uuid) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"INSERT INTO customers (id, tenant_id, customer_code, name, phone, password_hash)
           VALUES ($1, $2, $3, 'Karim', $4, 'x')"#,
    )
    .bind(id)
    .bind(tenant_id)
    .bind(format!("C-{}", &id.simple().to_string()[..6]))
    .bind(format!("017{}", &id.simple().to_string()[..8]))
    .execute(db)
    .await
    .unwrap();
    id
}

pub async fn bill(db: &PgPool, tenant_id: Uuid, customer_id: Uuid, amount: Decimal) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"INSERT INTO customer_bills (id, tenant_id, customer_id, billing_month, amount, due_date)
           VALUES ($1, $2, $3, '2024-04', $4, '2024-04-10')"#,
    )
    .bind(id)
    .bind(tenant_id)
    .bind(customer_id)
    .bind(amount)
    .execute(db)
    .await
    .unwrap();
    id
}
