use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub code: String,
    pub name: String,
    pub category: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub reorder_level: i32,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn stock_value(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }

    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.reorder_level
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub code: String,
    pub name: String,
    pub category: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub reorder_level: Option<i32>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LabelQuery {
    /// Labels printed per product, default 1
    pub copies: Option<usize>,
}
