/// Product model
///
/// Prices are `NUMERIC(12, 2)` in the database and decimal strings on the
/// wire. Non-admin callers only ever see rows with `is_active = true`.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE products (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     category_id UUID NOT NULL REFERENCES categories(id),
///     name VARCHAR(255) NOT NULL,
///     description TEXT,
///     price NUMERIC(12, 2) NOT NULL CHECK (price >= 0),
///     stock INTEGER NOT NULL DEFAULT 0 CHECK (stock >= 0),
///     image_url VARCHAR(2048),
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Largest price that fits `NUMERIC(12, 2)`
pub fn max_price() -> Decimal {
    Decimal::new(999_999_999_999, 2)
}

/// Product row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating or replacing a product
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProductInput {
    pub category_id: Uuid,

    #[validate(length(min = 1, max = 255, message = "name must be between 1 and 255 characters"))]
    pub name: String,

    #[validate(length(max = 2000, message = "description must be at most 2000 characters"))]
    pub description: Option<String>,

    pub price: Decimal,

    #[validate(range(min = 0, message = "stock cannot be negative"))]
    pub stock: i32,

    #[validate(length(max = 2048, message = "image_url must be at most 2048 characters"))]
    pub image_url: Option<String>,

    /// Defaults to active when omitted
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl ProductInput {
    /// Checks the fields the derive cannot express
    pub fn check_price_and_category(&self) -> Result<(), &'static str> {
        if self.category_id.is_nil() {
            return Err("category_id is required");
        }
        if self.price.is_sign_negative() {
            return Err("price cannot be negative");
        }
        if self.price.round_dp(2) > max_price() {
            return Err("price is too large");
        }
        Ok(())
    }

    /// Price rounded to cents, the way it is stored
    pub fn normalized_price(&self) -> Decimal {
        self.price.round_dp(2)
    }

    pub fn active(&self) -> bool {
        self.is_active.unwrap_or(true)
    }
}

/// Optional criteria for product search
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductFilter {
    pub category_id: Option<Uuid>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,

    /// Case-insensitive substring of the product name
    pub search: Option<String>,

    /// Only products with stock > 0
    pub in_stock: Option<bool>,
}

impl ProductFilter {
    /// Returns true when `product` satisfies every criterion that is set
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(category_id) = self.category_id {
            if product.category_id != category_id {
                return false;
            }
        }
        if let Some(min) = self.min_price {
            if product.price < min {
                return false;
            }
        }
        if let Some(max) = self.max_price {
            if product.price > max {
                return false;
            }
        }
        if let Some(ref search) = self.search {
            if !product.name.to_lowercase().contains(&search.to_lowercase()) {
                return false;
            }
        }
        if self.in_stock == Some(true) && product.stock <= 0 {
            return false;
        }
        true
    }
}
