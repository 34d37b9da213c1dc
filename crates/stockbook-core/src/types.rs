//! # Domain Types
//!
//! Core records used throughout Stockbook.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │  ReturnRecord   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │◄──│  lines[]        │◄──│  sale_id        │       │
//! │  │  sku (optional) │   │  total_amount   │   │  product_id     │       │
//! │  │  sale_price     │   │  status         │   │  quantity       │       │
//! │  │  quantity ≥ 0   │   │  created_by     │   │  refund_amount  │       │
//! │  │  version (CAS)  │   └─────────────────┘   └─────────────────┘       │
//! │  └─────────────────┘                                                    │
//! │          ▲                                                              │
//! │          │            ┌─────────────────┐                               │
//! │          └────────────│  StockLogEntry  │  (see movement.rs)            │
//! │                       └─────────────────┘                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Every record has a UUID v4 `id` generated by the engine. Products may also
//! carry a human-facing SKU.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Actor
// =============================================================================

/// The already-authenticated user performing a movement.
///
/// Passed explicitly to every engine operation and recorded on the
/// resulting records (`created_by`, `performed_by`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> Self {
        ActorId(id.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Product
// =============================================================================

/// Default `low_stock_alert` threshold for new products.
pub const DEFAULT_LOW_STOCK_ALERT: i64 = 5;

/// A product in the catalog.
///
/// `quantity` is written only by the movement engine. Catalog management may
/// change everything else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - optional, unique when present.
    pub sku: Option<String>,

    /// Display name.
    pub name: String,

    /// Cost in cents.
    pub purchase_price_cents: i64,

    /// Current selling price in cents. Copied into sale lines at sale time.
    pub sale_price_cents: i64,

    /// Units on hand. Never negative.
    pub quantity: i64,

    /// Informational threshold for low-stock listings.
    pub low_stock_alert: i64,

    /// Bumped on every write; compare-and-swap key for quantity updates.
    pub version: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the current selling price.
    #[inline]
    pub fn sale_price(&self) -> Money {
        Money::from_cents(self.sale_price_cents)
    }

    /// Returns the purchase price.
    #[inline]
    pub fn purchase_price(&self) -> Money {
        Money::from_cents(self.purchase_price_cents)
    }

    /// Whether `quantity` units can be taken out of stock.
    #[inline]
    pub fn can_supply(&self, quantity: i64) -> bool {
        self.quantity >= quantity
    }

    /// Whether stock has fallen to or below the alert threshold.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.low_stock_alert
    }

    /// Label used in error messages: name, plus SKU when there is one.
    pub fn label(&self) -> String {
        match &self.sku {
            Some(sku) => format!("{} ({})", self.name, sku),
            None => self.name.clone(),
        }
    }
}

/// Catalog data for registering a product.
///
/// `opening_quantity` becomes the first ledger entry for the product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub sku: Option<String>,
    pub name: String,
    pub purchase_price_cents: i64,
    pub sale_price_cents: i64,
    pub opening_quantity: i64,
    pub low_stock_alert: Option<i64>,
}

impl NewProduct {
    /// A product with the given name and sale price, no stock and no SKU.
    pub fn new(name: impl Into<String>, sale_price_cents: i64) -> Self {
        NewProduct {
            sku: None,
            name: name.into(),
            purchase_price_cents: 0,
            sale_price_cents,
            opening_quantity: 0,
            low_stock_alert: None,
        }
    }

    pub fn sku(mut self, sku: impl Into<String>) -> Self {
        self.sku = Some(sku.into());
        self
    }

    pub fn purchase_price_cents(mut self, cents: i64) -> Self {
        self.purchase_price_cents = cents;
        self
    }

    pub fn opening_quantity(mut self, quantity: i64) -> Self {
        self.opening_quantity = quantity;
        self
    }

    pub fn low_stock_alert(mut self, threshold: i64) -> Self {
        self.low_stock_alert = Some(threshold);
        self
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A customer a sale can be billed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub balance_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Sale Status
// =============================================================================

/// The status of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    /// Stock has been taken out; the normal state of every created sale.
    Completed,
    /// Sale was cancelled; no further returns are accepted against it.
    Cancelled,
}

impl Default for SaleStatus {
    fn default() -> Self {
        SaleStatus::Completed
    }
}

impl fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaleStatus::Completed => f.write_str("completed"),
            SaleStatus::Cancelled => f.write_str("cancelled"),
        }
    }
}

// =============================================================================
// Sale
// =============================================================================

/// One requested line of a new sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleLineRequest {
    pub product_id: String,
    pub quantity: i64,
}

impl SaleLineRequest {
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        SaleLineRequest {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// A completed or cancelled sale.
///
/// Lines and prices are immutable once created; returns adjust stock, never
/// the sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub customer_id: String,
    /// Always Σ line.subtotal_cents.
    pub total_amount_cents: i64,
    pub status: SaleStatus,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    /// Lines in the order they were supplied.
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub lines: Vec<SaleLine>,
}

impl Sale {
    #[inline]
    pub fn total_amount(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }

    /// Total quantity of `product_id` sold on this sale, across all lines.
    pub fn quantity_sold(&self, product_id: &str) -> i64 {
        self.lines
            .iter()
            .filter(|line| line.product_id == product_id)
            .map(|line| line.quantity)
            .sum()
    }

    /// Whether any line references `product_id`.
    pub fn contains_product(&self, product_id: &str) -> bool {
        self.lines.iter().any(|line| line.product_id == product_id)
    }
}

/// A line item in a sale.
/// Uses the snapshot pattern: the price is frozen at sale time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleLine {
    pub id: String,
    pub sale_id: String,
    /// Zero-based position in the request.
    pub line_no: i64,
    pub product_id: String,
    pub quantity: i64,
    /// Product sale price at the moment the sale was created.
    pub price_at_sale_cents: i64,
    /// price_at_sale × quantity.
    pub subtotal_cents: i64,
}

impl SaleLine {
    #[inline]
    pub fn price_at_sale(&self) -> Money {
        Money::from_cents(self.price_at_sale_cents)
    }

    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }
}

// =============================================================================
// Returns
// =============================================================================

/// Request to return units of one product from one sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewReturn {
    pub sale_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub refund_amount_cents: i64,
    pub reason: Option<String>,
}

impl NewReturn {
    pub fn new(
        sale_id: impl Into<String>,
        product_id: impl Into<String>,
        quantity: i64,
        refund_amount_cents: i64,
    ) -> Self {
        NewReturn {
            sale_id: sale_id.into(),
            product_id: product_id.into(),
            quantity,
            refund_amount_cents,
            reason: None,
        }
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// The reason as stored: trimmed, with blank treated as absent.
    pub fn normalized_reason(&self) -> Option<String> {
        self.reason
            .as_deref()
            .map(str::trim)
            .filter(|reason| !reason.is_empty())
            .map(str::to_string)
    }
}

/// A recorded return. Deleting one reverses its stock effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ReturnRecord {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub refund_amount_cents: i64,
    pub reason: Option<String>,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl ReturnRecord {
    #[inline]
    pub fn refund_amount(&self) -> Money {
        Money::from_cents(self.refund_amount_cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
