//! # Sale Reservation
//!
//! In-memory "reserve all, then commit all" planning for a multi-line sale.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  createSale(lines)                                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  for line in lines (request order):                                     │
//! │       read product ──► reservation.reserve(product, qty)  ← THIS MODULE │
//! │                          • validates qty ≥ 1                            │
//! │                          • available = on hand − already reserved       │
//! │                          • freezes price_at_sale                        │
//! │       │                                                                 │
//! │       ├── any error? → drop reservation, nothing was written            │
//! │       ▼                                                                 │
//! │  reservation.holds()  ──► one CAS write per distinct product            │
//! │  reservation.lines()  ──► sale lines + one OUT ledger entry each        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A product that appears on several lines gets a single hold for the sum of
//! its lines, checked against the quantity read once for that product.

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::Product;
use crate::validation::validate_quantity;

/// A priced line accepted into the reservation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservedLine {
    pub product_id: String,
    pub quantity: i64,
    pub price_at_sale: Money,
    pub subtotal: Money,
}

/// Stock held back from one product for the whole sale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockHold {
    pub product_id: String,
    /// Product version observed when the hold was first taken.
    pub expected_version: i64,
    /// Quantity on hand at that read.
    pub on_hand: i64,
    /// Total units reserved across all lines for this product.
    pub reserved: i64,
}

impl StockHold {
    /// Units still available to later lines.
    #[inline]
    pub fn available(&self) -> i64 {
        self.on_hand - self.reserved
    }
}

/// Accumulates lines for a sale before anything is persisted.
#[derive(Debug, Clone, Default)]
pub struct SaleReservation {
    lines: Vec<ReservedLine>,
    holds: Vec<StockHold>,
}

impl SaleReservation {
    pub fn new() -> Self {
        SaleReservation::default()
    }

    /// Reserves `quantity` units of `product` at its current sale price.
    ///
    /// ## Errors
    /// - `Validation` if `quantity` is not positive or the subtotal overflows
    /// - `InsufficientStock` if fewer than `quantity` units remain after the
    ///   lines already reserved for the same product
    pub fn reserve(&mut self, product: &Product, quantity: i64) -> CoreResult<&ReservedLine> {
        validate_quantity(quantity)?;

        let hold_index = match self
            .holds
            .iter()
            .position(|hold| hold.product_id == product.id)
        {
            Some(index) => index,
            None => {
                self.holds.push(StockHold {
                    product_id: product.id.clone(),
                    expected_version: product.version,
                    on_hand: product.quantity,
                    reserved: 0,
                });
                self.holds.len() - 1
            }
        };

        let hold = &mut self.holds[hold_index];
        if hold.available() < quantity {
            return Err(CoreError::InsufficientStock {
                product: product.label(),
                available: hold.available(),
                requested: quantity,
            });
        }

        let price_at_sale = product.sale_price();
        let subtotal = price_at_sale.checked_multiply_quantity(quantity).ok_or_else(|| {
            ValidationError::OutOfRange {
                field: "subtotal".to_string(),
                min: 0,
                max: i64::MAX,
            }
        })?;

        hold.reserved += quantity;
        self.lines.push(ReservedLine {
            product_id: product.id.clone(),
            quantity,
            price_at_sale,
            subtotal,
        });

        Ok(&self.lines[self.lines.len() - 1])
    }

    /// Lines in the order they were reserved.
    pub fn lines(&self) -> &[ReservedLine] {
        &self.lines
    }

    /// One hold per distinct product, in first-seen order.
    pub fn holds(&self) -> &[StockHold] {
        &self.holds
    }

    /// Σ subtotal.
    pub fn total(&self) -> Money {
        self.lines.iter().map(|line| line.subtotal).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use chrono::Utc;

    fn product(id: &str, quantity: i64, price: i64) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            sku: None,
            name: format!("Product {id}"),
            purchase_price_cents: 0,
            sale_price_cents: price,
            quantity,
            low_stock_alert: 0,
            version: 3,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_reserve_prices_and_totals() {
        let mut r = SaleReservation::new();
        r.reserve(&product("a", 10, 250), 2).unwrap();
        r.reserve(&product("b", 1, 1000), 1).unwrap();

        assert_eq!(r.lines().len(), 2);
        assert_eq!(r.lines()[0].subtotal, Money::from_cents(500));
        assert_eq!(r.total(), Money::from_cents(1500));
        assert_eq!(r.holds()[0].expected_version, 3);
    }

    #[test]
    fn test_same_product_on_two_lines_cannot_oversubscribe() {
        let p = product("a", 5, 100);
        let mut r = SaleReservation::new();
        r.reserve(&p, 3).unwrap();

        let err = r.reserve(&p, 3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);
        match err {
            CoreError::InsufficientStock {
                available,
                requested,
                ..
            } => {
                assert_eq!(available, 2);
                assert_eq!(requested, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        r.reserve(&p, 2).unwrap();
        assert_eq!(r.holds().len(), 1);
        assert_eq!(r.holds()[0].reserved, 5);
        assert_eq!(r.holds()[0].available(), 0);
    }

    #[test]
    fn test_rejects_non_positive_quantity() {
        let mut r = SaleReservation::new();
        let err = r.reserve(&product("a", 5, 100), 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(r.is_empty());
        assert!(r.holds().is_empty());
    }

    #[test]
    fn test_failed_line_leaves_earlier_lines_untouched() {
        let mut r = SaleReservation::new();
        r.reserve(&product("a", 5, 100), 5).unwrap();
        assert!(r.reserve(&product("b", 1, 100), 2).is_err());

        assert_eq!(r.lines().len(), 1);
        // The failing product's hold exists but reserves nothing.
        assert_eq!(r.holds()[1].reserved, 0);
    }

    #[test]
    fn test_subtotal_overflow_is_invalid_input() {
        let mut r = SaleReservation::new();
        let err = r
            .reserve(&product("a", i64::MAX, i64::MAX / 2), 3)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}
