//! # Stock Movements
//!
//! Types for the movement ledger: the append-only record of every change to a
//! product's quantity.
//!
//! ## Movement Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Operation            Type   Reason                                     │
//! │  ───────────────────  ────   ─────────────────────────────────────────  │
//! │  registerProduct      IN     opening-stock                              │
//! │  createSale (per line) OUT   sale:<saleId>                              │
//! │  createReturn         IN     return:<returnId>                          │
//! │  deleteReturn         OUT    return-reversal:<returnId>                 │
//! │  adjustStock          IN/OUT <caller text, verbatim>                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! For every product: `quantity == Σ IN − Σ OUT` over its entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::types::ActorId;

// =============================================================================
// Movement Type
// =============================================================================

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum MovementType {
    /// Stock comes in (restock, return, opening stock).
    In,
    /// Stock goes out (sale, write-off, return reversal).
    Out,
}

impl MovementType {
    /// Signed quantity change for `quantity` units moving this way.
    #[inline]
    pub const fn signed(&self, quantity: i64) -> i64 {
        match self {
            MovementType::In => quantity,
            MovementType::Out => -quantity,
        }
    }
}

impl fmt::Display for MovementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MovementType::In => f.write_str("IN"),
            MovementType::Out => f.write_str("OUT"),
        }
    }
}

// =============================================================================
// Movement Reason
// =============================================================================

/// Why a movement happened.
///
/// Engine-generated movements get a synthesized reason that points back at
/// the originating record; manual adjustments keep the caller's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MovementReason {
    OpeningStock,
    Sale { sale_id: String },
    Return { return_id: String },
    ReturnReversal { return_id: String },
    Manual(String),
}

impl MovementReason {
    /// The text stored in the ledger.
    pub fn to_reason_string(&self) -> String {
        match self {
            MovementReason::OpeningStock => "opening-stock".to_string(),
            MovementReason::Sale { sale_id } => format!("sale:{sale_id}"),
            MovementReason::Return { return_id } => format!("return:{return_id}"),
            MovementReason::ReturnReversal { return_id } => {
                format!("return-reversal:{return_id}")
            }
            MovementReason::Manual(text) => text.clone(),
        }
    }
}

impl fmt::Display for MovementReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_reason_string())
    }
}

// =============================================================================
// Ledger Entries
// =============================================================================

/// One immutable ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockLogEntry {
    /// Store-assigned append position; strictly increasing.
    pub seq: i64,
    pub id: String,
    pub product_id: String,
    #[serde(rename = "type")]
    pub movement_type: MovementType,
    /// Always positive; direction comes from `movement_type`.
    pub quantity: i64,
    pub reason: String,
    pub performed_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl StockLogEntry {
    /// Signed effect of this entry on the product's quantity.
    #[inline]
    pub fn delta(&self) -> i64 {
        self.movement_type.signed(self.quantity)
    }
}

/// A ledger entry about to be appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMovement {
    pub product_id: String,
    pub movement_type: MovementType,
    pub quantity: i64,
    pub reason: MovementReason,
    pub performed_by: ActorId,
}

impl NewMovement {
    pub fn new(
        product_id: impl Into<String>,
        movement_type: MovementType,
        quantity: i64,
        reason: MovementReason,
        performed_by: &ActorId,
    ) -> Self {
        NewMovement {
            product_id: product_id.into(),
            movement_type,
            quantity,
            reason,
            performed_by: performed_by.clone(),
        }
    }
}

/// A manual stock change, independent of any sale.
///
/// The reason is mandatory and stored verbatim on the ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockAdjustment {
    pub product_id: String,
    #[serde(rename = "type")]
    pub movement_type: MovementType,
    pub quantity: i64,
    pub reason: String,
}

impl StockAdjustment {
    /// Restock, correction upward, found goods.
    pub fn stock_in(product_id: impl Into<String>, quantity: i64, reason: impl Into<String>) -> Self {
        StockAdjustment {
            product_id: product_id.into(),
            movement_type: MovementType::In,
            quantity,
            reason: reason.into(),
        }
    }

    /// Write-off, shrinkage, damage.
    pub fn stock_out(
        product_id: impl Into<String>,
        quantity: i64,
        reason: impl Into<String>,
    ) -> Self {
        StockAdjustment {
            product_id: product_id.into(),
            movement_type: MovementType::Out,
            quantity,
            reason: reason.into(),
        }
    }

    /// Signed quantity change this adjustment applies.
    #[inline]
    pub fn delta(&self) -> i64 {
        self.movement_type.signed(self.quantity)
    }
}

// =============================================================================
// Queries
// =============================================================================

/// Filter for reading the ledger. All criteria are optional and combine with
/// AND; the date range is inclusive on both ends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MovementFilter {
    pub product_id: Option<String>,
    pub actor_id: Option<String>,
    #[ts(as = "Option<String>")]
    pub from: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub to: Option<DateTime<Utc>>,
}

impl MovementFilter {
    /// Matches every entry.
    pub fn all() -> Self {
        MovementFilter::default()
    }

    pub fn product(mut self, product_id: impl Into<String>) -> Self {
        self.product_id = Some(product_id.into());
        self
    }

    pub fn actor(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = Some(actor_id.into());
        self
    }

    pub fn between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    /// Whether an entry satisfies this filter.
    pub fn matches(&self, entry: &StockLogEntry) -> bool {
        self.product_id
            .as_deref()
            .map_or(true, |id| entry.product_id == id)
            && self
                .actor_id
                .as_deref()
                .map_or(true, |id| entry.performed_by == id)
            && self.from.map_or(true, |from| entry.created_at >= from)
            && self.to.map_or(true, |to| entry.created_at <= to)
    }
}

/// Ledger totals for one product compared with its on-hand quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockReconciliation {
    pub product_id: String,
    pub on_hand: i64,
    pub ledger_in: i64,
    pub ledger_out: i64,
}

impl StockReconciliation {
    /// Σ IN − Σ OUT.
    #[inline]
    pub fn ledger_balance(&self) -> i64 {
        self.ledger_in - self.ledger_out
    }

    /// Whether the ledger explains the on-hand quantity exactly.
    #[inline]
    pub fn is_consistent(&self) -> bool {
        self.on_hand == self.ledger_balance()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(movement_type: MovementType, quantity: i64, by: &str) -> StockLogEntry {
        StockLogEntry {
            seq: 1,
            id: "e-1".to_string(),
            product_id: "p-1".to_string(),
            movement_type,
            quantity,
            reason: "restock".to_string(),
            performed_by: by.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_reason_strings() {
        assert_eq!(MovementReason::OpeningStock.to_string(), "opening-stock");
        assert_eq!(
            MovementReason::Sale {
                sale_id: "s-1".into()
            }
            .to_string(),
            "sale:s-1"
        );
        assert_eq!(
            MovementReason::Return {
                return_id: "r-1".into()
            }
            .to_string(),
            "return:r-1"
        );
        assert_eq!(
            MovementReason::ReturnReversal {
                return_id: "r-1".into()
            }
            .to_string(),
            "return-reversal:r-1"
        );
        assert_eq!(
            MovementReason::Manual("damaged in transit".into()).to_string(),
            "damaged in transit"
        );
    }

    #[test]
    fn test_signed_delta() {
        assert_eq!(entry(MovementType::In, 4, "u").delta(), 4);
        assert_eq!(entry(MovementType::Out, 4, "u").delta(), -4);
    }

    #[test]
    fn test_movement_type_serde() {
        assert_eq!(serde_json::to_string(&MovementType::In).unwrap(), "\"IN\"");
        let json = serde_json::to_value(entry(MovementType::Out, 1, "u")).unwrap();
        assert_eq!(json["type"], "OUT");
    }

    #[test]
    fn test_filter_matches() {
        let e = entry(MovementType::In, 1, "alice");
        assert!(MovementFilter::all().matches(&e));
        assert!(MovementFilter::all().product("p-1").actor("alice").matches(&e));
        assert!(!MovementFilter::all().actor("bob").matches(&e));

        let later = e.created_at + chrono::Duration::seconds(10);
        assert!(!MovementFilter::all()
            .between(later, later + chrono::Duration::seconds(1))
            .matches(&e));
        assert!(MovementFilter::all()
            .between(e.created_at, e.created_at)
            .matches(&e));
    }

    #[test]
    fn test_adjustment_delta_and_serde() {
        let out = StockAdjustment::stock_out("p-1", 3, "damaged");
        assert_eq!(out.delta(), -3);
        assert_eq!(StockAdjustment::stock_in("p-1", 3, "restock").delta(), 3);

        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["type"], "OUT");
        assert_eq!(json["reason"], "damaged");
    }

    #[test]
    fn test_reconciliation() {
        let r = StockReconciliation {
            product_id: "p-1".into(),
            on_hand: 7,
            ledger_in: 12,
            ledger_out: 5,
        };
        assert_eq!(r.ledger_balance(), 7);
        assert!(r.is_consistent());
    }
}
