//! # Sale Transactions
//!
//! `create_sale`: reserve every line in memory, then commit all of them in one
//! transaction.
//!
//! ## Flow
//! ```text
//! create_sale(customer, [A × 2, B × 1, A × 1], actor)
//!      │
//!      ▼
//! validate: lines non-empty, every quantity ≥ 1          (no I/O)
//!      │
//!      ▼  ── attempt (fresh transaction) ──────────────────────────────
//! customer exists?                                       NotFound
//! for each line: read product, reservation.reserve()     NotFound / InsufficientStock
//!      │            (A reserved 2, then 3 of A's stock)
//!      ▼
//! for each hold:  apply_stock_delta(A, v7, −3)           stale? → retry
//!                 apply_stock_delta(B, v2, −1)
//! insert sale + 3 lines (price_at_sale frozen)
//! append 3 × OUT  "sale:<saleId>"
//! commit
//! ```

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::engine::MovementEngine;
use crate::error::EngineResult;
use crate::retry::with_cas_retry;
use stockbook_core::validation::validate_quantity;
use stockbook_core::{
    ActorId, CoreError, MovementReason, MovementType, NewMovement, Sale, SaleLine,
    SaleLineRequest, SaleReservation, SaleStatus, ValidationError,
};
use stockbook_db::repository::{customer, movement, product, sale};
use stockbook_db::DbError;

impl MovementEngine {
    /// Creates a sale, taking every line's quantity out of stock as one unit.
    ///
    /// ## Errors
    /// - `InvalidInput` if `lines` is empty or a quantity is below 1
    /// - `NotFound` if the customer or any product is missing
    /// - `InsufficientStock` naming the first product that cannot cover its
    ///   line, counting earlier lines of the same request
    /// - `Conflict` if concurrent writers kept winning
    ///
    /// On any error no stock, sale or ledger row is written.
    pub async fn create_sale(
        &self,
        customer_id: &str,
        lines: &[SaleLineRequest],
        actor: &ActorId,
    ) -> EngineResult<Sale> {
        if lines.is_empty() {
            return Err(ValidationError::Required {
                field: "lines".to_string(),
            }
            .into());
        }
        for line in lines {
            validate_quantity(line.quantity)?;
        }

        let contended = lines
            .iter()
            .map(|line| line.product_id.as_str())
            .collect::<Vec<_>>()
            .join(",");

        let sale = with_cas_retry(self.retry_policy(), "Product", &contended, || {
            self.try_create_sale(customer_id, lines, actor)
        })
        .await?;

        info!(
            sale_id = %sale.id,
            customer_id = %sale.customer_id,
            lines = sale.lines.len(),
            total = %sale.total_amount(),
            actor = %actor,
            "Sale created"
        );
        Ok(sale)
    }

    async fn try_create_sale(
        &self,
        customer_id: &str,
        lines: &[SaleLineRequest],
        actor: &ActorId,
    ) -> EngineResult<Sale> {
        let mut tx = self.database().begin().await?;

        if customer::find_by_id(&mut *tx, customer_id).await?.is_none() {
            return Err(CoreError::not_found("Customer", customer_id).into());
        }

        let mut reservation = SaleReservation::new();
        for line in lines {
            let product = product::find_by_id(&mut *tx, &line.product_id)
                .await?
                .ok_or_else(|| CoreError::not_found("Product", &line.product_id))?;
            reservation.reserve(&product, line.quantity)?;
        }

        for hold in reservation.holds() {
            product::apply_stock_delta(&mut *tx, &hold.product_id, hold.expected_version, -hold.reserved)
                .await?;
        }

        let sale_id = Uuid::new_v4().to_string();
        let sale = Sale {
            id: sale_id.clone(),
            customer_id: customer_id.to_string(),
            total_amount_cents: reservation.total().cents(),
            status: SaleStatus::Completed,
            created_by: actor.as_str().to_string(),
            created_at: Utc::now(),
            lines: reservation
                .lines()
                .iter()
                .enumerate()
                .map(|(line_no, reserved)| SaleLine {
                    id: Uuid::new_v4().to_string(),
                    sale_id: sale_id.clone(),
                    line_no: line_no as i64,
                    product_id: reserved.product_id.clone(),
                    quantity: reserved.quantity,
                    price_at_sale_cents: reserved.price_at_sale.cents(),
                    subtotal_cents: reserved.subtotal.cents(),
                })
                .collect(),
        };

        sale::insert(&mut *tx, &sale).await?;

        for line in &sale.lines {
            movement::append(
                &mut *tx,
                &NewMovement::new(
                    &line.product_id,
                    MovementType::Out,
                    line.quantity,
                    MovementReason::Sale {
                        sale_id: sale.id.clone(),
                    },
                    actor,
                ),
            )
            .await?;
        }

        tx.commit().await.map_err(DbError::from)?;
        Ok(sale)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
