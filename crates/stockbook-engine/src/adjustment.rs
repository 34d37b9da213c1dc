//! # Manual Adjustments
//!
//! Restocks, write-offs and corrections that happen outside any sale.
//!
//! ```text
//! adjust_stock({ product: P, type: IN, quantity: 10, reason: "restock" })
//!      P.quantity += 10                (version-checked)
//!      append IN 10 "restock"          (reason stored verbatim)
//!
//! adjust_stock({ product: P, type: OUT, quantity: 99, reason: "damaged" })
//!      P.quantity = 4 < 99  ──► InsufficientStock, nothing written
//! ```

use tracing::info;

use crate::engine::MovementEngine;
use crate::error::EngineResult;
use crate::retry::with_cas_retry;
use stockbook_core::validation::{validate_quantity, validate_reason};
use stockbook_core::{
    ActorId, CoreError, MovementReason, MovementType, NewMovement, Product, StockAdjustment,
};
use stockbook_db::repository::{movement, product};
use stockbook_db::DbError;

impl MovementEngine {
    /// Applies a manual stock change and returns the updated product.
    ///
    /// ## Errors
    /// - `InvalidInput` for a quantity below 1 or a blank reason
    /// - `NotFound` if the product is missing
    /// - `InsufficientStock` if an OUT adjustment exceeds what is on hand
    pub async fn adjust_stock(
        &self,
        adjustment: &StockAdjustment,
        actor: &ActorId,
    ) -> EngineResult<Product> {
        validate_quantity(adjustment.quantity)?;
        validate_reason(&adjustment.reason)?;

        let updated = with_cas_retry(self.retry_policy(), "Product", &adjustment.product_id, || {
            self.try_adjust_stock(adjustment, actor)
        })
        .await?;

        info!(
            product_id = %updated.id,
            movement = %adjustment.movement_type,
            quantity = adjustment.quantity,
            on_hand = updated.quantity,
            actor = %actor,
            "Stock adjusted"
        );
        Ok(updated)
    }

    async fn try_adjust_stock(
        &self,
        adjustment: &StockAdjustment,
        actor: &ActorId,
    ) -> EngineResult<Product> {
        let mut tx = self.database().begin().await?;

        let item = product::find_by_id(&mut *tx, &adjustment.product_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Product", &adjustment.product_id))?;

        if adjustment.movement_type == MovementType::Out && !item.can_supply(adjustment.quantity) {
            return Err(CoreError::InsufficientStock {
                product: item.label(),
                available: item.quantity,
                requested: adjustment.quantity,
            }
            .into());
        }

        product::apply_stock_delta(&mut *tx, &item.id, item.version, adjustment.delta()).await?;
        movement::append(
            &mut *tx,
            &NewMovement::new(
                &item.id,
                adjustment.movement_type,
                adjustment.quantity,
                MovementReason::Manual(adjustment.reason.clone()),
                actor,
            ),
        )
        .await?;

        let updated = product::find_by_id(&mut *tx, &item.id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", &item.id))?;

        tx.commit().await.map_err(DbError::from)?;
        Ok(updated)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
