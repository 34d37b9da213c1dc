//! # Returns
//!
//! Crediting returned goods back to stock, and undoing that credit.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create_return(sale S, product P × 2)                                   │
//! │     sale exists, completed, sells P, 2 ≤ sold − already returned        │
//! │     P.quantity += 2            (version-checked)                        │
//! │     INSERT returns (R)                                                  │
//! │     append IN  2  "return:R"                                            │
//! │                                                                         │
//! │  delete_return(R)                                                       │
//! │     P.quantity ≥ 2 ?           else ReversalUnderflow                   │
//! │     P.quantity −= 2            (version-checked)                        │
//! │     append OUT 2  "return-reversal:R"                                   │
//! │     DELETE returns (R)         frees 2 units of S's return allowance    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Two concurrent returns against the same line both write the product row,
//! so the loser re-reads the returned total and is checked again.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::engine::MovementEngine;
use crate::error::EngineResult;
use crate::retry::with_cas_retry;
use stockbook_core::returns::{check_return, validate_return_request};
use stockbook_core::validation::{validate_id, validate_reason};
use stockbook_core::{
    ActorId, CoreError, MovementReason, MovementType, NewMovement, NewReturn, ReturnRecord,
};
use stockbook_db::repository::{movement, product, returns, sale};
use stockbook_db::DbError;

impl MovementEngine {
    /// Records a return and puts the returned units back in stock.
    ///
    /// ## Errors
    /// - `InvalidInput` for a quantity below 1, a negative refund or an
    ///   over-long reason
    /// - `NotFound` if the sale or product is missing
    /// - `NotFound` if the product was never sold on this sale
    /// - `InvalidState` if the sale is cancelled
    /// - `InvalidInput` if the quantity exceeds what is still returnable
    pub async fn create_return(
        &self,
        request: &NewReturn,
        actor: &ActorId,
    ) -> EngineResult<ReturnRecord> {
        validate_return_request(request)?;
        if let Some(reason) = request.normalized_reason() {
            validate_reason(&reason)?;
        }

        let record = with_cas_retry(self.retry_policy(), "Product", &request.product_id, || {
            self.try_create_return(request, actor)
        })
        .await?;

        info!(
            return_id = %record.id,
            sale_id = %record.sale_id,
            product_id = %record.product_id,
            quantity = record.quantity,
            refund = %record.refund_amount(),
            actor = %actor,
            "Return recorded"
        );
        Ok(record)
    }

    async fn try_create_return(
        &self,
        request: &NewReturn,
        actor: &ActorId,
    ) -> EngineResult<ReturnRecord> {
        let mut tx = self.database().begin().await?;

        let original = sale::find_by_id(&mut *tx, &request.sale_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Sale", &request.sale_id))?;
        let already_returned =
            returns::returned_quantity(&mut *tx, &request.sale_id, &request.product_id).await?;
        check_return(&original, request, already_returned)?;

        let item = product::find_by_id(&mut *tx, &request.product_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Product", &request.product_id))?;
        product::apply_stock_delta(&mut *tx, &item.id, item.version, request.quantity).await?;

        let record = ReturnRecord {
            id: Uuid::new_v4().to_string(),
            sale_id: request.sale_id.clone(),
            product_id: request.product_id.clone(),
            quantity: request.quantity,
            refund_amount_cents: request.refund_amount_cents,
            reason: request.normalized_reason(),
            created_by: actor.as_str().to_string(),
            created_at: Utc::now(),
        };
        returns::insert(&mut *tx, &record).await?;

        movement::append(
            &mut *tx,
            &NewMovement::new(
                &record.product_id,
                MovementType::In,
                record.quantity,
                MovementReason::Return {
                    return_id: record.id.clone(),
                },
                actor,
            ),
        )
        .await?;

        tx.commit().await.map_err(DbError::from)?;
        Ok(record)
    }

    /// Deletes a return and takes its units back out of stock.
    ///
    /// The deleted quantity becomes returnable again on the original sale.
    ///
    /// ## Errors
    /// - `NotFound` if the return is missing
    /// - `InvalidState` if fewer units are on hand than the return credited
    pub async fn delete_return(&self, return_id: &str, actor: &ActorId) -> EngineResult<ReturnRecord> {
        validate_id("return_id", return_id)?;

        let product_id = self
            .database()
            .returns()
            .find_by_id(return_id)
            .await?
            .map(|record| record.product_id)
            .ok_or_else(|| CoreError::not_found("Return", return_id))?;

        let record = with_cas_retry(self.retry_policy(), "Product", &product_id, || {
            self.try_delete_return(return_id, actor)
        })
        .await?;

        info!(
            return_id = %record.id,
            product_id = %record.product_id,
            quantity = record.quantity,
            actor = %actor,
            "Return reversed"
        );
        Ok(record)
    }

    async fn try_delete_return(&self, return_id: &str, actor: &ActorId) -> EngineResult<ReturnRecord> {
        let mut tx = self.database().begin().await?;

        let record = returns::find_by_id(&mut *tx, return_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Return", return_id))?;
        let item = product::find_by_id(&mut *tx, &record.product_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Product", &record.product_id))?;

        if !item.can_supply(record.quantity) {
            return Err(CoreError::ReversalUnderflow {
                return_id: record.id.clone(),
                product_id: item.id.clone(),
                on_hand: item.quantity,
                required: record.quantity,
            }
            .into());
        }

        product::apply_stock_delta(&mut *tx, &item.id, item.version, -record.quantity).await?;
        movement::append(
            &mut *tx,
            &NewMovement::new(
                &record.product_id,
                MovementType::Out,
                record.quantity,
                MovementReason::ReturnReversal {
                    return_id: record.id.clone(),
                },
                actor,
            ),
        )
        .await?;
        returns::delete(&mut *tx, &record.id).await?;

        tx.commit().await.map_err(DbError::from)?;
        Ok(record)
    }

    /// All returns, newest first.
    pub async fn list_returns(&self) -> EngineResult<Vec<ReturnRecord>> {
        Ok(self.database().returns().list().await?)
    }

    /// Returns recorded against one sale, newest first.
    pub async fn returns_for_sale(&self, sale_id: &str) -> EngineResult<Vec<ReturnRecord>> {
        Ok(self.database().returns().list_for_sale(sale_id).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::engine::test_support::*;
    use crate::engine::MovementEngine;
    use crate::error::EngineError;
    use crate::retry::RetryPolicy;
    use std::time::Duration;
    use stockbook_core::{
        ActorId, CoreError, ErrorKind, MovementType, NewReturn, Product, Sale, SaleLineRequest,
        StockAdjustment,
    };
    use stockbook_db::repository::customer;

    async fn sold(engine: &MovementEngine, stock: i64, quantity: i64) -> (Product, Sale) {
        let c = customer(engine).await;
        let p = stocked(engine, "Cola", stock, 150).await;
        let sale = engine
            .create_sale(&c.id, &[SaleLineRequest::new(&p.id, quantity)], &actor())
            .await
            .unwrap();
        (p, sale)
    }

    #[tokio::test]
    async fn test_return_credits_stock_and_ledger() {
        let engine = engine().await;
        let (p, sale) = sold(&engine, 10, 2).await;

        let record = engine
            .create_return(
                &NewReturn::new(&sale.id, &p.id, 1, 150).reason("  dented can "),
                &actor(),
            )
            .await
            .unwrap();

        assert_eq!(record.reason.as_deref(), Some("dented can"));
        assert_eq!(record.created_by, "cashier-1");
        assert_eq!(quantity_of(&engine, &p.id).await, 9);

        let ledger = ledger_for(&engine, &p.id).await;
        assert_eq!(ledger[0].movement_type, MovementType::In);
        assert_eq!(ledger[0].quantity, 1);
        assert_eq!(ledger[0].reason, format!("return:{}", record.id));

        assert_eq!(engine.get_return(&record.id).await.unwrap().quantity, 1);
        assert_eq!(engine.returns_for_sale(&sale.id).await.unwrap().len(), 1);
        assert_reconciled(&engine, &p.id).await;
    }

    #[tokio::test]
    async fn test_return_cannot_exceed_quantity_sold() {
        let engine = engine().await;
        let (p, sale) = sold(&engine, 10, 2).await;

        let err = engine
            .create_return(&NewReturn::new(&sale.id, &p.id, 3, 0), &actor())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(quantity_of(&engine, &p.id).await, 8);
        assert!(engine.list_returns().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_returns_are_bounded_cumulatively() {
        let engine = engine().await;
        let (p, sale) = sold(&engine, 10, 2).await;

        engine
            .create_return(&NewReturn::new(&sale.id, &p.id, 1, 150), &actor())
            .await
            .unwrap();
        let err = engine
            .create_return(&NewReturn::new(&sale.id, &p.id, 2, 300), &actor())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        engine
            .create_return(&NewReturn::new(&sale.id, &p.id, 1, 150), &actor())
            .await
            .unwrap();
        assert_eq!(quantity_of(&engine, &p.id).await, 10);
        assert_reconciled(&engine, &p.id).await;
    }

    #[tokio::test]
    async fn test_return_rejections() {
        let engine = engine().await;
        let (p, sale) = sold(&engine, 10, 2).await;
        let other = stocked(&engine, "Water", 4, 80).await;

        let not_in_sale = engine
            .create_return(&NewReturn::new(&sale.id, &other.id, 1, 0), &actor())
            .await
            .unwrap_err();
        assert_eq!(not_in_sale.kind(), ErrorKind::NotFound);

        let no_sale = engine
            .create_return(&NewReturn::new("ghost", &p.id, 1, 0), &actor())
            .await
            .unwrap_err();
        assert_eq!(no_sale.kind(), ErrorKind::NotFound);

        let zero = engine
            .create_return(&NewReturn::new(&sale.id, &p.id, 0, 0), &actor())
            .await
            .unwrap_err();
        assert_eq!(zero.kind(), ErrorKind::InvalidInput);

        let negative_refund = engine
            .create_return(&NewReturn::new(&sale.id, &p.id, 1, -1), &actor())
            .await
            .unwrap_err();
        assert_eq!(negative_refund.kind(), ErrorKind::InvalidInput);

        engine.database().sales().cancel(&sale.id).await.unwrap();
        let cancelled = engine
            .create_return(&NewReturn::new(&sale.id, &p.id, 1, 0), &actor())
            .await
            .unwrap_err();
        assert_eq!(cancelled.kind(), ErrorKind::InvalidState);

        assert_eq!(quantity_of(&engine, &p.id).await, 8);
        assert_eq!(quantity_of(&engine, &other.id).await, 4);
    }

    #[tokio::test]
    async fn test_delete_return_reverses_and_frees_allowance() {
        let engine = engine().await;
        let (p, sale) = sold(&engine, 10, 2).await;

        let record = engine
            .create_return(&NewReturn::new(&sale.id, &p.id, 2, 300), &actor())
            .await
            .unwrap();
        assert_eq!(quantity_of(&engine, &p.id).await, 10);

        let deleted = engine.delete_return(&record.id, &actor()).await.unwrap();
        assert_eq!(deleted.id, record.id);
        assert_eq!(quantity_of(&engine, &p.id).await, 8);

        let ledger = ledger_for(&engine, &p.id).await;
        assert_eq!(ledger[0].movement_type, MovementType::Out);
        assert_eq!(ledger[0].reason, format!("return-reversal:{}", record.id));
        assert_eq!(
            engine.get_return(&record.id).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );

        // The full line is returnable again
        engine
            .create_return(&NewReturn::new(&sale.id, &p.id, 2, 300), &actor())
            .await
            .unwrap();
        assert_reconciled(&engine, &p.id).await;
    }

    #[tokio::test]
    async fn test_delete_return_refuses_to_go_negative() {
        let engine = engine().await;
        let (p, sale) = sold(&engine, 2, 2).await;

        let record = engine
            .create_return(&NewReturn::new(&sale.id, &p.id, 2, 0), &actor())
            .await
            .unwrap();
        engine
            .adjust_stock(&StockAdjustment::stock_out(&p.id, 1, "damaged"), &actor())
            .await
            .unwrap();

        let err = engine.delete_return(&record.id, &actor()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(quantity_of(&engine, &p.id).await, 1);
        assert!(engine.get_return(&record.id).await.is_ok());
        assert_reconciled(&engine, &p.id).await;
    }

    #[tokio::test]
    async fn test_delete_unknown_return() {
        let engine = engine().await;
        let err = engine.delete_return("ghost", &actor()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let blank = engine.delete_return(" ", &actor()).await.unwrap_err();
        assert_eq!(blank.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_delete_return_conflict_names_the_product() {
        let store = FileStore::open(
            2,
            Duration::from_millis(20),
            RetryPolicy::new(2, Duration::from_millis(1)),
        )
        .await;
        let engine = &store.engine;
        let (p, sale) = sold(engine, 10, 2).await;
        let record = engine
            .create_return(&NewReturn::new(&sale.id, &p.id, 1, 150), &actor())
            .await
            .unwrap();

        // Another writer holds the lock for the whole retry budget
        let mut holder = engine.database().begin().await.unwrap();
        customer::insert(&mut *holder, "Lock holder", None, None)
            .await
            .unwrap();

        let err = engine.delete_return(&record.id, &actor()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(matches!(
            err,
            EngineError::Domain(CoreError::Conflict { entity: "Product", ref id, .. }) if *id == p.id
        ));

        drop(holder);
        assert!(engine.get_return(&record.id).await.is_ok());
        assert_eq!(quantity_of(engine, &p.id).await, 9);
        assert_reconciled(engine, &p.id).await;

        store.remove().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_returns_stay_within_quantity_sold() {
        let store = FileStore::contended().await;
        let engine = &store.engine;
        let (p, sale) = sold(engine, 10, 2).await;

        let mut tasks = Vec::new();
        for i in 0..8 {
            let engine = engine.clone();
            let request = NewReturn::new(&sale.id, &p.id, 1, 150);
            tasks.push(tokio::spawn(async move {
                engine
                    .create_return(&request, &ActorId::new(format!("till-{i}")))
                    .await
            }));
        }

        let mut accepted = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(err) => assert!(matches!(
                    err.kind(),
                    ErrorKind::InvalidInput | ErrorKind::Conflict
                )),
            }
        }

        assert!(accepted <= 2);
        assert_eq!(
            engine.returns_for_sale(&sale.id).await.unwrap().len() as i64,
            accepted
        );
        assert_eq!(quantity_of(engine, &p.id).await, 8 + accepted);
        assert_reconciled(engine, &p.id).await;

        store.remove().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_deletes_reverse_once() {
        let store = FileStore::contended().await;
        let engine = &store.engine;
        let (p, sale) = sold(engine, 10, 2).await;
        let record = engine
            .create_return(&NewReturn::new(&sale.id, &p.id, 2, 300), &actor())
            .await
            .unwrap();

        let mut tasks = Vec::new();
        for i in 0..8 {
            let engine = engine.clone();
            let return_id = record.id.clone();
            tasks.push(tokio::spawn(async move {
                engine
                    .delete_return(&return_id, &ActorId::new(format!("till-{i}")))
                    .await
            }));
        }

        let mut reversed = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => reversed += 1,
                Err(err) => assert_eq!(err.kind(), ErrorKind::NotFound),
            }
        }

        assert_eq!(reversed, 1);
        assert_eq!(quantity_of(engine, &p.id).await, 8);
        let reversals = ledger_for(engine, &p.id)
            .await
            .into_iter()
            .filter(|e| e.reason == format!("return-reversal:{}", record.id))
            .count();
        assert_eq!(reversals, 1);
        assert_reconciled(engine, &p.id).await;

        store.remove().await;
    }
}
