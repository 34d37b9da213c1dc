//! # Movement Engine
//!
//! The single entry point for every stock-changing operation.
//!
//! ## Unit of Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  operation(request, actor)                                              │
//! │       │                                                                 │
//! │       ├── validate request (no I/O) ── invalid? ──► InvalidInput       │
//! │       ▼                                                                 │
//! │  with_cas_retry ─────────────────────────────────────────────────┐     │
//! │  │  db.begin()                                                   │     │
//! │  │    read records inside the tx                                 │     │
//! │  │    apply stock rules (stockbook-core)  ── violated? ──► error │     │
//! │  │    product::apply_stock_delta(version-checked)                │     │
//! │  │    insert/delete records                                      │     │
//! │  │    movement::append(ledger entry)                             │     │
//! │  │  tx.commit()                                                  │     │
//! │  └── stale / busy? drop tx (rollback), back off, go again ───────┘     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Inside an attempt the engine talks only to the transaction, never to the
//! pool. Operations live in `sale.rs`, `returns.rs` and `adjustment.rs`;
//! this file holds the handle, catalog registration and the read side.

use tracing::{debug, info};

use crate::config::StockbookConfig;
use crate::error::{EngineError, EngineResult};
use crate::retry::{with_cas_retry, RetryPolicy};
use stockbook_core::validation::{validate_name, validate_new_product};
use stockbook_core::{
    ActorId, CoreError, Customer, MovementFilter, MovementReason, MovementType, NewMovement,
    NewProduct, Product, ReturnRecord, Sale, StockLogEntry, StockReconciliation,
};
use stockbook_db::repository::{movement, product};
use stockbook_db::{Database, DbError};

/// Handle for running stock movements against one database.
///
/// Cheap to clone; clones share the pool and may run concurrently.
///
/// ## Usage
/// ```rust,ignore
/// let engine = MovementEngine::new(db);
/// let actor = ActorId::new("cashier-1");
///
/// let sale = engine
///     .create_sale(&customer_id, &[SaleLineRequest::new(&product_id, 2)], &actor)
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct MovementEngine {
    db: Database,
    retry: RetryPolicy,
}

impl MovementEngine {
    /// Creates an engine with the default retry policy.
    pub fn new(db: Database) -> Self {
        MovementEngine {
            db,
            retry: RetryPolicy::default(),
        }
    }

    /// Opens the configured database and builds an engine on it.
    pub async fn from_config(config: &StockbookConfig) -> EngineResult<Self> {
        let db = Database::new(config.db_config()).await?;
        Ok(MovementEngine::new(db).with_retry_policy(config.retry_policy()))
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The underlying database, for repository reads.
    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    // =========================================================================
    // Catalog Registration
    // =========================================================================

    /// Registers a product and records its opening stock.
    ///
    /// A positive `opening_quantity` is appended to the ledger as an IN entry
    /// with reason `opening-stock` in the same transaction, so the ledger
    /// explains the product's quantity from its first row.
    ///
    /// ## Errors
    /// - `InvalidInput` for bad catalog data or a duplicate SKU
    pub async fn register_product(
        &self,
        new_product: &NewProduct,
        actor: &ActorId,
    ) -> EngineResult<Product> {
        validate_new_product(new_product)?;

        let product = with_cas_retry(&self.retry, "Product", &new_product.name, || {
            self.try_register_product(new_product, actor)
        })
        .await?;

        info!(
            product_id = %product.id,
            name = %product.name,
            opening_quantity = product.quantity,
            actor = %actor,
            "Product registered"
        );
        Ok(product)
    }

    async fn try_register_product(
        &self,
        new_product: &NewProduct,
        actor: &ActorId,
    ) -> EngineResult<Product> {
        let mut tx = self.db.begin().await?;

        let product = product::insert(&mut *tx, new_product).await?;
        if product.quantity > 0 {
            movement::append(
                &mut *tx,
                &NewMovement::new(
                    &product.id,
                    MovementType::In,
                    product.quantity,
                    MovementReason::OpeningStock,
                    actor,
                ),
            )
            .await?;
        }

        tx.commit().await.map_err(DbError::from)?;
        Ok(product)
    }

    /// Creates a customer sales can be billed to.
    pub async fn register_customer(
        &self,
        name: &str,
        phone: Option<&str>,
        address: Option<&str>,
    ) -> EngineResult<Customer> {
        validate_name("name", name)?;

        let customer = self.db.customers().insert(name, phone, address).await?;
        debug!(customer_id = %customer.id, "Customer registered");
        Ok(customer)
    }

    // =========================================================================
    // Read Side
    // =========================================================================

    /// Ledger entries matching `filter`, newest first.
    pub async fn list_movements(&self, filter: &MovementFilter) -> EngineResult<Vec<StockLogEntry>> {
        Ok(self.db.movements().query(filter).await?)
    }

    /// Compares a product's on-hand quantity with its ledger, read from one
    /// snapshot.
    pub async fn reconcile(&self, product_id: &str) -> EngineResult<StockReconciliation> {
        let mut tx = self.db.begin().await?;

        let product = product::find_by_id(&mut *tx, product_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Product", product_id))?;
        let (ledger_in, ledger_out) = movement::totals(&mut *tx, product_id).await?;

        tx.rollback().await.map_err(DbError::from)?;

        let reconciliation = StockReconciliation {
            product_id: product.id,
            on_hand: product.quantity,
            ledger_in,
            ledger_out,
        };

        if !reconciliation.is_consistent() {
            tracing::warn!(
                product_id = %reconciliation.product_id,
                on_hand = reconciliation.on_hand,
                ledger_balance = reconciliation.ledger_balance(),
                "Stock does not match ledger"
            );
        }

        Ok(reconciliation)
    }

    pub async fn get_product(&self, product_id: &str) -> EngineResult<Product> {
        self.db
            .products()
            .find_by_id(product_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Product", product_id).into())
    }

    pub async fn get_customer(&self, customer_id: &str) -> EngineResult<Customer> {
        self.db
            .customers()
            .find_by_id(customer_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Customer", customer_id).into())
    }

    pub async fn get_sale(&self, sale_id: &str) -> EngineResult<Sale> {
        self.db
            .sales()
            .find_by_id(sale_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Sale", sale_id).into())
    }

    pub async fn get_return(&self, return_id: &str) -> EngineResult<ReturnRecord> {
        self.db
            .returns()
            .find_by_id(return_id)
            .await?
            .ok_or_else(|| EngineError::from(CoreError::not_found("Return", return_id)))
    }
}

// =============================================================================
// Test Support
// =============================================================================


// =============================================================================
// Unit Tests
// =============================================================================
