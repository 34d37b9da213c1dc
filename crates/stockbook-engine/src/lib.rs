//! # stockbook-engine: Inventory Movement Engine
//!
//! Every change to a product's quantity goes through [`MovementEngine`]: sales,
//! returns, return reversals and manual adjustments. Each one commits as a
//! single transaction that updates stock, writes its records and appends its
//! ledger entries, or fails having written nothing.
//!
//! ## Guarantees
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  products.quantity ≥ 0                       (always, for every row)    │
//! │  products.quantity = Σ IN − Σ OUT            (over its ledger entries)  │
//! │  Σ returns(sale, product) ≤ Σ sold(sale, product)                       │
//! │  stock_log rows are never updated or deleted                            │
//! │                                                                         │
//! │  Concurrency: version-checked writes. A unit of work that loses a race  │
//! │  re-reads and re-decides; after RetryPolicy::max_attempts it fails with  │
//! │  Conflict and leaves no trace.                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`engine`] - [`MovementEngine`], catalog registration, reads, reconciliation
//! - `sale` - `create_sale`
//! - `returns` - `create_return`, `delete_return`
//! - `adjustment` - `adjust_stock`
//! - [`retry`] - Bounded compare-and-swap retry
//! - [`config`] - Environment configuration
//! - [`telemetry`] - Tracing subscriber setup
//! - [`error`] - [`EngineError`] and its serializable payload
//!
//! ## Example
//!
//! ```rust,ignore
//! use stockbook_engine::{MovementEngine, StockbookConfig};
//! use stockbook_core::{ActorId, NewProduct, SaleLineRequest, StockAdjustment};
//!
//! let engine = MovementEngine::from_config(&StockbookConfig::load()?).await?;
//! let manager = ActorId::new("manager-1");
//!
//! let cola = engine
//!     .register_product(&NewProduct::new("Cola 330ml", 150).opening_quantity(24), &manager)
//!     .await?;
//! engine
//!     .adjust_stock(&StockAdjustment::stock_out(&cola.id, 2, "dented cans"), &manager)
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

mod adjustment;
pub mod config;
pub mod engine;
pub mod error;
pub mod retry;
mod returns;
mod sale;
pub mod telemetry;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, StockbookConfig};
pub use engine::MovementEngine;
pub use error::{EngineError, EngineResult, ErrorPayload};
pub use retry::RetryPolicy;
pub use telemetry::init_tracing;
