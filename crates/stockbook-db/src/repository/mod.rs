//! # Repository Module
//!
//! Database repository implementations for Stockbook.
//!
//! ## Two Entry Points
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Reads outside a movement                                              │
//! │       │  db.products().find_by_id(id)                                  │
//! │       ▼                                                                 │
//! │  ProductRepository { pool }  ── acquires a connection, then calls ──┐  │
//! │                                                                     │  │
//! │  Movements (engine, inside one transaction)                         │  │
//! │       │  let mut tx = db.begin().await?;                            │  │
//! │       │  product::apply_stock_delta(&mut *tx, …)                    │  │
//! │       ▼                                                             ▼  │
//! │  product::{find_by_id, apply_stock_delta, …}(conn: &mut SqliteConnection)
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Catalog Store
//! - [`CustomerRepository`](customer::CustomerRepository) - Customers
//! - [`SaleRepository`](sale::SaleRepository) - Sales Store
//! - [`ReturnRepository`](returns::ReturnRepository) - Return records
//! - [`MovementRepository`](movement::MovementRepository) - Audit Store (ledger)

pub mod customer;
pub mod movement;
pub mod product;
pub mod returns;
pub mod sale;
