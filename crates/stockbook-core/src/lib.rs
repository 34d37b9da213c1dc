//! # stockbook-core: Pure Business Logic for Stockbook
//!
//! Domain records and stock rules for the Inventory Movement Engine, with zero
//! I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockbook Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Request handlers (out of scope)                    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ create_sale / create_return / ...     │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                stockbook-engine (transactions, CAS)             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ stockbook-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌────────────┐ ┌──────────────┐   │   │
//! │  │   │  types   │ │ movement │ │reservation │ │   returns    │   │   │
//! │  │   │ Product  │ │ StockLog │ │ SaleReserv.│ │ check_return │   │   │
//! │  │   │ Sale     │ │ Filter   │ │ StockHold  │ │ Allowance    │   │   │
//! │  │   └──────────┘ └──────────┘ └────────────┘ └──────────────┘   │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 stockbook-db (SQLite repositories)              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Product, Customer, Sale, SaleLine, ReturnRecord
//! - [`movement`] - Ledger entries, movement reasons, filters, reconciliation
//! - [`reservation`] - In-memory reservation of a multi-line sale
//! - [`returns`] - Cumulative return bound
//! - [`money`] - Integer-cents money
//! - [`error`] - Domain error types and [`ErrorKind`]
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use stockbook_core::movement::{MovementReason, MovementType};
//!
//! let reason = MovementReason::Sale { sale_id: "42".to_string() };
//! assert_eq!(reason.to_string(), "sale:42");
//! assert_eq!(MovementType::Out.signed(3), -3);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod movement;
pub mod reservation;
pub mod returns;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use money::Money;
pub use movement::{
    MovementFilter, MovementReason, MovementType, NewMovement, StockAdjustment, StockLogEntry,
    StockReconciliation,
};
pub use reservation::{ReservedLine, SaleReservation, StockHold};
pub use returns::ReturnAllowance;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Largest quantity a single movement may carry.
///
/// Keeps subtotals and ledger sums far away from i64 overflow.
pub const MAX_MOVEMENT_QUANTITY: i64 = 1_000_000;
