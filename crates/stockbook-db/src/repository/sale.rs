//! # Sale Repository
//!
//! Sales Store: sale headers and their lines.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create_sale (engine, one transaction)                                   │
//! │       │                                                                 │
//! │       ├── insert(sale header + lines)   ← prices frozen here            │
//! │       ▼                                                                 │
//! │  ┌──────────────┐   set_status(Cancelled)   ┌──────────────┐           │
//! │  │  COMPLETED   │ ─────────────────────────►│  CANCELLED   │           │
//! │  └──────────────┘                           └──────────────┘           │
//! │   returns allowed                            returns rejected           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Lines are never updated or deleted; the schema rejects both.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use stockbook_core::{Sale, SaleLine, SaleStatus};

const SALE_COLUMNS: &str = "id, customer_id, total_amount_cents, status, created_by, created_at";

const LINE_COLUMNS: &str =
    "id, sale_id, line_no, product_id, quantity, price_at_sale_cents, subtotal_cents";

/// Gets a sale with its lines in request order.
pub async fn find_by_id(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Sale>> {
    let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1");
    let sale = sqlx::query_as::<_, Sale>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    match sale {
        Some(mut sale) => {
            sale.lines = lines_for(conn, &sale.id).await?;
            Ok(Some(sale))
        }
        None => Ok(None),
    }
}

/// Gets the lines of a sale ordered by `line_no`.
pub async fn lines_for(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Vec<SaleLine>> {
    let sql = format!("SELECT {LINE_COLUMNS} FROM sale_lines WHERE sale_id = ?1 ORDER BY line_no");
    let lines = sqlx::query_as::<_, SaleLine>(&sql)
        .bind(sale_id)
        .fetch_all(conn)
        .await?;

    Ok(lines)
}

/// Inserts a sale header and all of its lines.
///
/// Must run inside the transaction that also writes the stock changes.
pub async fn insert(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    debug!(id = %sale.id, lines = sale.lines.len(), total = sale.total_amount_cents, "Inserting sale");

    sqlx::query(
        r#"
        INSERT INTO sales (id, customer_id, total_amount_cents, status, created_by, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&sale.id)
    .bind(&sale.customer_id)
    .bind(sale.total_amount_cents)
    .bind(sale.status)
    .bind(&sale.created_by)
    .bind(sale.created_at)
    .execute(&mut *conn)
    .await?;

    for line in &sale.lines {
        sqlx::query(
            r#"
            INSERT INTO sale_lines (
                id, sale_id, line_no, product_id, quantity, price_at_sale_cents, subtotal_cents
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&line.id)
        .bind(&line.sale_id)
        .bind(line.line_no)
        .bind(&line.product_id)
        .bind(line.quantity)
        .bind(line.price_at_sale_cents)
        .bind(line.subtotal_cents)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Lists sales newest first, with lines.
pub async fn list(conn: &mut SqliteConnection, limit: u32) -> DbResult<Vec<Sale>> {
    let sql = format!("SELECT {SALE_COLUMNS} FROM sales ORDER BY created_at DESC, id LIMIT ?1");
    let mut sales = sqlx::query_as::<_, Sale>(&sql)
        .bind(limit)
        .fetch_all(&mut *conn)
        .await?;

    for sale in &mut sales {
        sale.lines = lines_for(&mut *conn, &sale.id).await?;
    }

    Ok(sales)
}

/// Changes a sale's status. Lines and totals are untouched.
pub async fn set_status(conn: &mut SqliteConnection, id: &str, status: SaleStatus) -> DbResult<()> {
    debug!(id = %id, status = %status, "Updating sale status");

    let result = sqlx::query("UPDATE sales SET status = ?2 WHERE id = ?1")
        .bind(id)
        .bind(status)
        .execute(conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Sale", id));
    }

    Ok(())
}

/// Repository for sale reads.
///
/// ## Usage
/// ```rust,ignore
/// let sale = db.sales().find_by_id(&sale_id).await?;
/// let recent = db.sales().list(50).await?;
/// ```
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    pub async fn find_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let mut conn = self.pool.acquire().await?;
        find_by_id(&mut conn, id).await
    }

    pub async fn list(&self, limit: u32) -> DbResult<Vec<Sale>> {
        let mut conn = self.pool.acquire().await?;
        list(&mut conn, limit).await
    }

    /// Marks a completed sale as cancelled.
    pub async fn cancel(&self, id: &str) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        set_status(&mut conn, id, SaleStatus::Cancelled).await
    }
}
