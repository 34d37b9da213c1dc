//! # Return Repository
//!
//! Return records. A row exists exactly as long as its stock effect does:
//! the engine deletes it in the same transaction that appends the reversal.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use stockbook_core::ReturnRecord;

const RETURN_COLUMNS: &str =
    "id, sale_id, product_id, quantity, refund_amount_cents, reason, created_by, created_at";

pub async fn find_by_id(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<ReturnRecord>> {
    let sql = format!("SELECT {RETURN_COLUMNS} FROM returns WHERE id = ?1");
    let record = sqlx::query_as::<_, ReturnRecord>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?;

    Ok(record)
}

pub async fn insert(conn: &mut SqliteConnection, record: &ReturnRecord) -> DbResult<()> {
    debug!(id = %record.id, sale_id = %record.sale_id, quantity = record.quantity, "Inserting return");

    sqlx::query(
        r#"
        INSERT INTO returns (
            id, sale_id, product_id, quantity, refund_amount_cents, reason, created_by, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&record.id)
    .bind(&record.sale_id)
    .bind(&record.product_id)
    .bind(record.quantity)
    .bind(record.refund_amount_cents)
    .bind(&record.reason)
    .bind(&record.created_by)
    .bind(record.created_at)
    .execute(conn)
    .await?;

    Ok(())
}

pub async fn delete(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
    debug!(id = %id, "Deleting return");

    let result = sqlx::query("DELETE FROM returns WHERE id = ?1")
        .bind(id)
        .execute(conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Return", id));
    }

    Ok(())
}

/// Σ quantity over existing returns for one (sale, product) pair.
pub async fn returned_quantity(
    conn: &mut SqliteConnection,
    sale_id: &str,
    product_id: &str,
) -> DbResult<i64> {
    let total: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(quantity), 0) FROM returns WHERE sale_id = ?1 AND product_id = ?2",
    )
    .bind(sale_id)
    .bind(product_id)
    .fetch_one(conn)
    .await?;

    Ok(total)
}

/// All returns, newest first.
pub async fn list(conn: &mut SqliteConnection) -> DbResult<Vec<ReturnRecord>> {
    let sql = format!("SELECT {RETURN_COLUMNS} FROM returns ORDER BY created_at DESC, id DESC");
    let records = sqlx::query_as::<_, ReturnRecord>(&sql)
        .fetch_all(conn)
        .await?;

    Ok(records)
}

/// Returns recorded against one sale, newest first.
pub async fn list_for_sale(
    conn: &mut SqliteConnection,
    sale_id: &str,
) -> DbResult<Vec<ReturnRecord>> {
    let sql = format!(
        "SELECT {RETURN_COLUMNS} FROM returns WHERE sale_id = ?1 ORDER BY created_at DESC, id DESC"
    );
    let records = sqlx::query_as::<_, ReturnRecord>(&sql)
        .bind(sale_id)
        .fetch_all(conn)
        .await?;

    Ok(records)
}

/// Repository for return reads.
#[derive(Debug, Clone)]
pub struct ReturnRepository {
    pool: SqlitePool,
}

impl ReturnRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReturnRepository { pool }
    }

    pub async fn find_by_id(&self, id: &str) -> DbResult<Option<ReturnRecord>> {
        let mut conn = self.pool.acquire().await?;
        find_by_id(&mut conn, id).await
    }

    pub async fn list(&self) -> DbResult<Vec<ReturnRecord>> {
        let mut conn = self.pool.acquire().await?;
        list(&mut conn).await
    }

    pub async fn list_for_sale(&self, sale_id: &str) -> DbResult<Vec<ReturnRecord>> {
        let mut conn = self.pool.acquire().await?;
        list_for_sale(&mut conn, sale_id).await
    }

    pub async fn returned_quantity(&self, sale_id: &str, product_id: &str) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        returned_quantity(&mut conn, sale_id, product_id).await
    }
}
