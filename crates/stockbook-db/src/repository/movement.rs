//! # Movement Repository
//!
//! Audit Store: the append-only stock ledger.
//!
//! ## Append-Only
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  stock_log                                                              │
//! │  ┌─────┬────────┬──────┬─────┬──────────────────────┬────────────┐     │
//! │  │ seq │product │ type │ qty │ reason               │ performed  │     │
//! │  ├─────┼────────┼──────┼─────┼──────────────────────┼────────────┤     │
//! │  │  1  │ p1     │ IN   │ 10  │ opening-stock        │ admin      │     │
//! │  │  2  │ p1     │ OUT  │  2  │ sale:8f1c…           │ cashier-1  │     │
//! │  │  3  │ p1     │ IN   │  1  │ return:27ab…         │ cashier-1  │     │
//! │  │  4  │ p1     │ OUT  │  1  │ return-reversal:27ab…│ manager    │     │
//! │  └─────┴────────┴──────┴─────┴──────────────────────┴────────────┘     │
//! │                                                                         │
//! │  INSERT only. UPDATE and DELETE abort (migration 002).                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use stockbook_core::{MovementFilter, NewMovement, StockLogEntry};

const ENTRY_COLUMNS: &str =
    "seq, id, product_id, type AS movement_type, quantity, reason, performed_by, created_at";

/// Appends one ledger entry and returns it with its store-assigned `seq`.
pub async fn append(conn: &mut SqliteConnection, movement: &NewMovement) -> DbResult<StockLogEntry> {
    let id = Uuid::new_v4().to_string();
    let reason = movement.reason.to_reason_string();
    let created_at = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO stock_log (id, product_id, type, quantity, reason, performed_by, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&id)
    .bind(&movement.product_id)
    .bind(movement.movement_type)
    .bind(movement.quantity)
    .bind(&reason)
    .bind(movement.performed_by.as_str())
    .bind(created_at)
    .execute(conn)
    .await?;

    let entry = StockLogEntry {
        seq: result.last_insert_rowid(),
        id,
        product_id: movement.product_id.clone(),
        movement_type: movement.movement_type,
        quantity: movement.quantity,
        reason,
        performed_by: movement.performed_by.as_str().to_string(),
        created_at,
    };

    debug!(
        seq = entry.seq,
        product_id = %entry.product_id,
        movement_type = %entry.movement_type,
        quantity = entry.quantity,
        reason = %entry.reason,
        "Appended stock movement"
    );

    Ok(entry)
}

/// Entries matching `filter`, newest first.
pub async fn query(
    conn: &mut SqliteConnection,
    filter: &MovementFilter,
) -> DbResult<Vec<StockLogEntry>> {
    let sql = format!(
        r#"
        SELECT {ENTRY_COLUMNS}
        FROM stock_log
        WHERE (?1 IS NULL OR product_id = ?1)
          AND (?2 IS NULL OR performed_by = ?2)
          AND (?3 IS NULL OR created_at >= ?3)
          AND (?4 IS NULL OR created_at <= ?4)
        ORDER BY seq DESC
        "#
    );

    let entries = sqlx::query_as::<_, StockLogEntry>(&sql)
        .bind(&filter.product_id)
        .bind(&filter.actor_id)
        .bind(filter.from)
        .bind(filter.to)
        .fetch_all(conn)
        .await?;

    debug!(count = entries.len(), "Queried stock movements");
    Ok(entries)
}

/// (Σ IN, Σ OUT) for one product.
pub async fn totals(conn: &mut SqliteConnection, product_id: &str) -> DbResult<(i64, i64)> {
    let totals: (i64, i64) = sqlx::query_as(
        r#"
        SELECT
            COALESCE(SUM(CASE WHEN type = 'IN' THEN quantity ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN type = 'OUT' THEN quantity ELSE 0 END), 0)
        FROM stock_log
        WHERE product_id = ?1
        "#,
    )
    .bind(product_id)
    .fetch_one(conn)
    .await?;

    Ok(totals)
}

/// Read-only access to the ledger.
///
/// No update or delete; writes go through [`append`].
#[derive(Debug, Clone)]
pub struct MovementRepository {
    pool: SqlitePool,
}

impl MovementRepository {
    pub fn new(pool: SqlitePool) -> Self {
        MovementRepository { pool }
    }

    pub async fn query(&self, filter: &MovementFilter) -> DbResult<Vec<StockLogEntry>> {
        let mut conn = self.pool.acquire().await?;
        query(&mut conn, filter).await
    }

    pub async fn totals(&self, product_id: &str) -> DbResult<(i64, i64)> {
        let mut conn = self.pool.acquire().await?;
        totals(&mut conn, product_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::product;
    use stockbook_core::{ActorId, MovementReason, MovementType, NewProduct};

    #[tokio::test]
    async fn test_append_query_and_totals() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let alice = ActorId::new("alice");
        let bob = ActorId::new("bob");

        let p = {
            let mut conn = db.pool().acquire().await.unwrap();
            let p = product::insert(&mut conn, &NewProduct::new("A", 1))
                .await
                .unwrap();

            let first = append(
                &mut conn,
                &NewMovement::new(&p.id, MovementType::In, 10, MovementReason::OpeningStock, &alice),
            )
            .await
            .unwrap();
            let second = append(
                &mut conn,
                &NewMovement::new(
                    &p.id,
                    MovementType::Out,
                    3,
                    MovementReason::Manual("damaged".into()),
                    &bob,
                ),
            )
            .await
            .unwrap();
            assert!(second.seq > first.seq);
            p
        };

        let movements = db.movements();
        let all = movements.query(&MovementFilter::all()).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].reason, "damaged");
        assert_eq!(all[1].reason, "opening-stock");

        let by_bob = movements
            .query(&MovementFilter::all().actor("bob"))
            .await
            .unwrap();
        assert_eq!(by_bob.len(), 1);
        assert_eq!(by_bob[0].movement_type, MovementType::Out);

        let exact = movements
            .query(&MovementFilter::all().between(all[1].created_at, all[1].created_at))
            .await
            .unwrap();
        assert!(exact.iter().any(|e| e.id == all[1].id));

        assert_eq!(movements.totals(&p.id).await.unwrap(), (10, 3));
    }

    #[tokio::test]
    async fn test_ledger_rejects_update_and_delete() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        let p = product::insert(&mut conn, &NewProduct::new("A", 1))
            .await
            .unwrap();
        append(
            &mut conn,
            &NewMovement::new(
                &p.id,
                MovementType::In,
                1,
                MovementReason::OpeningStock,
                &ActorId::new("u"),
            ),
        )
        .await
        .unwrap();

        assert!(sqlx::query("UPDATE stock_log SET quantity = 2")
            .execute(&mut *conn)
            .await
            .is_err());
        assert!(sqlx::query("DELETE FROM stock_log")
            .execute(&mut *conn)
            .await
            .is_err());
    }
}
