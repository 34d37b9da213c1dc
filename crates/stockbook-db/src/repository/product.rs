//! # Product Repository
//!
//! Catalog Store: product rows and their on-hand quantity.
//!
//! ## Key Operations
//! - Lookups by id / SKU, full and low-stock listings
//! - Catalog edits that never touch `quantity`
//! - The version-checked quantity write used by every movement
//!
//! ## Version-Checked Write
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Writer A                         Writer B                              │
//! │  read  p1 {qty 5, version 7}      read  p1 {qty 5, version 7}           │
//! │       │                                │                                │
//! │       ▼                                │                                │
//! │  UPDATE … WHERE version = 7 ✅         │                                │
//! │  → {qty 0, version 8}                  ▼                                │
//! │                                   UPDATE … WHERE version = 7            │
//! │                                   → 0 rows → DbError::StaleWrite        │
//! │                                   → engine re-reads {qty 0, version 8}  │
//! │                                   → InsufficientStock                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Functions taking `&mut SqliteConnection` run inside the caller's
//! transaction (`&mut *tx`). [`ProductRepository`] wraps them for pool reads.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use stockbook_core::{NewProduct, Product, DEFAULT_LOW_STOCK_ALERT};

const PRODUCT_COLUMNS: &str = "id, sku, name, purchase_price_cents, sale_price_cents, \
     quantity, low_stock_alert, version, created_at, updated_at";

// =============================================================================
// Connection-Level Operations
// =============================================================================

/// Gets a product by its ID.
pub async fn find_by_id(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
    let product = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?;

    Ok(product)
}

/// Gets a product by its SKU.
pub async fn find_by_sku(conn: &mut SqliteConnection, sku: &str) -> DbResult<Option<Product>> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = ?1");
    let product = sqlx::query_as::<_, Product>(&sql)
        .bind(sku)
        .fetch_optional(conn)
        .await?;

    Ok(product)
}

/// Inserts a new product with `opening_quantity` on hand and version 0.
///
/// ## Returns
/// * `Ok(Product)` - The stored row
/// * `Err(DbError::UniqueViolation)` - SKU already exists
pub async fn insert(conn: &mut SqliteConnection, new: &NewProduct) -> DbResult<Product> {
    let now = Utc::now();
    let product = Product {
        id: Uuid::new_v4().to_string(),
        sku: new.sku.as_ref().map(|sku| sku.trim().to_string()),
        name: new.name.trim().to_string(),
        purchase_price_cents: new.purchase_price_cents,
        sale_price_cents: new.sale_price_cents,
        quantity: new.opening_quantity,
        low_stock_alert: new.low_stock_alert.unwrap_or(DEFAULT_LOW_STOCK_ALERT),
        version: 0,
        created_at: now,
        updated_at: now,
    };

    debug!(id = %product.id, name = %product.name, "Inserting product");

    sqlx::query(
        r#"
        INSERT INTO products (
            id, sku, name, purchase_price_cents, sale_price_cents,
            quantity, low_stock_alert, version, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&product.id)
    .bind(&product.sku)
    .bind(&product.name)
    .bind(product.purchase_price_cents)
    .bind(product.sale_price_cents)
    .bind(product.quantity)
    .bind(product.low_stock_alert)
    .bind(product.version)
    .bind(product.created_at)
    .bind(product.updated_at)
    .execute(conn)
    .await
    .map_err(|e| DbError::from(e).with_duplicate_value(product.sku.clone().unwrap_or_default()))?;

    Ok(product)
}

/// Applies a signed quantity change, conditional on the product still being
/// at `expected_version` and the result staying non-negative.
///
/// ## Returns
/// * `Ok(new_version)` - Write applied
/// * `Err(DbError::StaleWrite)` - Version moved or the guard failed; the
///   caller must re-read and decide again
pub async fn apply_stock_delta(
    conn: &mut SqliteConnection,
    id: &str,
    expected_version: i64,
    delta: i64,
) -> DbResult<i64> {
    debug!(id = %id, expected_version, delta, "Applying stock delta");

    let result = sqlx::query(
        r#"
        UPDATE products
        SET quantity = quantity + ?3,
            version = version + 1,
            updated_at = ?4
        WHERE id = ?1 AND version = ?2 AND quantity + ?3 >= 0
        "#,
    )
    .bind(id)
    .bind(expected_version)
    .bind(delta)
    .bind(Utc::now())
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        debug!(id = %id, expected_version, "Stock write lost the race");
        return Err(DbError::stale("Product", id));
    }

    Ok(expected_version + 1)
}

/// Writes catalog fields (name, SKU, prices, threshold) of `product`.
///
/// `quantity` is never written here. The write is conditional on
/// `product.version`, which it bumps.
pub async fn update_catalog(conn: &mut SqliteConnection, product: &Product) -> DbResult<Product> {
    let now = Utc::now();

    debug!(id = %product.id, "Updating product catalog fields");

    let result = sqlx::query(
        r#"
        UPDATE products
        SET sku = ?3,
            name = ?4,
            purchase_price_cents = ?5,
            sale_price_cents = ?6,
            low_stock_alert = ?7,
            version = version + 1,
            updated_at = ?8
        WHERE id = ?1 AND version = ?2
        "#,
    )
    .bind(&product.id)
    .bind(product.version)
    .bind(&product.sku)
    .bind(&product.name)
    .bind(product.purchase_price_cents)
    .bind(product.sale_price_cents)
    .bind(product.low_stock_alert)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return match find_by_id(conn, &product.id).await? {
            Some(_) => Err(DbError::stale("Product", &product.id)),
            None => Err(DbError::not_found("Product", &product.id)),
        };
    }

    find_by_id(conn, &product.id)
        .await?
        .ok_or_else(|| DbError::not_found("Product", &product.id))
}

/// Lists all products ordered by name.
pub async fn list(conn: &mut SqliteConnection) -> DbResult<Vec<Product>> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name, id");
    let products = sqlx::query_as::<_, Product>(&sql).fetch_all(conn).await?;

    Ok(products)
}

/// Lists products at or below their low-stock threshold, emptiest first.
pub async fn list_low_stock(conn: &mut SqliteConnection) -> DbResult<Vec<Product>> {
    let sql = format!(
        "SELECT {PRODUCT_COLUMNS} FROM products \
         WHERE quantity <= low_stock_alert ORDER BY quantity, name"
    );
    let products = sqlx::query_as::<_, Product>(&sql).fetch_all(conn).await?;

    debug!(count = products.len(), "Low-stock products");
    Ok(products)
}

// =============================================================================
// Pool-Level Repository
// =============================================================================

/// Repository for product reads and catalog edits outside a movement.
///
/// ## Usage
/// ```rust,ignore
/// let product = db.products().find_by_id("uuid-here").await?;
/// let low = db.products().list_low_stock().await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    pub async fn find_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        find_by_id(&mut conn, id).await
    }

    pub async fn find_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        find_by_sku(&mut conn, sku).await
    }

    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let mut conn = self.pool.acquire().await?;
        list(&mut conn).await
    }

    pub async fn list_low_stock(&self) -> DbResult<Vec<Product>> {
        let mut conn = self.pool.acquire().await?;
        list_low_stock(&mut conn).await
    }

    /// See [`update_catalog`].
    pub async fn update_catalog(&self, product: &Product) -> DbResult<Product> {
        let mut conn = self.pool.acquire().await?;
        update_catalog(&mut conn, product).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let db = db().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let product = insert(
            &mut conn,
            &NewProduct::new("Coca-Cola 330ml", 150)
                .sku("COKE-330")
                .opening_quantity(24),
        )
        .await
        .unwrap();

        assert_eq!(product.quantity, 24);
        assert_eq!(product.version, 0);
        assert_eq!(product.low_stock_alert, DEFAULT_LOW_STOCK_ALERT);

        let by_id = find_by_id(&mut conn, &product.id).await.unwrap().unwrap();
        assert_eq!(by_id, product);

        let by_sku = find_by_sku(&mut conn, "COKE-330").await.unwrap().unwrap();
        assert_eq!(by_sku.id, product.id);

        assert!(find_by_id(&mut conn, "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_sku() {
        let db = db().await;
        let mut conn = db.pool().acquire().await.unwrap();

        insert(&mut conn, &NewProduct::new("A", 1).sku("DUP"))
            .await
            .unwrap();
        let err = insert(&mut conn, &NewProduct::new("B", 1).sku("DUP"))
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::UniqueViolation { ref value, .. } if value == "DUP"));
    }

    #[tokio::test]
    async fn test_stock_delta_checks_version() {
        let db = db().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let p = insert(&mut conn, &NewProduct::new("A", 1).opening_quantity(5))
            .await
            .unwrap();

        let v1 = apply_stock_delta(&mut conn, &p.id, 0, -2).await.unwrap();
        assert_eq!(v1, 1);

        // Stale version
        let err = apply_stock_delta(&mut conn, &p.id, 0, -1).await.unwrap_err();
        assert!(err.is_retryable());

        let after = find_by_id(&mut conn, &p.id).await.unwrap().unwrap();
        assert_eq!(after.quantity, 3);
        assert_eq!(after.version, 1);
    }

    #[tokio::test]
    async fn test_stock_delta_never_goes_negative() {
        let db = db().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let p = insert(&mut conn, &NewProduct::new("A", 1).opening_quantity(2))
            .await
            .unwrap();

        assert!(apply_stock_delta(&mut conn, &p.id, 0, -3).await.is_err());
        let after = find_by_id(&mut conn, &p.id).await.unwrap().unwrap();
        assert_eq!(after.quantity, 2);
        assert_eq!(after.version, 0);
    }

    #[tokio::test]
    async fn test_update_catalog_keeps_quantity() {
        let db = db().await;
        let repo = db.products();
        let mut p = {
            let mut conn = db.pool().acquire().await.unwrap();
            insert(&mut conn, &NewProduct::new("A", 100).opening_quantity(4))
                .await
                .unwrap()
        };

        p.sale_price_cents = 250;
        p.quantity = 999;
        let updated = repo.update_catalog(&p).await.unwrap();

        assert_eq!(updated.sale_price_cents, 250);
        assert_eq!(updated.quantity, 4);
        assert_eq!(updated.version, 1);

        // Same stale copy again
        assert!(matches!(
            repo.update_catalog(&p).await,
            Err(DbError::StaleWrite { .. })
        ));
    }

    #[tokio::test]
    async fn test_low_stock_listing() {
        let db = db().await;
        {
            let mut conn = db.pool().acquire().await.unwrap();
            insert(&mut conn, &NewProduct::new("Plenty", 1).opening_quantity(50))
                .await
                .unwrap();
            insert(&mut conn, &NewProduct::new("Scarce", 1).opening_quantity(2))
                .await
                .unwrap();
        }

        let low = db.products().list_low_stock().await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].name, "Scarce");
        assert_eq!(db.products().list().await.unwrap().len(), 2);
    }
}
