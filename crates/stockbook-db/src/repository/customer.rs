//! # Customer Repository
//!
//! Customers a sale can be billed to.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use stockbook_core::Customer;

const CUSTOMER_COLUMNS: &str = "id, name, phone, address, balance_cents, created_at, updated_at";

pub async fn find_by_id(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Customer>> {
    let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1");
    let customer = sqlx::query_as::<_, Customer>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?;

    Ok(customer)
}

/// Inserts a customer with a zero balance.
pub async fn insert(
    conn: &mut SqliteConnection,
    name: &str,
    phone: Option<&str>,
    address: Option<&str>,
) -> DbResult<Customer> {
    let now = Utc::now();
    let customer = Customer {
        id: Uuid::new_v4().to_string(),
        name: name.trim().to_string(),
        phone: phone.map(str::to_string),
        address: address.map(str::to_string),
        balance_cents: 0,
        created_at: now,
        updated_at: now,
    };

    debug!(id = %customer.id, "Inserting customer");

    sqlx::query(
        r#"
        INSERT INTO customers (id, name, phone, address, balance_cents, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&customer.id)
    .bind(&customer.name)
    .bind(&customer.phone)
    .bind(&customer.address)
    .bind(customer.balance_cents)
    .bind(customer.created_at)
    .bind(customer.updated_at)
    .execute(conn)
    .await?;

    Ok(customer)
}

/// Repository for customer records.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    pub async fn find_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let mut conn = self.pool.acquire().await?;
        find_by_id(&mut conn, id).await
    }

    pub async fn insert(
        &self,
        name: &str,
        phone: Option<&str>,
        address: Option<&str>,
    ) -> DbResult<Customer> {
        let mut conn = self.pool.acquire().await?;
        insert(&mut conn, name, phone, address).await
    }
}

#[cfg(test)]
mod tests {
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_insert_and_find() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let customers = db.customers();

        let c = customers
            .insert("Walk-in", Some("555-0100"), None)
            .await
            .unwrap();
        assert_eq!(c.balance_cents, 0);

        let found = customers.find_by_id(&c.id).await.unwrap().unwrap();
        assert_eq!(found, c);
        assert!(customers.find_by_id("nope").await.unwrap().is_none());
    }
}
