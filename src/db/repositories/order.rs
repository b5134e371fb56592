//! Order repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use crate::db::{with_pool, DynDatabasePool, InsertId};
use crate::models::{NewOrder, Order, OrderStatus};

const COLUMNS: &str = "id, customer_name, email, phone, address, note, items, total_cents, status, \
     created_at, updated_at";

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn create(&self, order: &NewOrder) -> Result<Order>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Order>>;

    /// Newest first, optionally restricted to one status
    async fn list(&self, status: Option<OrderStatus>) -> Result<Vec<Order>>;

    async fn set_status(&self, id: i64, status: OrderStatus) -> Result<Option<Order>>;
}

pub struct SqlxOrderRepository {
    pool: DynDatabasePool,
}

impl SqlxOrderRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn OrderRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl OrderRepository for SqlxOrderRepository {
    async fn create(&self, order: &NewOrder) -> Result<Order> {
        let now = Utc::now();
        let items = order.items.to_json().context("Failed to encode order items")?;
        let sql = "INSERT INTO orders (customer_name, email, phone, address, note, items, total_cents, \
                   status, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";
        let id = with_pool!(self.pool, |p| sqlx::query(sql)
            .bind(&order.customer_name)
            .bind(&order.email)
            .bind(&order.phone)
            .bind(&order.address)
            .bind(&order.note)
            .bind(&items)
            .bind(order.total_cents)
            .bind(OrderStatus::Pending.as_str())
            .bind(now)
            .bind(now)
            .execute(p)
            .await
            .context("Failed to insert order")?
            .insert_id());

        self.get_by_id(id)
            .await?
            .context("Order not found after insert")
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Order>> {
        let sql = format!("SELECT {} FROM orders WHERE id = ?", COLUMNS);
        let row = with_pool!(self.pool, |p| sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .fetch_optional(p)
            .await?);
        Ok(row)
    }

    async fn list(&self, status: Option<OrderStatus>) -> Result<Vec<Order>> {
        let filter = if status.is_some() { "WHERE status = ?" } else { "" };
        let sql = format!(
            "SELECT {} FROM orders {} ORDER BY created_at DESC, id DESC",
            COLUMNS, filter
        );
        let rows = with_pool!(self.pool, |p| {
            let mut query = sqlx::query_as::<_, Order>(&sql);
            if let Some(status) = status {
                query = query.bind(status.as_str());
            }
            query.fetch_all(p).await?
        });
        Ok(rows)
    }

    async fn set_status(&self, id: i64, status: OrderStatus) -> Result<Option<Order>> {
        with_pool!(self.pool, |p| {
            sqlx::query("UPDATE orders SET status = ?, updated_at = ? WHERE id = ?")
                .bind(status.as_str())
                .bind(Utc::now())
                .bind(id)
                .execute(p)
                .await
                .context("Failed to update order status")?;
        });
        self.get_by_id(id).await
    }
}
