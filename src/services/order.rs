//! Checkout and order fulfilment.

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::db::repositories::{OrderRepository, ProductRepository};
use crate::models::{NewOrder, Order, OrderLine, OrderLines, OrderStatus, PlaceOrderInput};
use crate::services::validation::{is_valid_email, optional, required};

/// Upper bound on a single line's quantity
pub const MAX_QUANTITY: i64 = 999;
const MAX_LINES: usize = 100;

#[derive(Debug, Error)]
pub enum OrderServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub struct OrderService {
    repo: Arc<dyn OrderRepository>,
    products: Arc<dyn ProductRepository>,
}

impl OrderService {
    pub fn new(repo: Arc<dyn OrderRepository>, products: Arc<dyn ProductRepository>) -> Self {
        Self { repo, products }
    }

    /// Validate a checkout form and store the order.
    ///
    /// Prices come from the catalogue at the time of ordering; each line
    /// keeps its own copy of the product name and unit price.
    pub async fn place(&self, input: PlaceOrderInput) -> Result<Order, OrderServiceError> {
        let invalid = OrderServiceError::Validation;
        let customer_name = required(&input.customer_name, "Name is required").map_err(invalid)?;
        let email = required(&input.email, "Email is required").map_err(invalid)?;
        if !is_valid_email(&email) {
            return Err(invalid("Invalid email address".to_string()));
        }
        let phone = required(&input.phone, "Phone is required").map_err(invalid)?;
        let address = required(&input.address, "Address is required").map_err(invalid)?;

        if input.items.is_empty() {
            return Err(invalid("Order must contain at least one item".to_string()));
        }
        if input.items.len() > MAX_LINES {
            return Err(invalid(format!("Order may contain at most {} items", MAX_LINES)));
        }

        // Merge repeated products into one line, keeping first-seen order
        let mut quantities: Vec<(i64, i64)> = Vec::new();
        let mut index: HashMap<i64, usize> = HashMap::new();
        for item in &input.items {
            if item.quantity < 1 {
                return Err(invalid("Quantity must be at least 1".to_string()));
            }
            if item.quantity > MAX_QUANTITY {
                return Err(too_many());
            }
            match index.get(&item.product_id) {
                Some(&i) => {
                    let merged = quantities[i].1.checked_add(item.quantity).ok_or_else(too_many)?;
                    quantities[i].1 = merged;
                }
                None => {
                    index.insert(item.product_id, quantities.len());
                    quantities.push((item.product_id, item.quantity));
                }
            }
        }

        let mut lines = Vec::with_capacity(quantities.len());
        for (product_id, quantity) in quantities {
            if quantity > MAX_QUANTITY {
                return Err(too_many());
            }
            let product = match self.products.get_by_id(product_id).await? {
                Some(p) if p.active => p,
                _ => {
                    return Err(invalid(format!("Product {} is not available", product_id)));
                }
            };
            let line_total_cents = product
                .price_cents
                .checked_mul(quantity)
                .ok_or_else(total_too_large)?;
            lines.push(OrderLine {
                product_id,
                name: product.name,
                unit_price_cents: product.price_cents,
                quantity,
                line_total_cents,
            });
        }

        let items = OrderLines(lines);
        let total_cents = items.checked_total_cents().ok_or_else(total_too_large)?;
        let order = self
            .repo
            .create(&NewOrder {
                customer_name,
                email: email.to_lowercase(),
                phone,
                address,
                note: optional(input.note.as_deref()),
                total_cents,
                items,
            })
            .await?;

        tracing::info!(
            "Order {} placed: {} line(s), total {} cents",
            order.id,
            order.items.0.len(),
            order.total_cents
        );
        Ok(order)
    }

    pub async fn list(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, OrderServiceError> {
        Ok(self.repo.list(status).await?)
    }

    pub async fn get(&self, id: i64) -> Result<Order, OrderServiceError> {
        self.repo.get_by_id(id).await?.ok_or_else(order_not_found)
    }

    /// Move an order along its lifecycle.
    pub async fn update_status(&self, id: i64, next: OrderStatus) -> Result<Order, OrderServiceError> {
        let order = self.get(id).await?;
        if !order.status.can_transition_to(next) {
            return Err(OrderServiceError::Validation(format!(
                "Cannot change order status from {} to {}",
                order.status, next
            )));
        }

        let order = self.repo.set_status(id, next).await?.ok_or_else(order_not_found)?;
        tracing::info!("Order {} is now {}", id, next);
        Ok(order)
    }
}

fn too_many() -> OrderServiceError {
    OrderServiceError::Validation(format!("Quantity must be at most {}", MAX_QUANTITY))
}

fn total_too_large() -> OrderServiceError {
    OrderServiceError::Validation("Order total is too large".to_string())
}

fn order_not_found() -> OrderServiceError {
    OrderServiceError::NotFound("Order not found".to_string())
}
