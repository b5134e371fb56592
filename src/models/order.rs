//! Order model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

use super::ParseEnumError;

/// Fulfilment state of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Allowed moves: pending → confirmed → shipped → delivered, and
    /// cancellation before shipping.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Confirmed, Shipped)
                | (Shipped, Delivered)
                | (Pending, Cancelled)
                | (Confirmed, Cancelled)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            _ => Err(ParseEnumError::new("order status", s)),
        }
    }
}

impl TryFrom<String> for OrderStatus {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A line item snapshotted at order time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: i64,
    pub name: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
    pub line_total_cents: i64,
}

/// Line items, stored as a JSON array in `orders.items`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderLines(pub Vec<OrderLine>);

impl OrderLines {
    /// Sum of the line totals, `None` on overflow
    pub fn checked_total_cents(&self) -> Option<i64> {
        self.0
            .iter()
            .try_fold(0i64, |total, line| total.checked_add(line.line_total_cents))
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.0)
    }
}

impl TryFrom<String> for OrderLines {
    type Error = serde_json::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        serde_json::from_str(&value).map(OrderLines)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: i64,
    pub customer_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub note: Option<String>,
    #[sqlx(try_from = "String")]
    pub items: OrderLines,
    pub total_cents: i64,
    #[sqlx(try_from = "String")]
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One requested product in a checkout form
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderItemInput {
    pub product_id: i64,
    pub quantity: i64,
}

/// Checkout form. Any client-side total is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaceOrderInput {
    pub customer_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub note: Option<String>,
    pub items: Vec<OrderItemInput>,
}

/// Validated order about to be inserted
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub note: Option<String>,
    pub items: OrderLines,
    pub total_cents: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(Shipped));
        assert!(Shipped.can_transition_to(Delivered));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Cancelled));

        assert!(!Pending.can_transition_to(Shipped));
        assert!(!Shipped.can_transition_to(Cancelled));
        assert!(!Delivered.can_transition_to(Pending));
        assert!(!Cancelled.can_transition_to(Confirmed));
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn test_order_lines_json() {
        let lines = OrderLines(vec![OrderLine {
            product_id: 3,
            name: "Red roses".to_string(),
            unit_price_cents: 1500,
            quantity: 2,
            line_total_cents: 3000,
        }]);
        let json = lines.to_json().unwrap();
        assert!(json.starts_with('['));
        assert_eq!(OrderLines::try_from(json).unwrap(), lines);
        assert_eq!(lines.checked_total_cents(), Some(3000));
    }

    #[test]
    fn test_order_lines_total_overflow() {
        let line = OrderLine {
            product_id: 1,
            name: "Orchid".to_string(),
            unit_price_cents: i64::MAX,
            quantity: 1,
            line_total_cents: i64::MAX,
        };
        assert_eq!(OrderLines(vec![line.clone()]).checked_total_cents(), Some(i64::MAX));
        assert_eq!(OrderLines(vec![line.clone(), line]).checked_total_cents(), None);
    }
}
