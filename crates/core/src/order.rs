//! Order records created at checkout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cart::CartLineItem;
use crate::types::{OrderId, OrderStatus, Price, UserId};

/// One ordered mocktail line, owned by a user.
///
/// Serialized with camelCase field names; this is the shape of each entry
/// in the persisted `mocktailOrders` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    /// Product name at the time of ordering.
    pub name: String,
    /// Ingredient list snapshot.
    #[serde(default)]
    pub ingredients: Vec<String>,
    /// Total for the line (unit price times quantity).
    pub price: Price,
    #[serde(default)]
    pub status: OrderStatus,
    pub order_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_instructions: Option<String>,
}

/// The caller-supplied part of an order.
///
/// The profile store fills in the identifier, owner, timestamp and initial
/// status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub name: String,
    pub ingredients: Vec<String>,
    pub price: Price,
    pub special_instructions: Option<String>,
}

impl NewOrder {
    /// Build the order for one cart line.
    ///
    /// The price is the line total and the quantity is recorded in the
    /// special instructions.
    #[must_use]
    pub fn from_line(line: &CartLineItem) -> Self {
        Self {
            name: line.name.clone(),
            ingredients: line.ingredients.clone(),
            price: line.line_total(),
            special_instructions: Some(format!("Quantity: {}", line.quantity)),
        }
    }

    /// Complete the order for `user_id`, created `now` in the pending state.
    #[must_use]
    pub fn into_order(self, id: OrderId, user_id: UserId, now: DateTime<Utc>) -> Order {
        Order {
            id,
            user_id,
            name: self.name,
            ingredients: self.ingredients,
            price: self.price,
            status: OrderStatus::Pending,
            order_date: now,
            special_instructions: self.special_instructions,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::types::ProductId;

    #[test]
    fn test_from_line_uses_line_total_and_quantity() {
        let catalog = Catalog::builtin();
        let sunset = catalog.get(&ProductId::new("1")).unwrap();
        let mut line = CartLineItem::from_mocktail(sunset);
        line.quantity = 2;

        let order = NewOrder::from_line(&line).into_order(
            OrderId::new("100"),
            UserId::new("7"),
            Utc::now(),
        );

        assert_eq!(order.name, "Sunset Bliss");
        assert_eq!(order.price, Price::from_cents(2598));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.special_instructions.as_deref(), Some("Quantity: 2"));
        assert_eq!(order.ingredients.len(), 5);
    }

    #[test]
    fn test_serializes_camel_case() {
        let order = NewOrder {
            name: "Berry Mojito".to_owned(),
            ingredients: Vec::new(),
            price: Price::from_cents(1099),
            special_instructions: None,
        }
        .into_order(OrderId::new("1"), UserId::new("2"), Utc::now());

        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["userId"], "2");
        assert_eq!(json["status"], "pending");
        assert!(json.get("orderDate").is_some());
        assert!(json.get("specialInstructions").is_none());
    }
}
