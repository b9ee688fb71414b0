//! Order repository over the durable store.

use mocktail_core::{Order, UserId};

use super::{KeyValueStore, StorageError, keys, load_json, update_json};

/// Repository for orders. All users' orders share one array.
pub struct OrderRepository<'a> {
    store: &'a dyn KeyValueStore,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(store: &'a dyn KeyValueStore) -> Self {
        Self { store }
    }

    /// Every order, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store fails.
    pub async fn list(&self) -> Result<Vec<Order>, StorageError> {
        load_json(self.store, keys::ORDERS).await
    }

    /// Orders owned by `user_id`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store fails.
    pub async fn for_user(&self, user_id: &UserId) -> Result<Vec<Order>, StorageError> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|o| &o.user_id == user_id)
            .collect())
    }

    /// Append orders in one atomic read-modify-write.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store fails.
    pub async fn append(&self, new: &[Order]) -> Result<(), StorageError> {
        if new.is_empty() {
            return Ok(());
        }
        update_json(self.store, keys::ORDERS, |orders: &mut Vec<Order>| {
            orders.extend_from_slice(new);
        })
        .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use mocktail_core::{NewOrder, OrderId, OrderStatus, Price};

    use super::*;
    use crate::storage::MemoryStore;

    fn order(id: &str, user: &str) -> Order {
        NewOrder {
            name: "Berry Mojito".to_owned(),
            ingredients: vec!["Mint".to_owned()],
            price: Price::from_cents(1099),
            special_instructions: Some("Quantity: 1".to_owned()),
        }
        .into_order(OrderId::new(id), UserId::new(user), Utc::now())
    }

    #[tokio::test]
    async fn test_append_and_filter_by_owner() {
        let store = MemoryStore::new();
        let orders = OrderRepository::new(&store);

        orders
            .append(&[order("1", "alice"), order("2", "bob")])
            .await
            .unwrap();
        orders.append(&[order("3", "alice")]).await.unwrap();
        orders.append(&[]).await.unwrap();

        let alice = orders.for_user(&UserId::new("alice")).await.unwrap();
        assert_eq!(alice.len(), 2);
        assert!(alice.iter().all(|o| o.status == OrderStatus::Pending));
        assert_eq!(orders.list().await.unwrap().len(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_keep_every_order() {
        let store = std::sync::Arc::new(MemoryStore::new());

        let tasks: Vec<_> = (0..40)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    OrderRepository::new(store.as_ref())
                        .append(&[order(&i.to_string(), &format!("user{i}"))])
                        .await
                        .unwrap();
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(OrderRepository::new(store.as_ref()).list().await.unwrap().len(), 40);
    }

    #[tokio::test]
    async fn test_stored_layout_is_camel_case() {
        let store = MemoryStore::new();
        OrderRepository::new(&store)
            .append(&[order("1", "alice")])
            .await
            .unwrap();

        let raw = store.get(keys::ORDERS).await.unwrap().unwrap();
        assert!(raw.contains("\"userId\":\"alice\""));
        assert!(raw.contains("\"specialInstructions\":\"Quantity: 1\""));
        assert!(raw.contains("\"price\":\"10.99\""));
    }
}
