//! Per-user order listing.

use mocktail_core::{Email, Order, Price};
use mocktail_storefront::storage::{KeyValueStore, OrderRepository, UserRepository};

use super::CliError;

/// Orders for the user registered under `email`, oldest first.
pub async fn for_email(store: &dyn KeyValueStore, email: &str) -> Result<Vec<Order>, CliError> {
    let parsed = Email::parse(email.trim())
        .map_err(|e| CliError::InvalidArgument(format!("{email}: {e}")))?;

    let user = UserRepository::new(store)
        .get_by_email(&parsed)
        .await?
        .ok_or_else(|| CliError::UnknownUser(email.to_owned()))?;

    Ok(OrderRepository::new(store).for_user(&user.id).await?)
}

/// Print the orders of one user with a running total.
pub async fn list(store: &dyn KeyValueStore, email: &str) -> Result<(), CliError> {
    let orders = for_email(store, email).await?;

    for order in &orders {
        tracing::info!(
            "{}  {}  {:<28} {:>8}  {:<9}  {}",
            order.id,
            order.order_date.format("%Y-%m-%d %H:%M"),
            order.name,
            order.price,
            order.status,
            order.special_instructions.as_deref().unwrap_or_default()
        );
    }
    let spent: Price = orders.iter().map(|o| o.price).sum();
    tracing::info!("{} order(s), {} in total", orders.len(), spent);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use mocktail_core::{NewOrder, NewUser, OrderId, UserId};
    use mocktail_storefront::storage::MemoryStore;

    use super::*;

    async fn store_with_orders() -> MemoryStore {
        let store = MemoryStore::new();
        let user = NewUser {
            email: Email::parse("ada@example.com").unwrap(),
            first_name: "Ada".to_owned(),
            last_name: "Lovelace".to_owned(),
            phone: String::new(),
            address: String::new(),
            date_of_birth: String::new(),
            preferences: Vec::new(),
        }
        .into_user(UserId::new("1"), Utc::now());
        UserRepository::new(&store).insert(&user).await.unwrap();

        let orders: Vec<Order> = [("2", "1"), ("3", "other")]
            .into_iter()
            .map(|(id, owner)| {
                NewOrder {
                    name: "Berry Mojito".to_owned(),
                    ingredients: Vec::new(),
                    price: Price::from_cents(899),
                    special_instructions: Some("Quantity: 1".to_owned()),
                }
                .into_order(OrderId::new(id), UserId::new(owner), Utc::now())
            })
            .collect();
        OrderRepository::new(&store).append(&orders).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_for_email_filters_by_owner() {
        let store = store_with_orders().await;
        let orders = for_email(&store, "ADA@example.com").await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].id.as_str(), "2");
    }

    #[tokio::test]
    async fn test_for_email_unknown_user() {
        let store = store_with_orders().await;
        assert!(matches!(
            for_email(&store, "nobody@example.com").await,
            Err(CliError::UnknownUser(_))
        ));
        assert!(matches!(
            for_email(&store, "not-an-email").await,
            Err(CliError::InvalidArgument(_))
        ));
    }
}
