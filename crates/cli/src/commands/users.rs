//! Registered user listing.

use mocktail_storefront::storage::{KeyValueStore, UserRepository};

use super::CliError;

/// Print every registered user, oldest first.
pub async fn list(store: &dyn KeyValueStore) -> Result<(), CliError> {
    let users = UserRepository::new(store).list().await?;

    tracing::info!("{} user(s)", users.len());
    for user in &users {
        tracing::info!(
            "{}  {:<32} {:<24} since {}",
            user.id,
            user.email,
            user.full_name(),
            user.created_at.format("%Y-%m-%d")
        );
    }
    Ok(())
}
