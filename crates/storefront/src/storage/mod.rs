//! Durable key-value storage.
//!
//! All persistent data is kept as JSON text under a handful of string keys,
//! the same layout a browser's local storage would hold:
//!
//! ## Keys
//!
//! - `users` - JSON array of every registered user
//! - `password_<userId>` - Argon2 PHC digest for one user
//! - `mocktailOrders` - JSON array of every order, across users
//! - `currentUser` - snapshot of the signed-in user (per-browser session scope)
//!
//! # Backends
//!
//! - [`MemoryStore`] - process memory, used for tests and `:memory:` config
//! - [`FileStore`] - a single JSON file rewritten on every change
//! - [`SessionStorage`] - adapter over the browser session for `currentUser`
//!
//! Corrupt values never surface as errors: [`load_json`] logs them and
//! hands back an empty collection.

mod file;
mod memory;
pub mod orders;
mod session;
pub mod users;

use async_trait::async_trait;
use mocktail_core::MonotonicIds;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use orders::OrderRepository;
pub use session::SessionStorage;
pub use users::UserRepository;

/// Storage keys.
pub mod keys {
    use mocktail_core::UserId;

    /// Registered users.
    pub const USERS: &str = "users";

    /// Orders across all users.
    pub const ORDERS: &str = "mocktailOrders";

    /// Session snapshot of the signed-in user.
    pub const CURRENT_USER: &str = "currentUser";

    /// Prefix of per-user credential keys.
    pub const PASSWORD_PREFIX: &str = "password_";

    /// Credential key for `user_id`.
    #[must_use]
    pub fn password(user_id: &UserId) -> String {
        format!("{PASSWORD_PREFIX}{user_id}")
    }
}

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A value could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The browser session could not be read or written.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// A backend returned from `update` without running the update.
    #[error("update of {0} was not applied")]
    UpdateNotApplied(String),
}

/// Computes the next value under a key from the current one.
///
/// Returning `Ok(None)` leaves the value as it was.
pub type UpdateFn<'a> =
    Box<dyn FnOnce(Option<String>) -> Result<Option<String>, StorageError> + Send + 'a>;

/// A string-keyed store of JSON text values.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the raw value under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the value under `key`.
    async fn set(&self, key: &str, value: String) -> Result<(), StorageError>;

    /// Delete `key`. Missing keys are not an error.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Every key currently stored.
    async fn keys(&self) -> Result<Vec<String>, StorageError>;

    /// Read-modify-write the value under `key` with no other writer in
    /// between.
    async fn update<'a>(&self, key: &str, apply: UpdateFn<'a>) -> Result<(), StorageError>;

    /// Cheap liveness check used by the readiness endpoint.
    async fn ping(&self) -> Result<(), StorageError> {
        self.keys().await.map(|_| ())
    }
}

/// Read and decode the JSON value under `key`.
///
/// A missing key or a value that does not decode yields `T::default()`; the
/// latter is logged at `warn` and otherwise ignored.
///
/// # Errors
///
/// Returns `StorageError` only if the store itself fails.
pub async fn load_json<T>(store: &dyn KeyValueStore, key: &str) -> Result<T, StorageError>
where
    T: DeserializeOwned + Default,
{
    let Some(raw) = store.get(key).await? else {
        return Ok(T::default());
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Ok(value),
        Err(e) => {
            tracing::warn!(key, error = %e, "Malformed stored value, treating as empty");
            Ok(T::default())
        }
    }
}

/// Encode `value` as JSON and store it under `key`.
///
/// # Errors
///
/// Returns `StorageError` if encoding or the write fails.
pub async fn save_json<T>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<(), StorageError>
where
    T: Serialize + ?Sized,
{
    let raw = serde_json::to_string(value)?;
    store.set(key, raw).await
}

/// Decode the value under `key`, let `f` modify it, and store the result,
/// all as one atomic step.
///
/// Decoding follows [`load_json`]. Nothing is written when `f` leaves the
/// value unchanged.
///
/// # Errors
///
/// Returns `StorageError` if encoding or the store fails.
pub async fn update_json<T, R, F>(
    store: &dyn KeyValueStore,
    key: &str,
    f: F,
) -> Result<R, StorageError>
where
    T: DeserializeOwned + Serialize + Default,
    F: FnOnce(&mut T) -> R + Send,
    R: Send,
{
    let mut outcome = None;
    let slot = &mut outcome;
    let owned_key = key.to_owned();

    store
        .update(
            key,
            Box::new(move |raw: Option<String>| {
                let mut value: T = match raw.as_deref().map(serde_json::from_str) {
                    Some(Ok(value)) => value,
                    Some(Err(e)) => {
                        tracing::warn!(
                            key = %owned_key,
                            error = %e,
                            "Malformed stored value, treating as empty"
                        );
                        T::default()
                    }
                    None => T::default(),
                };
                let before = serde_json::to_string(&value)?;
                *slot = Some(f(&mut value));
                let after = serde_json::to_string(&value)?;
                Ok((after != before).then_some(after))
            }),
        )
        .await?;

    outcome.ok_or_else(|| StorageError::UpdateNotApplied(key.to_owned()))
}

/// Move `ids` past every user and order id already in `store`.
///
/// Ids are millisecond timestamps, so a restarted process whose clock is
/// behind the last issued id would otherwise hand out duplicates.
///
/// # Errors
///
/// Returns `StorageError` if the store fails.
pub async fn observe_issued_ids(
    store: &dyn KeyValueStore,
    ids: &MonotonicIds,
) -> Result<(), StorageError> {
    let users = UserRepository::new(store).list().await?;
    let orders = OrderRepository::new(store).list().await?;

    let issued = users
        .iter()
        .map(|u| u.id.as_str())
        .chain(orders.iter().map(|o| o.id.as_str()))
        .filter_map(|id| id.parse::<i64>().ok())
        .max();
    if let Some(last) = issued {
        ids.observe(last);
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_missing_key_is_default() {
        let store = MemoryStore::new();
        let users: Vec<String> = load_json(&store, keys::USERS).await.unwrap();
        assert!(users.is_empty());
    }

    #[tokio::test]
    async fn test_load_malformed_value_is_default() {
        let store = MemoryStore::new();
        store
            .set(keys::ORDERS, "{not json".to_string())
            .await
            .unwrap();

        let orders: Vec<String> = load_json(&store, keys::ORDERS).await.unwrap();

        assert!(orders.is_empty());
        // The bad value is left in place for `store check` to report.
        assert_eq!(
            store.get(keys::ORDERS).await.unwrap().as_deref(),
            Some("{not json")
        );
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let store = MemoryStore::new();
        save_json(&store, "numbers", &vec![1, 2, 3]).await.unwrap();
        let numbers: Vec<i32> = load_json(&store, "numbers").await.unwrap();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_update_json_returns_closure_result() {
        let store = MemoryStore::new();
        let len = update_json(&store, "numbers", |n: &mut Vec<i32>| {
            n.push(7);
            n.len()
        })
        .await
        .unwrap();

        assert_eq!(len, 1);
        assert_eq!(store.get("numbers").await.unwrap().as_deref(), Some("[7]"));
    }

    #[tokio::test]
    async fn test_update_json_without_change_leaves_malformed_value() {
        let store = MemoryStore::new();
        store.set(keys::ORDERS, "{not json".to_owned()).await.unwrap();

        let seen = update_json(&store, keys::ORDERS, |o: &mut Vec<String>| o.len())
            .await
            .unwrap();

        assert_eq!(seen, 0);
        assert_eq!(
            store.get(keys::ORDERS).await.unwrap().as_deref(),
            Some("{not json")
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_are_not_lost() {
        let store = std::sync::Arc::new(MemoryStore::new());

        let tasks: Vec<_> = (0..50)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    update_json(store.as_ref(), "numbers", move |n: &mut Vec<i32>| n.push(i))
                        .await
                        .unwrap();
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let numbers: Vec<i32> = load_json(store.as_ref(), "numbers").await.unwrap();
        assert_eq!(numbers.len(), 50);
    }

    #[test]
    fn test_password_key() {
        let id = mocktail_core::UserId::new("1700000000000");
        assert_eq!(keys::password(&id), "password_1700000000000");
    }
}
