//! Key-value view over the browser session.

use async_trait::async_trait;
use tower_sessions::Session;

use super::{KeyValueStore, StorageError, UpdateFn};

/// Stores raw JSON text in the per-browser session.
///
/// Used for the `currentUser` snapshot, which belongs to one browser rather
/// than to the shared durable store.
#[derive(Debug, Clone)]
pub struct SessionStorage {
    session: Session,
}

impl SessionStorage {
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }
}

#[async_trait]
impl KeyValueStore for SessionStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.session.get::<String>(key).await?)
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.session.insert(key, value).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.session.remove_value(key).await?;
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        // Sessions do not enumerate their keys; only the snapshot lives here.
        Ok(self
            .get(super::keys::CURRENT_USER)
            .await?
            .map(|_| vec![super::keys::CURRENT_USER.to_owned()])
            .unwrap_or_default())
    }

    /// Read then write. Not atomic across concurrent requests from one browser.
    async fn update<'a>(&self, key: &str, apply: UpdateFn<'a>) -> Result<(), StorageError> {
        if let Some(value) = apply(self.get(key).await?)? {
            self.set(key, value).await?;
        }
        Ok(())
    }
}
