//! Application state shared across handlers.

use std::sync::Arc;

use tower_sessions::Session;

use mocktail_core::{Catalog, MonotonicIds};

use crate::config::{DataLocation, StorefrontConfig};
use crate::services::{
    CheckoutService, InFlightPayments, PaymentGateway, ProfileStore, SimulatedGateway,
};
use crate::storage::{
    FileStore, KeyValueStore, MemoryStore, SessionStorage, StorageError, observe_issued_ids,
};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the durable store, the menu and the payment gateway.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    store: Arc<dyn KeyValueStore>,
    catalog: Catalog,
    payments: Arc<dyn PaymentGateway>,
    ids: MonotonicIds,
    in_flight: InFlightPayments,
}

impl AppState {
    /// Create application state from already-built collaborators.
    #[must_use]
    pub fn new(
        config: StorefrontConfig,
        store: Arc<dyn KeyValueStore>,
        payments: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                catalog: Catalog::builtin(),
                payments,
                ids: MonotonicIds::new(),
                in_flight: InFlightPayments::new(),
            }),
        }
    }

    /// Open the configured store and build state with the simulated gateway.
    ///
    /// The ID generator is primed past every stored user and order ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the data file cannot be read.
    pub async fn from_config(config: StorefrontConfig) -> Result<Self, StorageError> {
        let store: Arc<dyn KeyValueStore> = match &config.data {
            DataLocation::Memory => Arc::new(MemoryStore::new()),
            DataLocation::File(path) => Arc::new(FileStore::open(path).await?),
        };
        let payments: Arc<dyn PaymentGateway> = Arc::new(SimulatedGateway::from(config.payment));

        let state = Self::new(config, store, payments);
        state.prime_ids().await?;
        Ok(state)
    }

    async fn prime_ids(&self) -> Result<(), StorageError> {
        observe_issued_ids(self.store(), &self.inner.ids).await
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// The durable key-value store.
    #[must_use]
    pub fn store(&self) -> &dyn KeyValueStore {
        self.inner.store.as_ref()
    }

    /// The mocktail menu.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    /// The payment gateway.
    #[must_use]
    pub fn payments(&self) -> &dyn PaymentGateway {
        self.inner.payments.as_ref()
    }

    /// User and order ID source.
    #[must_use]
    pub fn ids(&self) -> &MonotonicIds {
        &self.inner.ids
    }

    /// Profile store for one browser session.
    #[must_use]
    pub fn profiles<'a>(&'a self, session: &'a SessionStorage) -> ProfileStore<'a> {
        ProfileStore::new(self.store(), session, self.ids())
    }

    /// Checkout service for one browser session.
    #[must_use]
    pub fn checkout<'a>(&'a self, session: &'a SessionStorage) -> CheckoutService<'a> {
        CheckoutService::new(
            self.profiles(session),
            self.payments(),
            &self.inner.in_flight,
        )
    }
}

/// Wrap the request's session for the profile store.
#[must_use]
pub fn session_storage(session: &Session) -> SessionStorage {
    SessionStorage::new(session.clone())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use chrono::Utc;
    use mocktail_core::{NewUser, UserId};

    use crate::storage::UserRepository;

    use super::*;

    fn memory_config() -> StorefrontConfig {
        let vars: HashMap<&str, &str> = [
            ("STOREFRONT_BASE_URL", "http://localhost:3000"),
            ("STOREFRONT_DATA_PATH", ":memory:"),
        ]
        .into_iter()
        .collect();
        StorefrontConfig::from_lookup(|k| vars.get(k).map(|v| (*v).to_owned())).unwrap()
    }

    #[tokio::test]
    async fn test_ids_are_primed_past_stored_records() {
        let store = Arc::new(MemoryStore::new());
        let user = NewUser {
            email: mocktail_core::Email::parse("a@x.com").unwrap(),
            first_name: "Ada".to_owned(),
            last_name: "Lovelace".to_owned(),
            phone: String::new(),
            address: String::new(),
            date_of_birth: String::new(),
            preferences: Vec::new(),
        }
        .into_user(UserId::new("99999999999999"), Utc::now());
        UserRepository::new(store.as_ref()).insert(&user).await.unwrap();

        let state = AppState::new(
            memory_config(),
            store,
            Arc::new(SimulatedGateway::always_approve()),
        );
        state.prime_ids().await.unwrap();

        assert!(state.ids().next() > 99_999_999_999_999);
    }

    #[tokio::test]
    async fn test_from_config_uses_memory_store() {
        let state = AppState::from_config(memory_config()).await.unwrap();
        assert!(state.store().keys().await.unwrap().is_empty());
        assert_eq!(state.catalog().len(), 25);
    }
}
