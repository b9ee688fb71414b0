//! Authentication and profile service.
//!
//! Owns the signed-in session state: registration, login and logout, profile
//! edits and the signed-in user's orders. User records and orders go to the
//! durable store; the `currentUser` snapshot goes to the browser session.
//!
//! ```text
//! Anonymous --register/login--> Authenticated --logout--> Anonymous
//! ```
//!
//! Failed operations leave the session as it was.

mod error;
mod password;

pub use error::AuthError;
pub use password::{MIN_PASSWORD_LENGTH, hash_password, validate_password, verify_password};

use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};

use mocktail_core::{Email, MonotonicIds, NewOrder, NewUser, Order, ProfileUpdate, User};

use crate::storage::{
    KeyValueStore, OrderRepository, StorageError, UserRepository, keys, save_json,
};

/// Registration form contents before validation.
#[derive(Debug)]
pub struct Registration {
    pub email: String,
    pub password: SecretString,
    pub password_confirm: SecretString,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address: String,
    pub date_of_birth: String,
    pub preferences: Vec<String>,
}

impl Registration {
    /// Check the form and produce the profile to store.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure in form order.
    pub fn validate(&self) -> Result<NewUser, AuthError> {
        let email = Email::parse(self.email.trim())?;
        if self.first_name.trim().is_empty() {
            return Err(AuthError::MissingField("First name"));
        }
        if self.last_name.trim().is_empty() {
            return Err(AuthError::MissingField("Last name"));
        }
        if self.password.expose_secret() != self.password_confirm.expose_secret() {
            return Err(AuthError::PasswordMismatch);
        }
        validate_password(&self.password)?;

        Ok(NewUser {
            email,
            first_name: self.first_name.trim().to_owned(),
            last_name: self.last_name.trim().to_owned(),
            phone: self.phone.trim().to_owned(),
            address: self.address.trim().to_owned(),
            date_of_birth: self.date_of_birth.trim().to_owned(),
            preferences: self.preferences.clone(),
        })
    }
}

/// Registration, login and profile operations for one browser session.
pub struct ProfileStore<'a> {
    users: UserRepository<'a>,
    orders: OrderRepository<'a>,
    session: &'a dyn KeyValueStore,
    ids: &'a MonotonicIds,
}

impl<'a> ProfileStore<'a> {
    /// Create a profile store over the durable store and one session.
    #[must_use]
    pub const fn new(
        store: &'a dyn KeyValueStore,
        session: &'a dyn KeyValueStore,
        ids: &'a MonotonicIds,
    ) -> Self {
        Self {
            users: UserRepository::new(store),
            orders: OrderRepository::new(store),
            session,
            ids,
        }
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// The signed-in user, if any.
    ///
    /// A snapshot that no longer decodes is removed and treated as signed out.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the session cannot be read.
    pub async fn current_user(&self) -> Result<Option<User>, AuthError> {
        let Some(raw) = self.session.get(keys::CURRENT_USER).await? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                tracing::warn!(error = %e, "Malformed session user, signing out");
                self.session.remove(keys::CURRENT_USER).await?;
                Ok(None)
            }
        }
    }

    async fn establish_session(&self, user: &User) -> Result<(), StorageError> {
        save_json(self.session, keys::CURRENT_USER, user).await
    }

    // =========================================================================
    // Registration & Login
    // =========================================================================

    /// Register a new user and sign them in.
    ///
    /// # Errors
    ///
    /// Returns a validation error for bad form input,
    /// `AuthError::UserAlreadyExists` if the email is taken (nothing is
    /// written), or `AuthError::Storage` if the store fails.
    pub async fn register(&self, registration: &Registration) -> Result<User, AuthError> {
        let profile = registration.validate()?;

        if self.users.get_by_email(&profile.email).await?.is_some() {
            return Err(AuthError::UserAlreadyExists);
        }

        let digest = hash_password(&registration.password)?;
        let user = profile.into_user(self.ids.user_id(), Utc::now());

        // A concurrent registration may have taken the email since the check.
        if !self.users.insert_if_email_free(&user).await? {
            return Err(AuthError::UserAlreadyExists);
        }
        self.users.set_password(&user.id, &digest).await?;
        self.establish_session(&user).await?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for a malformed email, unknown
    /// user or wrong password alike.
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<User, AuthError> {
        let email = Email::parse(email.trim()).map_err(|_| AuthError::InvalidCredentials)?;

        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        let digest = self
            .users
            .password(&user.id)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &digest)?;
        self.establish_session(&user).await?;

        tracing::info!(user_id = %user.id, "User logged in");
        Ok(user)
    }

    /// Sign out. Users and orders are untouched.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the session cannot be written.
    pub async fn logout(&self) -> Result<(), AuthError> {
        self.session.remove(keys::CURRENT_USER).await?;
        Ok(())
    }

    // =========================================================================
    // Profile
    // =========================================================================

    /// Apply `update` to the signed-in user.
    ///
    /// Returns `None` without a session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the store fails.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Option<User>, AuthError> {
        let Some(current) = self.current_user().await? else {
            return Ok(None);
        };

        let mut user = self
            .users
            .get_by_id(&current.id)
            .await?
            .unwrap_or(current);
        update.apply_to(&mut user);

        if !self.users.update(&user).await? {
            tracing::warn!(user_id = %user.id, "Session user missing from store");
        }
        self.establish_session(&user).await?;
        Ok(Some(user))
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Record one order for the signed-in user.
    ///
    /// Returns `None` without a session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the store fails.
    pub async fn add_order(&self, order: NewOrder) -> Result<Option<Order>, AuthError> {
        Ok(self.add_orders(vec![order]).await?.pop())
    }

    /// Record several orders for the signed-in user in one write.
    ///
    /// Returns an empty list without a session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the store fails.
    pub async fn add_orders(&self, orders: Vec<NewOrder>) -> Result<Vec<Order>, AuthError> {
        let Some(user) = self.current_user().await? else {
            return Ok(Vec::new());
        };

        let now = Utc::now();
        let created: Vec<Order> = orders
            .into_iter()
            .map(|o| o.into_order(self.ids.order_id(), user.id.clone(), now))
            .collect();

        self.orders.append(&created).await?;
        tracing::info!(user_id = %user.id, count = created.len(), "Orders recorded");
        Ok(created)
    }

    /// The signed-in user's orders, oldest first. Empty without a session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the store fails.
    pub async fn user_orders(&self) -> Result<Vec<Order>, AuthError> {
        match self.current_user().await? {
            Some(user) => Ok(self.orders.for_user(&user.id).await?),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use mocktail_core::{OrderStatus, Price};

    use super::*;
    use crate::storage::MemoryStore;

    struct Fixture {
        store: MemoryStore,
        session: MemoryStore,
        ids: MonotonicIds,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: MemoryStore::new(),
                session: MemoryStore::new(),
                ids: MonotonicIds::new(),
            }
        }

        fn profiles(&self) -> ProfileStore<'_> {
            ProfileStore::new(&self.store, &self.session, &self.ids)
        }
    }

    fn registration(email: &str, password: &str) -> Registration {
        Registration {
            email: email.to_owned(),
            password: SecretString::from(password),
            password_confirm: SecretString::from(password),
            first_name: "Ada".to_owned(),
            last_name: "Lovelace".to_owned(),
            phone: String::new(),
            address: String::new(),
            date_of_birth: String::new(),
            preferences: vec!["Fruity".to_owned()],
        }
    }

    fn new_order(name: &str) -> NewOrder {
        NewOrder {
            name: name.to_owned(),
            ingredients: Vec::new(),
            price: Price::from_cents(1299),
            special_instructions: None,
        }
    }

    #[tokio::test]
    async fn test_register_then_login_yields_same_user() {
        let fx = Fixture::new();
        let profiles = fx.profiles();

        let registered = profiles
            .register(&registration("a@x.com", "secret"))
            .await
            .unwrap();
        assert_eq!(profiles.current_user().await.unwrap(), Some(registered.clone()));

        profiles.logout().await.unwrap();
        assert_eq!(profiles.current_user().await.unwrap(), None);

        let logged_in = profiles
            .login("a@x.com", &SecretString::from("secret"))
            .await
            .unwrap();
        assert_eq!(logged_in.id, registered.id);
        assert_eq!(profiles.current_user().await.unwrap().unwrap().id, registered.id);
    }

    #[tokio::test]
    async fn test_password_is_not_stored_in_plaintext() {
        let fx = Fixture::new();
        let user = fx
            .profiles()
            .register(&registration("a@x.com", "secret"))
            .await
            .unwrap();

        let stored = fx.store.get(&keys::password(&user.id)).await.unwrap().unwrap();
        assert_ne!(stored, "secret");
        assert!(stored.starts_with("$argon2"));
    }

    #[tokio::test]
    async fn test_duplicate_email_leaves_users_unchanged() {
        let fx = Fixture::new();
        let profiles = fx.profiles();
        profiles
            .register(&registration("a@x.com", "secret"))
            .await
            .unwrap();
        let before = fx.store.get(keys::USERS).await.unwrap();

        let err = profiles
            .register(&registration("a@x.com", "another"))
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::UserAlreadyExists));
        assert_eq!(fx.store.get(keys::USERS).await.unwrap(), before);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_registrations_admit_one_user() {
        let store = Arc::new(MemoryStore::new());
        let ids = Arc::new(MonotonicIds::new());

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let ids = ids.clone();
                tokio::spawn(async move {
                    let session = MemoryStore::new();
                    ProfileStore::new(store.as_ref(), &session, &ids)
                        .register(&registration("a@x.com", "secret"))
                        .await
                })
            })
            .collect();

        let mut admitted = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => admitted += 1,
                Err(e) => assert!(matches!(e, AuthError::UserAlreadyExists)),
            }
        }

        assert_eq!(admitted, 1);
        let users = UserRepository::new(store.as_ref()).list().await.unwrap();
        assert_eq!(users.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_orders_from_many_sessions_all_persist() {
        let store = Arc::new(MemoryStore::new());
        let ids = Arc::new(MonotonicIds::new());

        let tasks: Vec<_> = (0..40)
            .map(|i| {
                let store = store.clone();
                let ids = ids.clone();
                tokio::spawn(async move {
                    let session = MemoryStore::new();
                    let profiles = ProfileStore::new(store.as_ref(), &session, &ids);
                    profiles
                        .register(&registration(&format!("user{i}@x.com"), "secret"))
                        .await
                        .unwrap();
                    profiles.add_order(new_order("Berry Mojito")).await.unwrap()
                })
            })
            .collect();
        for task in tasks {
            assert!(task.await.unwrap().is_some());
        }

        let orders = OrderRepository::new(store.as_ref()).list().await.unwrap();
        assert_eq!(orders.len(), 40);
    }

    #[tokio::test]
    async fn test_registration_validation() {
        let fx = Fixture::new();
        let profiles = fx.profiles();

        let mut bad = registration("not-an-email", "secret");
        assert!(matches!(
            profiles.register(&bad).await,
            Err(AuthError::InvalidEmail(_))
        ));

        bad = registration("a@x.com", "secret");
        bad.password_confirm = SecretString::from("secreT");
        assert!(matches!(
            profiles.register(&bad).await,
            Err(AuthError::PasswordMismatch)
        ));

        bad = registration("a@x.com", "short");
        assert!(matches!(
            profiles.register(&bad).await,
            Err(AuthError::WeakPassword(_))
        ));

        bad = registration("a@x.com", "secret");
        bad.last_name = " ".to_owned();
        assert!(matches!(
            profiles.register(&bad).await,
            Err(AuthError::MissingField("Last name"))
        ));

        assert!(fx.store.get(keys::USERS).await.unwrap().is_none());
        assert!(profiles.current_user().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_wrong_password_keeps_session_unset() {
        let fx = Fixture::new();
        let profiles = fx.profiles();
        profiles
            .register(&registration("a@x.com", "secret"))
            .await
            .unwrap();
        profiles.logout().await.unwrap();

        let err = profiles
            .login("a@x.com", &SecretString::from("wrong"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert_eq!(
            err.user_message().as_deref(),
            Some("Invalid email or password")
        );

        let unknown = profiles
            .login("nobody@x.com", &SecretString::from("secret"))
            .await
            .unwrap_err();
        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert!(profiles.current_user().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_profile_requires_session() {
        let fx = Fixture::new();
        let profiles = fx.profiles();
        let update = ProfileUpdate {
            phone: Some("555-0100".to_owned()),
            ..ProfileUpdate::default()
        };

        assert!(profiles.update_profile(&update).await.unwrap().is_none());

        let user = profiles
            .register(&registration("a@x.com", "secret"))
            .await
            .unwrap();
        let updated = profiles.update_profile(&update).await.unwrap().unwrap();

        assert_eq!(updated.phone, "555-0100");
        assert_eq!(updated.email, user.email);
        let stored = UserRepository::new(&fx.store)
            .get_by_id(&user.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.phone, "555-0100");
        assert_eq!(profiles.current_user().await.unwrap().unwrap().phone, "555-0100");
    }

    #[tokio::test]
    async fn test_orders_follow_the_session() {
        let fx = Fixture::new();
        let profiles = fx.profiles();

        assert!(profiles.add_order(new_order("Orphan")).await.unwrap().is_none());

        let user = profiles
            .register(&registration("a@x.com", "secret"))
            .await
            .unwrap();
        let order = profiles
            .add_order(new_order("Sunset Bliss"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order.user_id, user.id);
        assert_eq!(order.status, OrderStatus::Pending);

        let created = profiles
            .add_orders(vec![new_order("A"), new_order("B")])
            .await
            .unwrap();
        assert_ne!(created[0].id, created[1].id);
        assert_eq!(profiles.user_orders().await.unwrap().len(), 3);

        profiles.logout().await.unwrap();
        assert!(profiles.user_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_orders_are_per_user() {
        let fx = Fixture::new();
        let profiles = fx.profiles();
        profiles
            .register(&registration("a@x.com", "secret"))
            .await
            .unwrap();
        profiles.add_order(new_order("Mine")).await.unwrap();
        profiles.logout().await.unwrap();

        profiles
            .register(&registration("b@x.com", "secret"))
            .await
            .unwrap();
        assert!(profiles.user_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_session_snapshot_is_cleared() {
        let fx = Fixture::new();
        fx.session
            .set(keys::CURRENT_USER, "{\"id\":".to_owned())
            .await
            .unwrap();

        assert!(fx.profiles().current_user().await.unwrap().is_none());
        assert!(fx.session.get(keys::CURRENT_USER).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ids_are_unique_within_a_millisecond() {
        let fx = Fixture::new();
        let profiles = fx.profiles();
        let a = profiles
            .register(&registration("a@x.com", "secret"))
            .await
            .unwrap();
        let b = profiles
            .register(&registration("b@x.com", "secret"))
            .await
            .unwrap();
        assert_ne!(a.id, b.id);
    }
}
