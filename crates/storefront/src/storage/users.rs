//! User repository over the durable store.
//!
//! Users live as one JSON array under `users`; each user's credential sits
//! separately under `password_<id>`.

use mocktail_core::{Email, PasswordDigest, User, UserId};

use super::{KeyValueStore, StorageError, keys, load_json, update_json};

/// Repository for user records and credentials.
pub struct UserRepository<'a> {
    store: &'a dyn KeyValueStore,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(store: &'a dyn KeyValueStore) -> Self {
        Self { store }
    }

    /// Every registered user, in registration order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store fails.
    pub async fn list(&self) -> Result<Vec<User>, StorageError> {
        load_json(self.store, keys::USERS).await
    }

    /// Get a user by email address (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, StorageError> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .find(|u| same_email(&u.email, email)))
    }

    /// Get a user by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store fails.
    pub async fn get_by_id(&self, id: &UserId) -> Result<Option<User>, StorageError> {
        Ok(self.list().await?.into_iter().find(|u| &u.id == id))
    }

    /// Append a user. Uniqueness is the caller's responsibility.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store fails.
    pub async fn insert(&self, user: &User) -> Result<(), StorageError> {
        let user = user.clone();
        update_json(self.store, keys::USERS, move |users: &mut Vec<User>| {
            users.push(user);
        })
        .await
    }

    /// Append `user` unless another record already has its email
    /// (case-insensitive). The check and the write happen as one step.
    ///
    /// Returns `false` when the email is taken.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store fails.
    pub async fn insert_if_email_free(&self, user: &User) -> Result<bool, StorageError> {
        let user = user.clone();
        update_json(self.store, keys::USERS, move |users: &mut Vec<User>| {
            if users.iter().any(|u| same_email(&u.email, &user.email)) {
                return false;
            }
            users.push(user);
            true
        })
        .await
    }

    /// Replace the stored record with the same id.
    ///
    /// Returns `false` when no such user exists.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store fails.
    pub async fn update(&self, user: &User) -> Result<bool, StorageError> {
        update_json(self.store, keys::USERS, |users: &mut Vec<User>| {
            let Some(slot) = users.iter_mut().find(|u| u.id == user.id) else {
                return false;
            };
            slot.clone_from(user);
            true
        })
        .await
    }

    /// Store the credential for `user_id`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store fails.
    pub async fn set_password(
        &self,
        user_id: &UserId,
        digest: &PasswordDigest,
    ) -> Result<(), StorageError> {
        self.store
            .set(&keys::password(user_id), digest.as_str().to_owned())
            .await
    }

    /// The stored credential for `user_id`, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store fails.
    pub async fn password(&self, user_id: &UserId) -> Result<Option<PasswordDigest>, StorageError> {
        Ok(self
            .store
            .get(&keys::password(user_id))
            .await?
            .map(PasswordDigest::new))
    }
}

fn same_email(a: &Email, b: &Email) -> bool {
    a.as_str().eq_ignore_ascii_case(b.as_str())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use mocktail_core::NewUser;

    use super::*;
    use crate::storage::MemoryStore;

    fn user(id: &str, email: &str) -> User {
        NewUser {
            email: Email::parse(email).unwrap(),
            first_name: "Test".to_owned(),
            last_name: "User".to_owned(),
            phone: String::new(),
            address: String::new(),
            date_of_birth: String::new(),
            preferences: Vec::new(),
        }
        .into_user(UserId::new(id), Utc::now())
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let store = MemoryStore::new();
        let users = UserRepository::new(&store);

        users.insert(&user("1", "a@x.com")).await.unwrap();
        users.insert(&user("2", "b@x.com")).await.unwrap();

        let found = users
            .get_by_email(&Email::parse("A@X.com").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id.as_str(), "1");
        assert!(users.get_by_id(&UserId::new("3")).await.unwrap().is_none());
        assert_eq!(users.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_insert_if_email_free_rejects_taken_email() {
        let store = MemoryStore::new();
        let users = UserRepository::new(&store);

        assert!(users.insert_if_email_free(&user("1", "a@x.com")).await.unwrap());
        assert!(!users.insert_if_email_free(&user("2", "A@X.COM")).await.unwrap());
        assert!(users.insert_if_email_free(&user("3", "b@x.com")).await.unwrap());

        let ids: Vec<String> = users
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.id.as_str().to_owned())
            .collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[tokio::test]
    async fn test_update_replaces_record() {
        let store = MemoryStore::new();
        let users = UserRepository::new(&store);
        let mut record = user("1", "a@x.com");
        users.insert(&record).await.unwrap();

        record.phone = "555-0100".to_owned();
        assert!(users.update(&record).await.unwrap());
        assert!(!users.update(&user("9", "z@x.com")).await.unwrap());

        let stored = users.get_by_id(&record.id).await.unwrap().unwrap();
        assert_eq!(stored.phone, "555-0100");
    }

    #[tokio::test]
    async fn test_password_round_trip() {
        let store = MemoryStore::new();
        let users = UserRepository::new(&store);
        let id = UserId::new("1");

        assert!(users.password(&id).await.unwrap().is_none());
        users
            .set_password(&id, &PasswordDigest::new("$argon2id$stub".to_owned()))
            .await
            .unwrap();
        assert_eq!(
            users.password(&id).await.unwrap().unwrap().as_str(),
            "$argon2id$stub"
        );
        assert_eq!(
            store.get("password_1").await.unwrap().as_deref(),
            Some("$argon2id$stub")
        );
    }
}
