//! Seed the store with users from a YAML fixture.
//!
//! ```yaml
//! users:
//!   - email: ada@example.com
//!     password: analytical
//!     first_name: Ada
//!     last_name: Lovelace
//!     preferences: [Fruity, Sour]
//! ```
//!
//! Users go through the same registration path as the storefront, so the
//! fixture is validated and passwords are hashed. Emails that are already
//! registered are skipped.

use std::path::Path;

use mocktail_core::MonotonicIds;
use mocktail_storefront::services::{AuthError, ProfileStore, Registration};
use mocktail_storefront::storage::{KeyValueStore, MemoryStore, observe_issued_ids};
use secrecy::SecretString;
use serde::Deserialize;

use super::CliError;

/// Fixture file contents.
#[derive(Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub users: Vec<SeedUser>,
}

/// One user to register.
#[derive(Deserialize)]
pub struct SeedUser {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub date_of_birth: String,
    #[serde(default)]
    pub preferences: Vec<String>,
}

impl SeedUser {
    fn to_registration(&self) -> Registration {
        Registration {
            email: self.email.clone(),
            password: SecretString::from(self.password.clone()),
            password_confirm: SecretString::from(self.password.clone()),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            phone: self.phone.clone(),
            address: self.address.clone(),
            date_of_birth: self.date_of_birth.clone(),
            preferences: self.preferences.clone(),
        }
    }
}

/// Outcome of a seeding run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub inserted: usize,
    pub skipped: usize,
    /// Rejected entries as `(email, reason)`.
    pub rejected: Vec<(String, String)>,
}

/// Register every user in `seed` that is not already present.
///
/// Entries that fail validation are reported, not fatal.
pub async fn seed_users(store: &dyn KeyValueStore, seed: &SeedFile) -> Result<SeedReport, CliError> {
    let ids = MonotonicIds::new();
    observe_issued_ids(store, &ids).await?;

    // Registration signs the new user in; the scratch session is discarded.
    let scratch = MemoryStore::new();
    let profiles = ProfileStore::new(store, &scratch, &ids);

    let mut report = SeedReport::default();
    for user in &seed.users {
        match profiles.register(&user.to_registration()).await {
            Ok(registered) => {
                tracing::debug!(user_id = %registered.id, email = %registered.email, "Seeded user");
                report.inserted += 1;
            }
            Err(AuthError::UserAlreadyExists) => report.skipped += 1,
            Err(e) => match e.user_message() {
                Some(reason) => report.rejected.push((user.email.clone(), reason)),
                None => return Err(e.into()),
            },
        }
    }
    Ok(report)
}

/// Seed users from the fixture at `path`.
pub async fn from_file(store: &dyn KeyValueStore, path: &Path) -> Result<(), CliError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CliError::Read {
            path: path.display().to_string(),
            source,
        })?;
    let seed: SeedFile = serde_yaml::from_str(&content)?;

    tracing::info!(path = %path.display(), users = seed.users.len(), "Loaded fixture");

    let report = seed_users(store, &seed).await?;

    tracing::info!("Seeding complete!");
    tracing::info!("  Users inserted: {}", report.inserted);
    tracing::info!("  Users skipped (already registered): {}", report.skipped);
    if !report.rejected.is_empty() {
        tracing::warn!("  Rejected: {}", report.rejected.len());
        for (email, reason) in &report.rejected {
            tracing::warn!("    - {email}: {reason}");
        }
    }
    Ok(())
}
