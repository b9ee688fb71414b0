//! Durable store health check.
//!
//! The storefront reads a malformed value as an empty collection and leaves
//! it in place. This command finds those values and, on request, resets them.

use argon2::password_hash::PasswordHash;
use mocktail_core::{Order, User};
use mocktail_storefront::storage::{KeyValueStore, keys};

use super::CliError;

/// A stored value that does not decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub key: String,
    pub reason: String,
}

/// Why `raw` is unusable under `key`, or `None` if it is fine or unknown.
fn problem(key: &str, raw: &str) -> Option<String> {
    match key {
        keys::USERS => serde_json::from_str::<Vec<User>>(raw)
            .err()
            .map(|e| e.to_string()),
        keys::ORDERS => serde_json::from_str::<Vec<Order>>(raw)
            .err()
            .map(|e| e.to_string()),
        k if k.starts_with(keys::PASSWORD_PREFIX) => PasswordHash::new(raw)
            .err()
            .map(|e| format!("not a password hash: {e}")),
        _ => None,
    }
}

/// Every malformed value in `store`, in key order.
pub async fn inspect(store: &dyn KeyValueStore) -> Result<Vec<Finding>, CliError> {
    let mut stored = store.keys().await?;
    stored.sort();

    let mut findings = Vec::new();
    for key in stored {
        let Some(raw) = store.get(&key).await? else {
            continue;
        };
        if let Some(reason) = problem(&key, &raw) {
            findings.push(Finding { key, reason });
        }
    }
    Ok(findings)
}

/// Reset each finding: collections become empty, broken credentials are
/// removed.
pub async fn repair(store: &dyn KeyValueStore, findings: &[Finding]) -> Result<(), CliError> {
    for finding in findings {
        if finding.key.starts_with(keys::PASSWORD_PREFIX) {
            store.remove(&finding.key).await?;
        } else {
            store.set(&finding.key, "[]".to_owned()).await?;
        }
        tracing::info!(key = %finding.key, "Reset");
    }
    Ok(())
}

/// Report malformed values and optionally repair them.
pub async fn check(store: &dyn KeyValueStore, fix: bool) -> Result<(), CliError> {
    let findings = inspect(store).await?;
    if findings.is_empty() {
        tracing::info!("Store is healthy");
        return Ok(());
    }

    for finding in &findings {
        tracing::warn!(key = %finding.key, "Malformed: {}", finding.reason);
    }

    if fix {
        repair(store, &findings).await?;
        tracing::info!("Repaired {} key(s)", findings.len());
    } else {
        tracing::info!("Run with --repair to reset them");
    }
    Ok(())
}
