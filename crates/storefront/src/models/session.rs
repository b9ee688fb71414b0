//! Session-related types.
//!
//! Cart and checkout state are stored as typed JSON values in the session,
//! loaded at the start of a request and saved back after mutation.

use serde::{Serialize, de::DeserializeOwned};
use tower_sessions::Session;

use mocktail_core::{Cart, CheckoutFlow, Confirmation};

/// Session keys for shopping state.
pub mod keys {
    /// Key for the shopping cart.
    pub const CART: &str = "cart";

    /// Key for the checkout wizard.
    pub const CHECKOUT: &str = "checkout";

    /// Key for the receipt of the last successful checkout.
    pub const CONFIRMATION: &str = "lastConfirmation";
}

/// Read `key`, treating a value that no longer decodes as absent.
async fn load<T>(session: &Session, key: &str) -> Result<Option<T>, tower_sessions::session::Error>
where
    T: DeserializeOwned,
{
    match session.get::<T>(key).await {
        Ok(value) => Ok(value),
        Err(tower_sessions::session::Error::SerdeJson(e)) => {
            tracing::warn!(key, error = %e, "Malformed session value, resetting");
            session.remove_value(key).await?;
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

async fn save<T>(session: &Session, key: &str, value: &T) -> Result<(), tower_sessions::session::Error>
where
    T: Serialize + Sync,
{
    session.insert(key, value).await
}

/// The session's cart. Empty if none was stored.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn load_cart(session: &Session) -> Result<Cart, tower_sessions::session::Error> {
    Ok(load(session, keys::CART).await?.unwrap_or_default())
}

/// Store the session's cart.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn save_cart(session: &Session, cart: &Cart) -> Result<(), tower_sessions::session::Error> {
    save(session, keys::CART, cart).await
}

/// The session's checkout wizard. Fresh if none was stored.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn load_checkout(
    session: &Session,
) -> Result<CheckoutFlow, tower_sessions::session::Error> {
    Ok(load(session, keys::CHECKOUT).await?.unwrap_or_default())
}

/// Store the session's checkout wizard.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn save_checkout(
    session: &Session,
    flow: &CheckoutFlow,
) -> Result<(), tower_sessions::session::Error> {
    save(session, keys::CHECKOUT, flow).await
}

/// Receipt of the session's last successful checkout.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn load_confirmation(
    session: &Session,
) -> Result<Option<Confirmation>, tower_sessions::session::Error> {
    load(session, keys::CONFIRMATION).await
}

/// Store the receipt of a successful checkout.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn save_confirmation(
    session: &Session,
    confirmation: &Confirmation,
) -> Result<(), tower_sessions::session::Error> {
    save(session, keys::CONFIRMATION, confirmation).await
}

/// Cart and checkout state for one request.
///
/// Load once, mutate, then [`SessionState::save`] to write both back.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub cart: Cart,
    pub checkout: CheckoutFlow,
}

impl SessionState {
    /// Load cart and checkout state from the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn load(session: &Session) -> Result<Self, tower_sessions::session::Error> {
        Ok(Self {
            cart: load_cart(session).await?,
            checkout: load_checkout(session).await?,
        })
    }

    /// Write cart and checkout state back to the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn save(&self, session: &Session) -> Result<(), tower_sessions::session::Error> {
        save_cart(session, &self.cart).await?;
        save_checkout(session, &self.checkout).await
    }
}
