//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Home page (best sellers, new arrivals)
//! GET  /health                 - Health check
//! GET  /health/ready           - Readiness (durable store reachable)
//!
//! # Menu
//! GET  /menu                   - Menu (?search=&category=&sort=)
//! GET  /menu/{id}              - Mocktail detail
//!
//! # Cart (forms, or HTMX fragments when HX-Request is set)
//! GET  /cart                   - Cart page
//! POST /cart/add               - Add to cart (quantity 1 if absent)
//! POST /cart/update            - Set quantity (<= 0 removes)
//! POST /cart/increment         - +1
//! POST /cart/decrement         - -1 (removes at 0)
//! POST /cart/remove            - Remove line
//! GET  /cart/count             - Cart count badge (fragment)
//!
//! # Checkout
//! GET  /checkout               - Shipping step
//! POST /checkout/shipping      - Submit shipping details
//! GET  /checkout/payment       - Payment step
//! POST /checkout/payment       - Submit payment
//! POST /checkout/back          - Back to shipping
//! GET  /checkout/confirmation  - Receipt of the last checkout
//!
//! # Auth
//! GET  /auth/login             - Login page
//! POST /auth/login             - Login action
//! GET  /auth/register          - Register page
//! POST /auth/register          - Register action
//! POST /auth/logout            - Logout action
//!
//! # Account (requires auth)
//! GET  /account                - Profile, stats and recent orders
//! GET  /account/edit           - Profile form
//! POST /account/edit           - Save profile
//! GET  /account/orders         - Order history
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod home;
pub mod menu;

use axum::{
    Router,
    http::HeaderMap,
    response::Redirect,
    routing::{get, post},
};
use serde::Deserialize;
use tower_sessions::Session;

use mocktail_core::User;

use crate::error::Result;
use crate::models::load_cart;
use crate::state::AppState;

// =============================================================================
// Shared View Types
// =============================================================================

/// Query parameters for error/success display.
#[derive(Debug, Default, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Header data every page renders.
#[derive(Debug, Clone, Default)]
pub struct Nav {
    /// First name of the signed-in user.
    pub user_name: Option<String>,
    pub cart_count: u32,
}

impl Nav {
    /// Build the header for this session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be read.
    pub async fn load(session: &Session, user: Option<&User>) -> Result<Self> {
        let cart = load_cart(session).await?;
        Ok(Self {
            user_name: user.map(|u| u.first_name.clone()),
            cart_count: cart.item_count(),
        })
    }
}

/// Redirect to `path` with a message in the query string.
pub(crate) fn redirect_with(path: &str, key: &str, message: &str) -> Redirect {
    Redirect::to(&format!("{path}?{key}={}", urlencoding::encode(message)))
}

/// Local redirect target from a form, or `fallback`.
///
/// Only same-site absolute paths are honoured.
pub(crate) fn local_target<'a>(target: Option<&'a str>, fallback: &'a str) -> &'a str {
    match target {
        Some(t) if t.starts_with('/') && !t.starts_with("//") && !t.contains('\\') => t,
        _ => fallback,
    }
}

/// Whether the request came from HTMX and expects a fragment.
pub(crate) fn is_htmx(headers: &HeaderMap) -> bool {
    headers
        .get("HX-Request")
        .is_some_and(|v| v.as_bytes() == b"true")
}

// =============================================================================
// Routers
// =============================================================================

/// Create the menu routes router.
pub fn menu_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(menu::index))
        .route("/{id}", get(menu::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/increment", post(cart::increment))
        .route("/decrement", post(cart::decrement))
        .route("/remove", post(cart::remove))
        .route("/count", get(cart::count))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::shipping_page))
        .route("/shipping", post(checkout::submit_shipping))
        .route(
            "/payment",
            get(checkout::payment_page).post(checkout::submit_payment),
        )
        .route("/back", post(checkout::back))
        .route("/confirmation", get(checkout::confirmation))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(account::index))
        .route("/edit", get(account::edit_page).post(account::update))
        .route("/orders", get(account::orders))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .nest("/menu", menu_routes())
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .nest("/auth", auth_routes())
        .nest("/account", account_routes())
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_local_target() {
        assert_eq!(local_target(Some("/menu?sort=calories"), "/cart"), "/menu?sort=calories");
        assert_eq!(local_target(Some("//evil.example"), "/cart"), "/cart");
        assert_eq!(local_target(Some("https://evil.example"), "/cart"), "/cart");
        assert_eq!(local_target(Some("/\\evil.example"), "/cart"), "/cart");
        assert_eq!(local_target(None, "/cart"), "/cart");
    }

    #[test]
    fn test_is_htmx() {
        let mut headers = HeaderMap::new();
        assert!(!is_htmx(&headers));
        headers.insert("HX-Request", HeaderValue::from_static("true"));
        assert!(is_htmx(&headers));
    }
}
