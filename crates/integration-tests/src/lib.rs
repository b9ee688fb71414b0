//! Integration test harness for the Mocktail Bar storefront.
//!
//! Each [`TestContext`] serves the real router on an ephemeral local port,
//! backed by an in-memory store and an instant payment gateway, and talks to
//! it through a cookie-holding HTTP client.
//!
//! ```rust,ignore
//! let ctx = TestContext::spawn().await;
//! let resp = ctx.get("/health").await;
//! assert_eq!(resp.status(), 200);
//! ```
//!
//! Redirects are not followed, so tests can assert where each step sends
//! the browser.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::sync::Arc;

use reqwest::header::LOCATION;
use reqwest::{Client, Response};
use tokio::net::TcpListener;

use mocktail_storefront::config::StorefrontConfig;
use mocktail_storefront::services::{PaymentGateway, SimulatedGateway};
use mocktail_storefront::state::AppState;
use mocktail_storefront::storage::MemoryStore;

/// A running storefront plus a browser-like client.
pub struct TestContext {
    pub client: Client,
    pub base_url: String,
    pub state: AppState,
}

impl TestContext {
    /// Serve a storefront whose payments are always approved.
    ///
    /// # Panics
    ///
    /// Panics if the server cannot be started.
    pub async fn spawn() -> Self {
        Self::spawn_with(Arc::new(SimulatedGateway::always_approve())).await
    }

    /// Serve a storefront with the given payment gateway.
    ///
    /// # Panics
    ///
    /// Panics if the server cannot be started.
    #[allow(clippy::unwrap_used)]
    pub async fn spawn_with(payments: Arc<dyn PaymentGateway>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{addr}");

        let vars: HashMap<&str, String> = [
            ("STOREFRONT_BASE_URL", base_url.clone()),
            ("STOREFRONT_DATA_PATH", ":memory:".to_owned()),
            ("PAYMENT_DELAY_MS", "0".to_owned()),
        ]
        .into_iter()
        .collect();
        let config = StorefrontConfig::from_lookup(|k| vars.get(k).cloned()).unwrap();

        let state = AppState::new(config, Arc::new(MemoryStore::new()), payments);
        let app = mocktail_storefront::app(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();

        Self {
            client,
            base_url,
            state,
        }
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// GET `path`.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    #[allow(clippy::unwrap_used)]
    pub async fn get(&self, path: &str) -> Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    /// GET `path` and return the body, asserting a 200.
    ///
    /// # Panics
    ///
    /// Panics on any other status.
    #[allow(clippy::unwrap_used)]
    pub async fn page(&self, path: &str) -> String {
        let resp = self.get(path).await;
        assert_eq!(resp.status(), 200, "GET {path}");
        resp.text().await.unwrap()
    }

    /// POST `fields` as a urlencoded form.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    #[allow(clippy::unwrap_used)]
    pub async fn post_form(&self, path: &str, fields: &[(&str, &str)]) -> Response {
        self.client
            .post(self.url(path))
            .form(fields)
            .send()
            .await
            .unwrap()
    }

    /// Register and sign in a customer named Ada Lovelace, returning where
    /// the storefront redirected.
    ///
    /// # Panics
    ///
    /// Panics if registration does not redirect to the account page.
    pub async fn register(&self, email: &str, password: &str) -> String {
        let resp = self
            .post_form(
                "/auth/register",
                &[
                    ("email", email),
                    ("password", password),
                    ("password_confirm", password),
                    ("first_name", "Ada"),
                    ("last_name", "Lovelace"),
                    ("phone", "555-0100"),
                    ("address", "12 Analytical Way"),
                    ("preferences", "Fruity"),
                    ("preferences", "Sour"),
                ],
            )
            .await;
        assert_eq!(resp.status(), 303);
        let target = location(&resp).to_owned();
        assert!(target.starts_with("/account"));
        target
    }

    /// Submit valid shipping details.
    ///
    /// # Panics
    ///
    /// Panics if the step does not advance to payment.
    pub async fn submit_shipping(&self) {
        let resp = self
            .post_form(
                "/checkout/shipping",
                &[
                    ("name", "Ada Lovelace"),
                    ("address", "12 Analytical Way"),
                    ("email", "ada@example.com"),
                    ("phone", "555-0100"),
                    ("city", "London"),
                    ("zip", "N1 7AA"),
                ],
            )
            .await;
        assert_eq!(resp.status(), 303);
        assert_eq!(location(&resp), "/checkout/payment");
    }

    /// Pay by card.
    pub async fn pay_by_card(&self) -> Response {
        self.post_form(
            "/checkout/payment",
            &[
                ("method", "credit"),
                ("card_number", "4242424242424242"),
                ("expiry", "1230"),
                ("cvv", "123"),
                ("card_name", "Ada Lovelace"),
            ],
        )
        .await
    }
}

/// The `Location` header of a redirect, or `""`.
#[must_use]
pub fn location(resp: &Response) -> &str {
    resp.headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}
