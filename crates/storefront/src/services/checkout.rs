//! Checkout orchestration.
//!
//! Ties the checkout wizard, the cart, the payment gateway and the
//! signed-in user's order history together for the payment step.
//!
//! A payment runs in two halves so the caller can persist the `Processing`
//! stage between them:
//!
//! ```text
//! begin (validate, claim, Processing) --> save session --> complete (charge)
//! ```
//!
//! The claim is keyed by browser session. While one charge is in flight a
//! second submit from the same session is rejected.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use chrono::Utc;
use thiserror::Error;

use mocktail_core::{
    Cart, CheckoutError, CheckoutFlow, CheckoutStage, Confirmation, NewOrder, OrderSummary,
    PaymentDetails, ShippingInfo, checkout::order_number,
};

use super::payment::{ChargeRequest, PaymentError, PaymentGateway};
use super::profile::ProfileStore;

/// Failure message for a `Processing` stage whose request never finished.
pub const INTERRUPTED_MESSAGE: &str =
    "Your previous payment attempt was interrupted. Please try again.";

/// Why a payment attempt did not produce a confirmation.
#[derive(Debug, Error)]
pub enum PayError {
    /// The form or the wizard state was rejected. Nothing changed.
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    /// The gateway refused. The flow is in the failed stage and accepts a retry.
    #[error(transparent)]
    Payment(#[from] PaymentError),
}

impl PayError {
    /// Another charge for the same session has not finished yet.
    #[must_use]
    pub const fn is_already_processing(&self) -> bool {
        matches!(
            self,
            Self::Checkout(CheckoutError::InvalidStage(CheckoutStage::Processing))
        )
    }
}

/// Sessions with a charge in flight.
#[derive(Debug, Default)]
pub struct InFlightPayments {
    keys: Mutex<HashSet<String>>,
}

impl InFlightPayments {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `key` until the returned claim is dropped.
    ///
    /// Returns `None` while another claim on `key` is alive.
    #[must_use]
    pub fn claim(&self, key: &str) -> Option<PaymentClaim<'_>> {
        let mut keys = self.keys.lock().unwrap_or_else(PoisonError::into_inner);
        keys.insert(key.to_owned()).then(|| PaymentClaim {
            owner: self,
            key: key.to_owned(),
        })
    }

    /// Whether a charge for `key` is running.
    #[must_use]
    pub fn is_claimed(&self, key: &str) -> bool {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }
}

/// Exclusive right to charge for one session.
#[derive(Debug)]
pub struct PaymentClaim<'a> {
    owner: &'a InFlightPayments,
    key: String,
}

impl Drop for PaymentClaim<'_> {
    fn drop(&mut self) {
        self.owner
            .keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

/// A validated payment whose flow is in `Processing`, ready to charge.
#[derive(Debug)]
pub struct PendingPayment<'a> {
    _claim: PaymentClaim<'a>,
    request: ChargeRequest,
    shipping: ShippingInfo,
    summary: OrderSummary,
}

/// Runs the payment step for one browser session.
pub struct CheckoutService<'a> {
    profiles: ProfileStore<'a>,
    payments: &'a dyn PaymentGateway,
    in_flight: &'a InFlightPayments,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(
        profiles: ProfileStore<'a>,
        payments: &'a dyn PaymentGateway,
        in_flight: &'a InFlightPayments,
    ) -> Self {
        Self {
            profiles,
            payments,
            in_flight,
        }
    }

    /// Fail a flow left in `Processing` by a request that never finished.
    ///
    /// Returns `true` if the flow was changed.
    pub fn recover_interrupted(&self, session_key: &str, flow: &mut CheckoutFlow) -> bool {
        if flow.stage() != CheckoutStage::Processing || self.in_flight.is_claimed(session_key) {
            return false;
        }
        tracing::warn!("Checkout left in processing, marking as failed");
        flow.fail(INTERRUPTED_MESSAGE).is_ok()
    }

    /// Validate `details`, claim the session and move the flow to
    /// `Processing`.
    ///
    /// # Errors
    ///
    /// Returns `PayError::Checkout` for invalid card details or an
    /// out-of-order step. A second submit while a charge for `session_key`
    /// is in flight fails with `InvalidStage(Processing)`.
    pub fn begin(
        &self,
        session_key: &str,
        flow: &mut CheckoutFlow,
        cart: &Cart,
        details: &PaymentDetails,
    ) -> Result<PendingPayment<'a>, PayError> {
        let details = details.normalized();
        details.validate()?;

        let in_flight: &'a InFlightPayments = self.in_flight;
        let claim = in_flight
            .claim(session_key)
            .ok_or(CheckoutError::InvalidStage(CheckoutStage::Processing))?;
        if flow.stage() == CheckoutStage::Processing {
            flow.fail(INTERRUPTED_MESSAGE)?;
        }

        flow.begin_processing(cart)?;
        let shipping = flow
            .shipping()
            .cloned()
            .ok_or(CheckoutError::MissingShipping)?;
        let summary = OrderSummary::for_cart(cart);

        Ok(PendingPayment {
            _claim: claim,
            request: ChargeRequest {
                amount: summary.total,
                method: details.method,
                masked_card: details.masked_card(),
            },
            shipping,
            summary,
        })
    }

    /// Charge the customer and finish the checkout started by [`begin`].
    ///
    /// On approval the flow succeeds, one pending order per cart line is
    /// recorded for the signed-in user (if any), the cart is emptied and the
    /// receipt is returned. On decline the flow moves to the failed stage
    /// with the decline message and the cart is kept.
    ///
    /// [`begin`]: Self::begin
    ///
    /// # Errors
    ///
    /// Returns `PayError::Payment` if the charge is refused.
    pub async fn complete(
        &self,
        pending: PendingPayment<'a>,
        flow: &mut CheckoutFlow,
        cart: &mut Cart,
    ) -> Result<Confirmation, PayError> {
        let receipt = match self.payments.charge(&pending.request).await {
            Ok(receipt) => receipt,
            Err(e) => {
                flow.fail(e.to_string())?;
                tracing::info!(error = %e, "Checkout payment failed");
                return Err(e.into());
            }
        };
        flow.succeed()?;

        let orders: Vec<NewOrder> = cart.items().iter().map(NewOrder::from_line).collect();
        match self.profiles.add_orders(orders).await {
            Ok(created) if !created.is_empty() => {
                tracing::info!(count = created.len(), "Checkout orders recorded");
            }
            Ok(_) => tracing::debug!("Anonymous checkout, no orders recorded"),
            Err(e) => {
                let event_id = sentry::capture_error(&e);
                tracing::error!(error = %e, sentry_event_id = %event_id, "Failed to record checkout orders");
            }
        }

        let now = Utc::now();
        let confirmation = Confirmation {
            order_number: order_number(now),
            order_date: now,
            items: cart.items().to_vec(),
            summary: pending.summary,
            shipping: pending.shipping,
            payment_method: pending.request.method,
            masked_card: pending.request.masked_card,
            payment_reference: receipt.reference,
        };
        cart.clear();

        tracing::info!(
            order_number = %confirmation.order_number,
            total = %confirmation.summary.total,
            payment_reference = %confirmation.payment_reference,
            "Checkout completed"
        );
        Ok(confirmation)
    }

    /// [`begin`](Self::begin) and [`complete`](Self::complete) with nothing
    /// persisted in between.
    ///
    /// # Errors
    ///
    /// See `begin` and `complete`.
    pub async fn pay(
        &self,
        session_key: &str,
        flow: &mut CheckoutFlow,
        cart: &mut Cart,
        details: &PaymentDetails,
    ) -> Result<Confirmation, PayError> {
        let pending = self.begin(session_key, flow, cart, details)?;
        self.complete(pending, flow, cart).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use secrecy::SecretString;

    use mocktail_core::{
        Catalog, CheckoutStage, MonotonicIds, OrderStatus, PaymentMethod, ProductId, ShippingInfo,
    };

    use super::*;
    use crate::services::payment::{PaymentReceipt, SimulatedGateway};
    use crate::services::profile::Registration;
    use crate::storage::{KeyValueStore, MemoryStore, keys};

    const SESSION: &str = "session-1";

    struct Fixture {
        store: MemoryStore,
        session: MemoryStore,
        ids: MonotonicIds,
        in_flight: InFlightPayments,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: MemoryStore::new(),
                session: MemoryStore::new(),
                ids: MonotonicIds::new(),
                in_flight: InFlightPayments::new(),
            }
        }

        fn profiles(&self) -> ProfileStore<'_> {
            ProfileStore::new(&self.store, &self.session, &self.ids)
        }

        fn checkout<'a>(&'a self, gateway: &'a dyn PaymentGateway) -> CheckoutService<'a> {
            CheckoutService::new(self.profiles(), gateway, &self.in_flight)
        }

        async fn sign_in(&self) {
            self.profiles()
                .register(&Registration {
                    email: "a@x.com".to_owned(),
                    password: SecretString::from("secret"),
                    password_confirm: SecretString::from("secret"),
                    first_name: "Ada".to_owned(),
                    last_name: "Lovelace".to_owned(),
                    phone: String::new(),
                    address: String::new(),
                    date_of_birth: String::new(),
                    preferences: Vec::new(),
                })
                .await
                .unwrap();
        }
    }

    fn cart() -> Cart {
        let catalog = Catalog::builtin();
        let mut cart = Cart::new();
        cart.add_item(catalog.get(&ProductId::new("1")).unwrap());
        cart.set_quantity(&ProductId::new("1"), 2);
        cart.add_item(catalog.get(&ProductId::new("2")).unwrap());
        cart
    }

    fn flow_at_payment(cart: &Cart) -> CheckoutFlow {
        let mut flow = CheckoutFlow::new();
        flow.submit_shipping(
            ShippingInfo {
                name: "Ada Lovelace".to_owned(),
                address: "1 Analytical Way".to_owned(),
                email: "a@x.com".to_owned(),
                ..ShippingInfo::default()
            },
            cart,
        )
        .unwrap();
        flow
    }

    fn card() -> PaymentDetails {
        PaymentDetails {
            method: PaymentMethod::Credit,
            card_number: "4242 4242 4242 4242".to_owned(),
            expiry: "12/29".to_owned(),
            cvv: "123".to_owned(),
            card_name: "Ada Lovelace".to_owned(),
        }
    }

    #[tokio::test]
    async fn test_approved_payment_records_orders_and_clears_cart() {
        let fx = Fixture::new();
        fx.sign_in().await;
        let gateway = SimulatedGateway::always_approve();
        let service = fx.checkout(&gateway);

        let mut cart = cart();
        let mut flow = flow_at_payment(&cart);
        let confirmation = service.pay(SESSION, &mut flow, &mut cart, &card()).await.unwrap();

        assert_eq!(flow.stage(), CheckoutStage::Succeeded);
        assert!(cart.is_empty());
        assert!(confirmation.order_number.starts_with("ORD-"));
        assert_eq!(confirmation.items.len(), 2);
        assert_eq!(confirmation.summary.total.to_string(), "$45.92");
        assert_eq!(
            confirmation.masked_card.as_deref(),
            Some("**** **** **** 4242")
        );

        let orders = fx.profiles().user_orders().await.unwrap();
        assert_eq!(orders.len(), 2);
        assert!(orders.iter().all(|o| o.status == OrderStatus::Pending));
        assert_eq!(orders[0].name, "Sunset Bliss");
        assert_eq!(orders[0].price.to_string(), "$25.98");
        assert_eq!(orders[0].special_instructions.as_deref(), Some("Quantity: 2"));
    }

    #[tokio::test]
    async fn test_anonymous_checkout_records_no_orders() {
        let fx = Fixture::new();
        let gateway = SimulatedGateway::always_approve();
        let service = fx.checkout(&gateway);

        let mut cart = cart();
        let mut flow = flow_at_payment(&cart);
        service.pay(SESSION, &mut flow, &mut cart, &card()).await.unwrap();

        assert!(cart.is_empty());
        assert!(fx.store.get(keys::ORDERS).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_declined_payment_keeps_cart_and_allows_retry() {
        let fx = Fixture::new();
        fx.sign_in().await;
        let mut cart = cart();
        let mut flow = flow_at_payment(&cart);

        let declining = SimulatedGateway::always_decline();
        let err = fx.checkout(&declining)
            .pay(SESSION, &mut flow, &mut cart, &card())
            .await
            .unwrap_err();

        assert!(matches!(err, PayError::Payment(PaymentError::Declined)));
        assert_eq!(flow.stage(), CheckoutStage::Failed);
        assert_eq!(
            flow.error(),
            Some("Payment failed. Please check your card details and try again.")
        );
        assert_eq!(cart.item_count(), 3);
        assert!(fx.profiles().user_orders().await.unwrap().is_empty());

        let approving = SimulatedGateway::always_approve();
        fx.checkout(&approving)
            .pay(SESSION, &mut flow, &mut cart, &card())
            .await
            .unwrap();
        assert_eq!(flow.stage(), CheckoutStage::Succeeded);
        assert_eq!(fx.profiles().user_orders().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_card_changes_nothing() {
        let fx = Fixture::new();
        let gateway = SimulatedGateway::always_approve();
        let service = fx.checkout(&gateway);

        let mut cart = cart();
        let mut flow = flow_at_payment(&cart);
        let before = flow.clone();
        let mut details = card();
        details.card_number = "4242".to_owned();

        let err = service.pay(SESSION, &mut flow, &mut cart, &details).await.unwrap_err();

        assert!(matches!(
            err,
            PayError::Checkout(CheckoutError::InvalidCardNumber)
        ));
        assert_eq!(err.to_string(), "Please enter a valid card number");
        assert_eq!(flow, before);
        assert_eq!(cart.item_count(), 3);
    }

    #[tokio::test]
    async fn test_wallet_payment_skips_card_checks() {
        let fx = Fixture::new();
        let gateway = SimulatedGateway::always_approve();
        let service = fx.checkout(&gateway);

        let mut cart = cart();
        let mut flow = flow_at_payment(&cart);
        let details = PaymentDetails {
            method: PaymentMethod::Paypal,
            ..PaymentDetails::default()
        };

        let confirmation = service.pay(SESSION, &mut flow, &mut cart, &details).await.unwrap();
        assert_eq!(confirmation.payment_method, PaymentMethod::Paypal);
        assert!(confirmation.masked_card.is_none());
    }

    #[tokio::test]
    async fn test_payment_requires_shipping_step() {
        let fx = Fixture::new();
        let gateway = SimulatedGateway::always_approve();
        let service = fx.checkout(&gateway);

        let mut cart = cart();
        let mut flow = CheckoutFlow::new();
        let err = service.pay(SESSION, &mut flow, &mut cart, &card()).await.unwrap_err();

        assert!(matches!(
            err,
            PayError::Checkout(CheckoutError::InvalidStage(CheckoutStage::CollectingShipping))
        ));
        assert!(!cart.is_empty());
    }

    /// Approves after a delay and counts charges.
    struct CountingGateway {
        inner: SimulatedGateway,
        charges: AtomicUsize,
    }

    #[async_trait]
    impl PaymentGateway for CountingGateway {
        async fn charge(&self, request: &ChargeRequest) -> Result<PaymentReceipt, PaymentError> {
            self.charges.fetch_add(1, Ordering::SeqCst);
            self.inner.charge(request).await
        }
    }

    #[tokio::test]
    async fn test_confirmation_carries_gateway_reference() {
        let fx = Fixture::new();
        let gateway = SimulatedGateway::always_approve();

        let mut cart = cart();
        let mut flow = flow_at_payment(&cart);
        let confirmation = fx
            .checkout(&gateway)
            .pay(SESSION, &mut flow, &mut cart, &card())
            .await
            .unwrap();

        assert!(!confirmation.payment_reference.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_submit_charges_once() {
        let fx = Fixture::new();
        fx.sign_in().await;
        let gateway = CountingGateway {
            inner: SimulatedGateway::new(Duration::from_millis(50), 1.0),
            charges: AtomicUsize::new(0),
        };
        let service = fx.checkout(&gateway);

        let stored_cart = cart();
        let stored_flow = flow_at_payment(&stored_cart);
        let (mut cart_a, mut flow_a) = (stored_cart.clone(), stored_flow.clone());
        let (mut cart_b, mut flow_b) = (stored_cart.clone(), stored_flow.clone());

        let (card_a, card_b) = (card(), card());
        let (first, second) = tokio::join!(
            service.pay(SESSION, &mut flow_a, &mut cart_a, &card_a),
            service.pay(SESSION, &mut flow_b, &mut cart_b, &card_b),
        );

        assert!(first.is_ok());
        assert!(second.unwrap_err().is_already_processing());
        assert_eq!(gateway.charges.load(Ordering::SeqCst), 1);
        assert_eq!(fx.profiles().user_orders().await.unwrap().len(), 2);
        assert_eq!(cart_b.item_count(), 3);
    }

    #[tokio::test]
    async fn test_claim_is_released_after_payment() {
        let fx = Fixture::new();
        let declining = SimulatedGateway::always_decline();
        let service = fx.checkout(&declining);

        let mut cart = cart();
        let mut flow = flow_at_payment(&cart);
        service
            .pay(SESSION, &mut flow, &mut cart, &card())
            .await
            .unwrap_err();

        assert!(!fx.in_flight.is_claimed(SESSION));
        let pending = service.begin(SESSION, &mut flow, &cart, &card()).unwrap();
        assert!(fx.in_flight.is_claimed(SESSION));
        assert!(fx.in_flight.claim("session-2").is_some());
        drop(pending);
        assert!(!fx.in_flight.is_claimed(SESSION));
    }

    #[tokio::test]
    async fn test_interrupted_processing_is_recovered() {
        let fx = Fixture::new();
        let gateway = SimulatedGateway::always_approve();
        let service = fx.checkout(&gateway);

        let mut cart = cart();
        let mut flow = flow_at_payment(&cart);
        // A request that saved `Processing` and was then dropped.
        drop(service.begin(SESSION, &mut flow, &cart, &card()).unwrap());
        assert_eq!(flow.stage(), CheckoutStage::Processing);

        let held = fx.in_flight.claim(SESSION).unwrap();
        assert!(!service.recover_interrupted(SESSION, &mut flow));
        drop(held);

        assert!(service.recover_interrupted(SESSION, &mut flow));
        assert_eq!(flow.stage(), CheckoutStage::Failed);
        assert_eq!(flow.error(), Some(INTERRUPTED_MESSAGE));

        service
            .pay(SESSION, &mut flow, &mut cart, &card())
            .await
            .unwrap();
        assert_eq!(flow.stage(), CheckoutStage::Succeeded);
    }
}
