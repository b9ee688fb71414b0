//! Checkout route handlers.
//!
//! Shipping, then payment, then confirmation. The wizard state is kept in
//! the session next to the cart and saved after every step.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use mocktail_core::{
    CheckoutError, CheckoutStage, Confirmation, OrderSummary, PaymentDetails, PaymentMethod,
    ShippingInfo, User,
};

use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::{SessionState, load_confirmation, save_confirmation};
use crate::routes::cart::{CartItemView, CartView};
use crate::routes::{MessageQuery, Nav, redirect_with};
use crate::services::PayError;
use crate::state::{AppState, session_storage};

/// Shown on the payment step while a charge is running.
const PROCESSING_NOTICE: &str = "Your payment is being processed. Refresh in a moment.";

// =============================================================================
// View Types
// =============================================================================

/// Totals display data.
#[derive(Debug, Clone)]
pub struct SummaryView {
    pub subtotal: String,
    pub tax: String,
    pub shipping: String,
    pub total: String,
}

impl From<&OrderSummary> for SummaryView {
    fn from(summary: &OrderSummary) -> Self {
        Self {
            subtotal: summary.subtotal.to_string(),
            tax: summary.tax.to_string(),
            shipping: summary.shipping.to_string(),
            total: summary.total.to_string(),
        }
    }
}

/// Payment method radio button.
#[derive(Debug, Clone)]
pub struct MethodView {
    pub value: &'static str,
    pub label: &'static str,
    pub checked: bool,
}

fn method_options(selected: PaymentMethod) -> Vec<MethodView> {
    [
        PaymentMethod::Credit,
        PaymentMethod::Paypal,
        PaymentMethod::Applepay,
    ]
    .into_iter()
    .map(|m| MethodView {
        value: m.as_str(),
        label: m.label(),
        checked: m == selected,
    })
    .collect()
}

/// Receipt display data.
#[derive(Debug, Clone)]
pub struct ConfirmationView {
    pub order_number: String,
    pub order_date: String,
    pub items: Vec<CartItemView>,
    pub summary: SummaryView,
    pub shipping: ShippingInfo,
    pub payment_method: &'static str,
    pub masked_card: Option<String>,
    pub payment_reference: String,
}

impl From<&Confirmation> for ConfirmationView {
    fn from(c: &Confirmation) -> Self {
        Self {
            order_number: c.order_number.clone(),
            order_date: c.order_date.format("%B %-d, %Y").to_string(),
            items: c.items.iter().map(CartItemView::from).collect(),
            summary: SummaryView::from(&c.summary),
            shipping: c.shipping.clone(),
            payment_method: c.payment_method.label(),
            masked_card: c.masked_card.clone(),
            payment_reference: c.payment_reference.clone(),
        }
    }
}

// =============================================================================
// Form Types
// =============================================================================

/// Payment form data.
#[derive(Deserialize)]
pub struct PaymentForm {
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub card_number: String,
    #[serde(default)]
    pub expiry: String,
    #[serde(default)]
    pub cvv: String,
    #[serde(default)]
    pub card_name: String,
}

impl std::fmt::Debug for PaymentForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentForm")
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

impl PaymentForm {
    fn into_details(self) -> PaymentDetails {
        PaymentDetails {
            method: self.method.parse().unwrap_or_default(),
            card_number: self.card_number,
            expiry: self.expiry,
            cvv: self.cvv,
            card_name: self.card_name,
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Shipping step template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/shipping.html")]
pub struct ShippingTemplate {
    pub nav: Nav,
    pub cart: CartView,
    pub shipping: ShippingInfo,
    pub error: Option<String>,
}

/// Payment step template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/payment.html")]
pub struct PaymentTemplate {
    pub nav: Nav,
    pub cart: CartView,
    pub shipping: ShippingInfo,
    pub methods: Vec<MethodView>,
    pub error: Option<String>,
}

/// Confirmation template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/confirmation.html")]
pub struct ConfirmationTemplate {
    pub nav: Nav,
    pub confirmation: ConfirmationView,
    pub signed_in: bool,
}

/// Shipping form defaults from the signed-in user's profile.
fn prefill(user: Option<&User>) -> ShippingInfo {
    user.map_or_else(ShippingInfo::default, |u| ShippingInfo {
        name: u.full_name(),
        address: u.address.clone(),
        email: u.email.to_string(),
        phone: u.phone.clone(),
        ..ShippingInfo::default()
    })
}

// =============================================================================
// Shipping
// =============================================================================

/// Display the shipping step.
///
/// A finished checkout is reset so the customer starts over.
#[instrument(skip(app, session, user))]
pub async fn shipping_page(
    State(app): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<Response> {
    let mut state = SessionState::load(&session).await?;
    settle_interrupted(&app, &session, &mut state).await?;
    if state.cart.is_empty() {
        return Ok(Redirect::to("/cart").into_response());
    }
    if state.checkout.stage() == CheckoutStage::Succeeded {
        state.checkout = mocktail_core::CheckoutFlow::new();
        state.save(&session).await?;
    }

    let shipping = state
        .checkout
        .shipping()
        .cloned()
        .unwrap_or_else(|| prefill(user.as_ref()));

    Ok(ShippingTemplate {
        nav: Nav::load(&session, user.as_ref()).await?,
        cart: CartView::from(&state.cart),
        shipping,
        error: None,
    }
    .into_response())
}

/// Accept shipping details.
///
/// Invalid details re-render the form with the entered values and a message.
#[instrument(skip(session, user, form))]
pub async fn submit_shipping(
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Form(form): Form<ShippingInfo>,
) -> Result<Response> {
    let mut state = SessionState::load(&session).await?;

    match state.checkout.submit_shipping(form.clone(), &state.cart) {
        Ok(()) => {
            state.save(&session).await?;
            add_breadcrumb("checkout", "Shipping details accepted", None);
            Ok(Redirect::to("/checkout/payment").into_response())
        }
        Err(CheckoutError::EmptyCart) => Ok(Redirect::to("/cart").into_response()),
        Err(e) => Ok(ShippingTemplate {
            nav: Nav::load(&session, user.as_ref()).await?,
            cart: CartView::from(&state.cart),
            shipping: form,
            error: Some(e.to_string()),
        }
        .into_response()),
    }
}

// =============================================================================
// Payment
// =============================================================================

/// A stored `Processing` stage with no charge in flight is failed so the
/// customer can retry.
async fn settle_interrupted(
    app: &AppState,
    session: &Session,
    state: &mut SessionState,
) -> Result<()> {
    let Some(id) = session.id() else {
        return Ok(());
    };
    let storage = session_storage(session);
    if app
        .checkout(&storage)
        .recover_interrupted(&id.to_string(), &mut state.checkout)
    {
        state.save(session).await?;
    }
    Ok(())
}

/// Display the payment step.
///
/// While a charge is in flight the page shows a notice instead of an error.
#[instrument(skip(app, session, user))]
pub async fn payment_page(
    State(app): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<MessageQuery>,
) -> Result<Response> {
    let mut state = SessionState::load(&session).await?;
    settle_interrupted(&app, &session, &mut state).await?;
    if state.cart.is_empty() {
        return Ok(Redirect::to("/cart").into_response());
    }
    let processing = state.checkout.stage() == CheckoutStage::Processing;
    let Some(shipping) = state
        .checkout
        .shipping()
        .filter(|_| processing || state.checkout.awaiting_payment())
    else {
        return Ok(Redirect::to("/checkout").into_response());
    };

    let error = if processing {
        Some(PROCESSING_NOTICE.to_owned())
    } else {
        query
            .error
            .or_else(|| state.checkout.error().map(String::from))
    };

    Ok(PaymentTemplate {
        nav: Nav::load(&session, user.as_ref()).await?,
        cart: CartView::from(&state.cart),
        shipping: shipping.clone(),
        methods: method_options(PaymentMethod::default()),
        error,
    }
    .into_response())
}

/// Process a payment.
///
/// Invalid card details come back as a message on the payment step. A
/// declined payment is recorded on the wizard and can be retried. The
/// `Processing` stage is written to the session store before the gateway is
/// called, and a second submit during the charge is turned away.
#[instrument(skip(app, session, form))]
pub async fn submit_payment(
    State(app): State<AppState>,
    session: Session,
    Form(form): Form<PaymentForm>,
) -> Result<Response> {
    // Without a session cookie there is no cart to pay for.
    let Some(session_id) = session.id() else {
        return Ok(Redirect::to("/cart").into_response());
    };
    let session_key = session_id.to_string();

    let mut state = SessionState::load(&session).await?;
    let details = form.into_details();
    let storage = session_storage(&session);
    let checkout = app.checkout(&storage);

    let pending = match checkout.begin(&session_key, &mut state.checkout, &state.cart, &details) {
        Ok(pending) => pending,
        Err(e) => return Ok(payment_rejected(&e)),
    };
    state.save(&session).await?;
    session.save().await?;

    let result = checkout
        .complete(pending, &mut state.checkout, &mut state.cart)
        .await;

    match result {
        Ok(confirmation) => {
            save_confirmation(&session, &confirmation).await?;
            state.save(&session).await?;
            add_breadcrumb(
                "checkout",
                "Payment approved",
                Some(&[("order_number", confirmation.order_number.as_str())]),
            );
            Ok(Redirect::to("/checkout/confirmation").into_response())
        }
        Err(PayError::Payment(e)) => {
            state.save(&session).await?;
            add_breadcrumb("checkout", "Payment declined", None);
            tracing::info!(error = %e, "Payment declined");
            Ok(Redirect::to("/checkout/payment").into_response())
        }
        Err(e) => {
            state.save(&session).await?;
            Ok(payment_rejected(&e))
        }
    }
}

/// Where a payment that never reached the gateway sends the customer.
fn payment_rejected(e: &PayError) -> Response {
    if e.is_already_processing() {
        add_breadcrumb("checkout", "Duplicate payment submit", None);
        return Redirect::to("/checkout/payment").into_response();
    }
    match e {
        PayError::Checkout(
            CheckoutError::EmptyCart
            | CheckoutError::MissingShipping
            | CheckoutError::InvalidStage(_),
        ) => Redirect::to("/checkout").into_response(),
        _ => redirect_with("/checkout/payment", "error", &e.to_string()).into_response(),
    }
}

/// Return from payment to shipping.
#[instrument(skip(session))]
pub async fn back(session: Session) -> Result<Redirect> {
    let mut state = SessionState::load(&session).await?;
    if state.checkout.back().is_ok() {
        state.save(&session).await?;
    }
    Ok(Redirect::to("/checkout"))
}

// =============================================================================
// Confirmation
// =============================================================================

/// Display the receipt of the last successful checkout.
#[instrument(skip(session, user))]
pub async fn confirmation(
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<Response> {
    let Some(confirmation) = load_confirmation(&session).await? else {
        return Ok(Redirect::to("/").into_response());
    };

    Ok(ConfirmationTemplate {
        nav: Nav::load(&session, user.as_ref()).await?,
        confirmation: ConfirmationView::from(&confirmation),
        signed_in: user.is_some(),
    }
    .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_form_defaults_to_card() {
        let details = PaymentForm {
            method: "bitcoin".to_owned(),
            card_number: String::new(),
            expiry: String::new(),
            cvv: String::new(),
            card_name: String::new(),
        }
        .into_details();
        assert_eq!(details.method, PaymentMethod::Credit);
        assert_eq!(details.validate(), Err(CheckoutError::InvalidCardNumber));
    }

    #[test]
    fn test_payment_form_debug_hides_card() {
        let form = PaymentForm {
            method: "credit".to_owned(),
            card_number: "4242424242424242".to_owned(),
            expiry: "12/29".to_owned(),
            cvv: "123".to_owned(),
            card_name: "Ada".to_owned(),
        };
        let printed = format!("{form:?}");
        assert!(!printed.contains("4242"));
        assert!(!printed.contains("123"));
    }

    #[test]
    fn test_method_options() {
        let options = method_options(PaymentMethod::Paypal);
        assert_eq!(options.len(), 3);
        assert!(options.iter().any(|m| m.value == "paypal" && m.checked));
        assert_eq!(options.iter().filter(|m| m.checked).count(), 1);
    }
}
