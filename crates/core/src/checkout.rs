//! Checkout wizard state and payment form handling.
//!
//! The flow is linear: shipping, then payment, then processing, ending in
//! success or a retryable failure. [`CheckoutFlow`] enforces the ordering;
//! the storefront persists it in the browser session between requests.

use core::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cart::{Cart, CartLineItem};
use crate::types::{Email, PaymentMethod, Price};

/// Sales tax applied to the cart subtotal (8%).
pub const TAX_RATE: Decimal = Decimal::from_parts(8, 0, 0, false, 2);

/// Flat shipping fee in cents.
pub const SHIPPING_FEE_CENTS: i64 = 599;

/// Minimum digits in a credit card number.
const MIN_CARD_DIGITS: usize = 16;

/// Errors raised by the checkout flow.
///
/// The `Display` text is shown to the customer as an inline form message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    #[error("Your cart is empty")]
    EmptyCart,

    #[error("Please enter your {0}")]
    MissingField(&'static str),

    #[error("Please enter a valid email address")]
    InvalidEmail,

    #[error("Please enter a valid card number")]
    InvalidCardNumber,

    #[error("Please enter a valid expiry date")]
    InvalidExpiry,

    #[error("Please enter a valid CVV")]
    InvalidCvv,

    #[error("Please enter the cardholder name")]
    MissingCardName,

    #[error("Please complete your shipping details first")]
    MissingShipping,

    #[error("This checkout step is not available while {0}")]
    InvalidStage(CheckoutStage),
}

/// Where the customer is in the wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStage {
    #[default]
    CollectingShipping,
    CollectingPayment,
    Processing,
    Succeeded,
    /// Payment was declined; the payment step accepts a retry.
    Failed,
}

impl fmt::Display for CheckoutStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CollectingShipping => "collecting shipping details",
            Self::CollectingPayment => "collecting payment",
            Self::Processing => "processing payment",
            Self::Succeeded => "complete",
            Self::Failed => "payment failed",
        })
    }
}

/// Delivery details from the first checkout step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShippingInfo {
    pub name: String,
    pub address: String,
    pub email: String,
    pub phone: String,
    pub city: String,
    pub zip: String,
}

impl ShippingInfo {
    /// Check the required fields.
    ///
    /// # Errors
    ///
    /// Returns the first problem found, in form order.
    pub fn validate(&self) -> Result<(), CheckoutError> {
        if self.name.trim().is_empty() {
            return Err(CheckoutError::MissingField("full name"));
        }
        if self.address.trim().is_empty() {
            return Err(CheckoutError::MissingField("address"));
        }
        if self.email.trim().is_empty() {
            return Err(CheckoutError::MissingField("email"));
        }
        Email::parse(&self.email).map_err(|_| CheckoutError::InvalidEmail)?;
        Ok(())
    }

    /// Copy with surrounding whitespace removed from every field.
    #[must_use]
    pub fn trimmed(&self) -> Self {
        Self {
            name: self.name.trim().to_owned(),
            address: self.address.trim().to_owned(),
            email: self.email.trim().to_owned(),
            phone: self.phone.trim().to_owned(),
            city: self.city.trim().to_owned(),
            zip: self.zip.trim().to_owned(),
        }
    }
}

/// Payment form contents.
///
/// Card fields are only consulted for [`PaymentMethod::Credit`].
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentDetails {
    pub method: PaymentMethod,
    pub card_number: String,
    pub expiry: String,
    pub cvv: String,
    pub card_name: String,
}

impl fmt::Debug for PaymentDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentDetails")
            .field("method", &self.method)
            .field("card", &self.masked_card())
            .finish_non_exhaustive()
    }
}

impl PaymentDetails {
    /// Copy with the card number grouped, the expiry as `MM/YY` and the
    /// CVV reduced to at most four digits.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            method: self.method,
            card_number: format_card_number(&self.card_number),
            expiry: format_expiry(&self.expiry),
            cvv: digits(&self.cvv).chars().take(4).collect(),
            card_name: self.card_name.trim().to_owned(),
        }
    }

    /// Check the card fields when paying by card.
    ///
    /// # Errors
    ///
    /// Returns the first problem found, in form order.
    pub fn validate(&self) -> Result<(), CheckoutError> {
        if self.method != PaymentMethod::Credit {
            return Ok(());
        }
        if digits(&self.card_number).len() < MIN_CARD_DIGITS {
            return Err(CheckoutError::InvalidCardNumber);
        }
        if self.expiry.trim().len() < 5 {
            return Err(CheckoutError::InvalidExpiry);
        }
        if self.cvv.trim().len() < 3 {
            return Err(CheckoutError::InvalidCvv);
        }
        if self.card_name.trim().is_empty() {
            return Err(CheckoutError::MissingCardName);
        }
        Ok(())
    }

    /// `**** **** **** 1234` for card payments.
    #[must_use]
    pub fn masked_card(&self) -> Option<String> {
        if self.method != PaymentMethod::Credit {
            return None;
        }
        let digits = digits(&self.card_number);
        let last4 = &digits[digits.len().saturating_sub(4)..];
        Some(format!("**** **** **** {last4}"))
    }
}

fn digits(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

/// Group a card number into blocks of four digits.
///
/// Non-digits are dropped and at most 16 digits are kept. Fewer than four
/// digits are returned ungrouped.
#[must_use]
pub fn format_card_number(raw: &str) -> String {
    let digits = digits(raw);
    if digits.len() < 4 {
        return digits;
    }
    digits
        .as_bytes()
        .chunks(4)
        .take(4)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Format an expiry date as `MM/YY`.
///
/// Non-digits are dropped. Fewer than two digits are returned as-is.
#[must_use]
pub fn format_expiry(raw: &str) -> String {
    let digits = digits(raw);
    if digits.len() < 2 {
        return digits;
    }
    let year_end = digits.len().min(4);
    format!("{}/{}", &digits[..2], &digits[2..year_end])
}

/// Subtotal, tax, shipping and grand total for a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub subtotal: Price,
    pub tax: Price,
    pub shipping: Price,
    pub total: Price,
}

impl OrderSummary {
    /// Totals for `cart`. Amounts stay exact until displayed.
    #[must_use]
    pub fn for_cart(cart: &Cart) -> Self {
        Self::for_subtotal(cart.total())
    }

    #[must_use]
    pub fn for_subtotal(subtotal: Price) -> Self {
        let tax = subtotal.scaled(TAX_RATE);
        let shipping = Price::from_cents(SHIPPING_FEE_CENTS);
        Self {
            subtotal,
            tax,
            shipping,
            total: subtotal + tax + shipping,
        }
    }
}

/// Receipt for a successful checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    pub order_number: String,
    pub order_date: DateTime<Utc>,
    pub items: Vec<CartLineItem>,
    pub summary: OrderSummary,
    pub shipping: ShippingInfo,
    pub payment_method: PaymentMethod,
    pub masked_card: Option<String>,
    /// Gateway reference for the charge.
    #[serde(default)]
    pub payment_reference: String,
}

/// Order number shown on the confirmation page.
#[must_use]
pub fn order_number(now: DateTime<Utc>) -> String {
    format!("ORD-{}", now.timestamp_millis())
}

/// The checkout wizard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutFlow {
    stage: CheckoutStage,
    shipping: Option<ShippingInfo>,
    error: Option<String>,
}

impl CheckoutFlow {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn stage(&self) -> CheckoutStage {
        self.stage
    }

    /// Shipping details, once submitted.
    #[must_use]
    pub const fn shipping(&self) -> Option<&ShippingInfo> {
        self.shipping.as_ref()
    }

    /// Message from the last declined payment.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether the payment step may be shown.
    #[must_use]
    pub const fn awaiting_payment(&self) -> bool {
        matches!(
            self.stage,
            CheckoutStage::CollectingPayment | CheckoutStage::Failed
        )
    }

    /// Accept shipping details and move to the payment step.
    ///
    /// Allowed from any stage except while a payment is processing, so a
    /// customer who went back can resubmit.
    ///
    /// # Errors
    ///
    /// Fails on an empty cart or invalid details, leaving the flow as it was.
    pub fn submit_shipping(&mut self, info: ShippingInfo, cart: &Cart) -> Result<(), CheckoutError> {
        if self.stage == CheckoutStage::Processing {
            return Err(CheckoutError::InvalidStage(self.stage));
        }
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let info = info.trimmed();
        info.validate()?;
        self.shipping = Some(info);
        self.stage = CheckoutStage::CollectingPayment;
        self.error = None;
        Ok(())
    }

    /// Return from payment to shipping, keeping the entered details.
    ///
    /// # Errors
    ///
    /// Fails unless the payment step is showing.
    pub fn back(&mut self) -> Result<(), CheckoutError> {
        if !self.awaiting_payment() {
            return Err(CheckoutError::InvalidStage(self.stage));
        }
        self.stage = CheckoutStage::CollectingShipping;
        self.error = None;
        Ok(())
    }

    /// Start processing a payment.
    ///
    /// # Errors
    ///
    /// Fails unless the payment step is showing, shipping details are
    /// present and the cart has lines.
    pub fn begin_processing(&mut self, cart: &Cart) -> Result<(), CheckoutError> {
        if !self.awaiting_payment() {
            return Err(CheckoutError::InvalidStage(self.stage));
        }
        if self.shipping.is_none() {
            return Err(CheckoutError::MissingShipping);
        }
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        self.stage = CheckoutStage::Processing;
        self.error = None;
        Ok(())
    }

    /// Record an approved payment.
    ///
    /// # Errors
    ///
    /// Fails unless a payment is processing.
    pub fn succeed(&mut self) -> Result<(), CheckoutError> {
        if self.stage != CheckoutStage::Processing {
            return Err(CheckoutError::InvalidStage(self.stage));
        }
        self.stage = CheckoutStage::Succeeded;
        Ok(())
    }

    /// Record a declined payment. The payment step accepts a retry.
    ///
    /// # Errors
    ///
    /// Fails unless a payment is processing.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), CheckoutError> {
        if self.stage != CheckoutStage::Processing {
            return Err(CheckoutError::InvalidStage(self.stage));
        }
        self.stage = CheckoutStage::Failed;
        self.error = Some(message.into());
        Ok(())
    }
}
