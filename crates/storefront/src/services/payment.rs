//! Payment gateway.
//!
//! Checkout charges the customer through a [`PaymentGateway`] and treats its
//! answer as final. The bundled [`SimulatedGateway`] waits a configurable
//! time and approves a configurable share of payments. It stands in for a
//! real processor during development and tests.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use thiserror::Error;
use uuid::Uuid;

use mocktail_core::{PaymentMethod, Price};

use crate::config::PaymentConfig;

/// Errors a payment attempt can end in. Both are retryable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    /// The processor refused the charge.
    #[error("Payment failed. Please check your card details and try again.")]
    Declined,

    /// The processor could not be reached or errored.
    #[error("An error occurred during payment processing. Please try again.")]
    Unavailable(String),
}

/// What is being charged.
#[derive(Debug, Clone)]
pub struct ChargeRequest {
    pub amount: Price,
    pub method: PaymentMethod,
    /// `**** **** **** 1234` for cards.
    pub masked_card: Option<String>,
}

/// Proof of an approved charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReceipt {
    pub reference: String,
}

/// Something that can take a customer's money.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Attempt the charge.
    async fn charge(&self, request: &ChargeRequest) -> Result<PaymentReceipt, PaymentError>;
}

/// Development gateway with fixed latency and a random decline rate.
#[derive(Debug, Clone)]
pub struct SimulatedGateway {
    delay: Duration,
    success_rate: f64,
}

impl SimulatedGateway {
    /// Create a gateway. `success_rate` is clamped into `0.0..=1.0`.
    #[must_use]
    pub fn new(delay: Duration, success_rate: f64) -> Self {
        let success_rate = if success_rate.is_nan() {
            0.0
        } else {
            success_rate.clamp(0.0, 1.0)
        };
        Self {
            delay,
            success_rate,
        }
    }

    /// Always approves immediately.
    #[must_use]
    pub fn always_approve() -> Self {
        Self::new(Duration::ZERO, 1.0)
    }

    /// Always declines immediately.
    #[must_use]
    pub fn always_decline() -> Self {
        Self::new(Duration::ZERO, 0.0)
    }
}

impl From<PaymentConfig> for SimulatedGateway {
    fn from(config: PaymentConfig) -> Self {
        Self::new(config.delay, config.success_rate)
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn charge(&self, request: &ChargeRequest) -> Result<PaymentReceipt, PaymentError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let approved = rand::rng().random_bool(self.success_rate);
        if !approved {
            tracing::info!(amount = %request.amount, method = %request.method, "Simulated payment declined");
            return Err(PaymentError::Declined);
        }

        let reference = Uuid::new_v4().to_string();
        tracing::info!(amount = %request.amount, method = %request.method, %reference, "Simulated payment approved");
        Ok(PaymentReceipt { reference })
    }
}
