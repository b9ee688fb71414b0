//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `profile` - Registration, login, profile edits and order history
//! - `payment` - Payment gateway seam and the simulated processor
//! - `checkout` - The payment step: charge, record orders, empty the cart

pub mod checkout;
pub mod payment;
pub mod profile;

pub use checkout::{CheckoutService, InFlightPayments, PayError};
pub use payment::{ChargeRequest, PaymentError, PaymentGateway, PaymentReceipt, SimulatedGateway};
pub use profile::{AuthError, ProfileStore, Registration};
