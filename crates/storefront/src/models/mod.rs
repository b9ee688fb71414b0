//! Per-browser session state.
//!
//! The signed-in user snapshot is owned by the profile store; this module
//! holds the cart, the checkout wizard and the last confirmation.

pub mod session;

pub use session::{
    SessionState, keys as session_keys, load_cart, load_checkout, load_confirmation, save_cart,
    save_checkout, save_confirmation,
};
