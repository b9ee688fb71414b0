//! Newtype IDs for type-safe entity references.
//!
//! IDs are opaque strings so the persisted JSON stays readable by anything
//! that already understands the store layout. Users and orders receive
//! time-derived identifiers from [`MonotonicIds`]; catalog products keep the
//! short identifiers of the static menu.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>`, `From<&str>` and `AsRef<str>` implementations
///
/// # Example
///
/// ```rust
/// # use mocktail_core::define_id;
/// define_id!(TableId);
/// define_id!(BottleId);
///
/// let table = TableId::new("7");
/// let bottle = BottleId::new("7");
/// assert_eq!(table.as_str(), bottle.as_str());
///
/// // These are different types, so this won't compile:
/// // let _: TableId = bottle;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID and return the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(UserId);
define_id!(OrderId);
define_id!(ProductId);

/// Time-derived identifier source.
///
/// Each call returns the current Unix time in milliseconds, bumped past the
/// last value handed out so two IDs issued within the same millisecond
/// never collide. Values are strictly increasing for the lifetime of the
/// generator.
#[derive(Debug, Default)]
pub struct MonotonicIds {
    last: AtomicI64,
}

impl MonotonicIds {
    /// Create a generator that has not issued any IDs yet.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last: AtomicI64::new(0),
        }
    }

    /// Issue the next identifier based on the system clock.
    pub fn next(&self) -> i64 {
        self.next_at(Utc::now().timestamp_millis())
    }

    /// Issue the next identifier as if the clock read `now_millis`.
    pub fn next_at(&self, now_millis: i64) -> i64 {
        let mut prev = self.last.load(Ordering::Acquire);
        loop {
            let candidate = now_millis.max(prev.saturating_add(1));
            match self.last.compare_exchange_weak(
                prev,
                candidate,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return candidate,
                Err(actual) => prev = actual,
            }
        }
    }

    /// Record an identifier issued elsewhere (e.g. loaded from storage) so
    /// later IDs sort after it.
    pub fn observe(&self, issued: i64) {
        self.last.fetch_max(issued, Ordering::AcqRel);
    }

    /// Issue a new user identifier.
    pub fn user_id(&self) -> UserId {
        UserId::new(self.next().to_string())
    }

    /// Issue a new order identifier.
    pub fn order_id(&self) -> OrderId {
        OrderId::new(self.next().to_string())
    }
}
