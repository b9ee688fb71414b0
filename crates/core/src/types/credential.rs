//! Stored credential type.

use serde::{Deserialize, Serialize};

/// A one-way password digest as persisted under `password_<userId>`.
///
/// Holds a PHC-format string (algorithm, parameters, salt and hash). The
/// plaintext password is never stored; producing and verifying digests is
/// the job of the storefront's auth service.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordDigest(String);

impl PasswordDigest {
    /// Wrap an already-computed PHC string.
    #[must_use]
    pub const fn new(phc: String) -> Self {
        Self(phc)
    }

    /// The PHC string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert into the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl core::fmt::Debug for PasswordDigest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("PasswordDigest([REDACTED])")
    }
}
