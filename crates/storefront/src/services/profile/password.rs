//! Password hashing with Argon2id.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use secrecy::{ExposeSecret, SecretString};

use mocktail_core::PasswordDigest;

use super::AuthError;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Check password strength.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` if the password is too short.
pub fn validate_password(password: &SecretString) -> Result<(), AuthError> {
    if password.expose_secret().chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password with a fresh random salt.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &SecretString) -> Result<PasswordDigest, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.expose_secret().as_bytes(), &salt)
        .map(|hash| PasswordDigest::new(hash.to_string()))
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a stored digest.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` if the password does not match or
/// the digest is unreadable.
pub fn verify_password(password: &SecretString, digest: &PasswordDigest) -> Result<(), AuthError> {
    let parsed_hash =
        PasswordHash::new(digest.as_str()).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.expose_secret().as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let password = SecretString::from("secret");
        let digest = hash_password(&password).unwrap();

        assert!(digest.as_str().starts_with("$argon2id$"));
        assert!(!digest.as_str().contains("secret"));
        assert!(verify_password(&password, &digest).is_ok());
        assert!(matches!(
            verify_password(&SecretString::from("wrong"), &digest),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_salts_differ() {
        let password = SecretString::from("secret");
        let a = hash_password(&password).unwrap();
        let b = hash_password(&password).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_unreadable_digest_rejects() {
        let digest = PasswordDigest::new("plaintext".to_owned());
        assert!(verify_password(&SecretString::from("plaintext"), &digest).is_err());
    }

    #[test]
    fn test_minimum_length() {
        assert!(validate_password(&SecretString::from("12345")).is_err());
        assert!(validate_password(&SecretString::from("123456")).is_ok());
    }
}
