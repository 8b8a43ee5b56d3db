/// Password Hashing and Verification
///
/// bcrypt with a fixed cost factor. Hashes embed algorithm, cost and a
/// random salt, so they are only ever compared through `verify_password`.

use bcrypt::{hash, verify, DEFAULT_COST};

use crate::error::{AppError, AuthError, ValidationError};

/// Work factor for every stored hash. Not user-configurable.
pub const HASH_COST: u32 = DEFAULT_COST;

const MIN_PASSWORD_LENGTH: usize = 8;
// bcrypt only consumes the first 72 bytes
const MAX_PASSWORD_LENGTH: usize = 72;

/// Hash a password using bcrypt
///
/// # Errors
/// `AuthError::HashingFailure` if bcrypt fails internally (randomness or
/// algorithm error). The content of the password never causes an error.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    hash(password, HASH_COST).map_err(|e| AuthError::HashingFailure(e.to_string()))
}

/// Verify a password against its hash
///
/// Returns `Ok(false)` on a legitimate mismatch.
///
/// # Errors
/// `AuthError::HashingFailure` if `hash` is not a structurally valid bcrypt
/// hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    verify(password, hash).map_err(|e| AuthError::HashingFailure(e.to_string()))
}

/// Password policy for new accounts
///
/// - 8 to 72 bytes
/// - at least one digit, one lowercase and one uppercase letter
///
/// Only applied at registration; login verifies whatever was submitted.
pub fn validate_password_strength(password: &str) -> Result<(), AppError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::TooShort("password".to_string(), MIN_PASSWORD_LENGTH).into());
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::TooLong("password".to_string(), MAX_PASSWORD_LENGTH).into());
    }

    let has_digit = password.chars().any(|c| c.is_numeric());
    let has_lowercase = password.chars().any(|c| c.is_lowercase());
    let has_uppercase = password.chars().any(|c| c.is_uppercase());

    if !has_digit || !has_lowercase || !has_uppercase {
        return Err(ValidationError::InvalidFormat(
            "password must contain at least one digit, one lowercase letter, and one uppercase letter"
                .to_string(),
        )
        .into());
    }

    Ok(())
}
