/// Refresh Token Sessions
///
/// A refresh token is an ordinary signed token whose `jti` keys a stored
/// session. The session keeps a SHA-256 digest of the token, never the
/// plaintext, and can be revoked independently of the token's expiry.

use chrono::Utc;
use sha2::{Digest, Sha256};

use crate::auth::claims::Claims;
use crate::store::Session;

/// Hash a refresh token using SHA-256 (lowercase hex)
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Build the session record for a freshly minted refresh token.
pub fn session_for(token: &str, claims: &Claims) -> Session {
    Session {
        id: claims.jti.clone(),
        user_email: claims.email.clone(),
        refresh_token_hash: hash_token(token),
        is_revoked: false,
        expires_at: claims.expires_at(),
        created_at: Utc::now(),
    }
}

/// Whether `token` is the one `session` was created for.
pub fn matches_session(token: &str, session: &Session) -> bool {
    hash_token(token) == session.refresh_token_hash
}
