/// JWT Token Generation and Validation
///
/// `JwtMaker` signs and verifies claim sets with HS256. The signing secret is
/// injected at construction so tests can run with independent keys.
/// Verification is a pure function of the token, the key and the clock; it
/// never consults the session store.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::claims::Claims;
use crate::configuration::JwtSettings;
use crate::error::AuthError;

const ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Clone)]
pub struct JwtMaker {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
}

impl std::fmt::Debug for JwtMaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtMaker").field("issuer", &self.issuer).finish_non_exhaustive()
    }
}

impl JwtMaker {
    pub fn new(secret: &str, issuer: impl Into<String>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.into(),
        }
    }

    pub fn from_settings(config: &JwtSettings) -> Self {
        Self::new(&config.secret, config.issuer.clone())
    }

    /// Mint a signed token valid for `duration` from now
    ///
    /// # Errors
    /// `AuthError::SigningFailure` if the encoder fails
    pub fn create_token(
        &self,
        user_id: i64,
        email: &str,
        is_admin: bool,
        duration: Duration,
    ) -> Result<(String, Claims), AuthError> {
        self.create_token_at(user_id, email, is_admin, duration, Utc::now())
    }

    /// Same as [`JwtMaker::create_token`] with an explicit issue time.
    pub fn create_token_at(
        &self,
        user_id: i64,
        email: &str,
        is_admin: bool,
        duration: Duration,
        now: DateTime<Utc>,
    ) -> Result<(String, Claims), AuthError> {
        let claims = Claims::new(
            user_id,
            email.to_string(),
            is_admin,
            self.issuer.clone(),
            now,
            duration,
        );

        let token = encode(&Header::new(ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| AuthError::SigningFailure(e.to_string()))?;

        Ok((token, claims))
    }

    /// Validate a token and return its claims
    ///
    /// # Errors
    /// - `MalformedToken` if the token cannot be parsed
    /// - `InvalidSignature` if the MAC does not match or another issuer signed it
    /// - `TokenExpired` if `now >= exp`
    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        self.verify_token_at(token, Utc::now())
    }

    /// Same as [`JwtMaker::verify_token`] against an explicit clock reading.
    pub fn verify_token_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(ALGORITHM);
        // Expiry is checked below against `now`, with no leeway
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_issuer(&[&self.issuer]);

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                let err = classify(e.kind());
                tracing::debug!(error = %e, "JWT validation error");
                err
            })?;

        if claims.is_expired_at(now) {
            return Err(AuthError::TokenExpired);
        }

        Ok(claims)
    }
}

fn classify(kind: &ErrorKind) -> AuthError {
    match kind {
        ErrorKind::InvalidSignature | ErrorKind::InvalidIssuer => AuthError::InvalidSignature,
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::MalformedToken,
    }
}
