/// JWT Claims structure
///
/// Access and refresh tokens carry the same claim set; they differ only in
/// lifetime, and only refresh tokens are backed by a stored session.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (numeric user ID)
    pub sub: i64,
    /// User email
    pub email: String,
    /// Administrator flag
    pub is_admin: bool,
    /// Unique token identifier; primary key of the session for refresh tokens
    pub jti: String,
    /// Issuer
    pub iss: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp, exclusive)
    pub exp: i64,
}

impl Claims {
    /// Build claims issued at `now` and expiring exactly `duration` later.
    pub fn new(
        user_id: i64,
        email: String,
        is_admin: bool,
        issuer: String,
        now: DateTime<Utc>,
        duration: Duration,
    ) -> Self {
        let iat = now.timestamp();
        Self {
            sub: user_id,
            email,
            is_admin,
            jti: Uuid::new_v4().to_string(),
            iss: issuer,
            iat,
            exp: iat + duration.num_seconds(),
        }
    }

    pub fn user_id(&self) -> i64 {
        self.sub
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(self.iat, 0).unwrap_or_default()
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(self.exp, 0).unwrap_or_default()
    }

    /// A token is expired from the instant `exp` is reached.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims_at(now: DateTime<Utc>, duration: Duration) -> Claims {
        Claims::new(7, "a@x.com".to_string(), false, "test".to_string(), now, duration)
    }

    #[test]
    fn test_claims_creation() {
        let now = Utc::now();
        let claims = claims_at(now, Duration::minutes(15));

        assert_eq!(claims.user_id(), 7);
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.iss, "test");
        assert_eq!(claims.exp - claims.iat, 15 * 60);
        assert_eq!(claims.iat, now.timestamp());
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_jti_is_unique() {
        let now = Utc::now();
        let a = claims_at(now, Duration::minutes(15));
        let b = claims_at(now, Duration::minutes(15));
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn test_expiry_is_exclusive() {
        let now = Utc::now();
        let claims = claims_at(now, Duration::seconds(60));

        assert!(!claims.is_expired_at(now + Duration::seconds(59)));
        assert!(claims.is_expired_at(now + Duration::seconds(60)));
        assert!(claims.is_expired_at(now + Duration::seconds(61)));
    }

    #[test]
    fn test_timestamps_roundtrip() {
        let now = Utc::now();
        let claims = claims_at(now, Duration::hours(24));
        assert_eq!(claims.issued_at().timestamp(), now.timestamp());
        assert_eq!(claims.expires_at() - claims.issued_at(), Duration::hours(24));
    }
}
