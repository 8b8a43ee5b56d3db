//! Authentication flow: login, access-token renewal, logout and session
//! revocation, plus account registration.
//!
//! Access tokens are stateless and short-lived. Refresh tokens are backed by
//! a stored session so they can be revoked immediately; an access token
//! already issued for a revoked session stays valid until its own expiry.

use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::auth::claims::Claims;
use crate::auth::jwt::JwtMaker;
use crate::auth::password::{hash_password, validate_password_strength, verify_password};
use crate::auth::refresh_token::{matches_session, session_for};
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError, DatabaseError, ValidationError};
use crate::store::{AuthStore, NewUser, User};
use crate::validators::{is_valid_email, is_valid_name};

/// Everything a successful login hands back to the caller.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub session_id: String,
    pub access_token: String,
    pub access_claims: Claims,
    pub refresh_token: String,
    pub refresh_claims: Claims,
    pub user: User,
}

/// Input for account registration, before validation.
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub is_admin: bool,
}

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn AuthStore>,
    tokens: JwtMaker,
    access_token_ttl: Duration,
    refresh_token_ttl: Duration,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn AuthStore>,
        tokens: JwtMaker,
        access_token_ttl: Duration,
        refresh_token_ttl: Duration,
    ) -> Self {
        Self {
            store,
            tokens,
            access_token_ttl,
            refresh_token_ttl,
        }
    }

    pub fn from_settings(store: Arc<dyn AuthStore>, config: &JwtSettings) -> Self {
        Self::new(
            store,
            JwtMaker::from_settings(config),
            Duration::seconds(config.access_token_expiry),
            Duration::seconds(config.refresh_token_expiry),
        )
    }

    pub fn tokens(&self) -> &JwtMaker {
        &self.tokens
    }

    /// Create an account with a bcrypt-hashed password
    ///
    /// # Errors
    /// - validation errors for name, email or password policy
    /// - `DatabaseError::UniqueConstraintViolation` if the email is taken
    pub async fn register(&self, registration: Registration) -> Result<User, AppError> {
        let name = is_valid_name(&registration.name)?;
        let email = is_valid_email(&registration.email)?;
        validate_password_strength(&registration.password)?;

        let password_hash = hash_off_runtime(registration.password).await?;

        let user = self
            .store
            .create_user(NewUser {
                name,
                email,
                password_hash,
                is_admin: registration.is_admin,
            })
            .await?;

        tracing::info!(user_id = user.id, is_admin = user.is_admin, "User registered");
        Ok(user)
    }

    /// Verify credentials and open a new session
    ///
    /// Mints an access token and a refresh token, then stores a session
    /// keyed by the refresh token's `jti`. Nothing is stored on failure.
    ///
    /// # Errors
    /// `UserNotFound`, `BadCredentials`, `HashingFailure`, `SigningFailure`,
    /// or a persistence error from the store.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, AppError> {
        let user = self
            .store
            .get_user_by_email(email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !verify_off_runtime(password, &user.password_hash).await? {
            return Err(AuthError::BadCredentials.into());
        }

        let (access_token, access_claims) =
            self.tokens
                .create_token(user.id, &user.email, user.is_admin, self.access_token_ttl)?;
        let (refresh_token, refresh_claims) =
            self.tokens
                .create_token(user.id, &user.email, user.is_admin, self.refresh_token_ttl)?;

        let session = self
            .store
            .create_session(session_for(&refresh_token, &refresh_claims))
            .await?;

        tracing::info!(user_id = user.id, session_id = %session.id, "Session opened");

        Ok(LoginOutcome {
            session_id: session.id,
            access_token,
            access_claims,
            refresh_token,
            refresh_claims,
            user,
        })
    }

    /// Exchange a refresh token for a new access token
    ///
    /// The refresh token and its session are left untouched (no rotation).
    ///
    /// # Errors
    /// - `InvalidSignature`, `MalformedToken`, `TokenExpired` from verification
    /// - `SessionNotFound` if the session was logged out
    /// - `SessionRevoked` if the session was revoked
    /// - `SessionMismatch` if the session belongs to another identity
    pub async fn renew_access_token(&self, refresh_token: &str) -> Result<(String, Claims), AppError> {
        let refresh_claims = self.tokens.verify_token(refresh_token)?;

        let session = self
            .store
            .get_session(&refresh_claims.jti)
            .await?
            .ok_or(AuthError::SessionNotFound)?;

        if session.is_revoked {
            tracing::warn!(session_id = %session.id, "Renew attempted on revoked session");
            return Err(AuthError::SessionRevoked.into());
        }

        if session.user_email != refresh_claims.email || !matches_session(refresh_token, &session) {
            tracing::warn!(session_id = %session.id, "Refresh token does not match session owner");
            return Err(AuthError::SessionMismatch.into());
        }

        if session.is_expired_at(Utc::now()) {
            return Err(AuthError::TokenExpired.into());
        }

        let (access_token, access_claims) = self.tokens.create_token(
            refresh_claims.sub,
            &refresh_claims.email,
            refresh_claims.is_admin,
            self.access_token_ttl,
        )?;

        tracing::info!(
            user_id = refresh_claims.sub,
            session_id = %session.id,
            "Access token renewed"
        );

        Ok((access_token, access_claims))
    }

    /// Delete a session permanently
    ///
    /// # Errors
    /// `SessionNotFound` if no session has this id.
    pub async fn logout(&self, session_id: &str) -> Result<(), AppError> {
        let session_id = require_session_id(session_id)?;

        self.store
            .delete_session(session_id)
            .await
            .map_err(session_not_found)?;

        tracing::info!(session_id = %session_id, "Session closed");
        Ok(())
    }

    /// Mark a session revoked; it stays stored but can no longer renew
    ///
    /// # Errors
    /// `SessionNotFound` if no session has this id.
    pub async fn revoke_session(&self, session_id: &str) -> Result<(), AppError> {
        let session_id = require_session_id(session_id)?;

        self.store
            .revoke_session(session_id)
            .await
            .map_err(session_not_found)?;

        tracing::info!(session_id = %session_id, "Session revoked");
        Ok(())
    }
}

/// Rejects blank ids; anything else is used exactly as supplied.
fn require_session_id(session_id: &str) -> Result<&str, ValidationError> {
    if session_id.trim().is_empty() {
        return Err(ValidationError::EmptyField("session_id".to_string()));
    }
    Ok(session_id)
}

// bcrypt is CPU-bound; it runs on the blocking pool.
async fn hash_off_runtime(password: String) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AuthError::HashingFailure(e.to_string()))?
}

async fn verify_off_runtime(password: &str, hash: &str) -> Result<bool, AuthError> {
    let (password, hash) = (password.to_string(), hash.to_string());
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AuthError::HashingFailure(e.to_string()))?
}

fn session_not_found(err: DatabaseError) -> AppError {
    match err {
        DatabaseError::NotFound(_) => AuthError::SessionNotFound.into(),
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::refresh_token::hash_token;
    use crate::store::{InMemoryStore, Session};

    const SECRET: &str = "test-secret-key-at-least-32-characters-long";

    async fn service_with_user(email: &str, password: &str) -> (AuthService, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        store
            .create_user(NewUser {
                name: "Test".to_string(),
                email: email.to_string(),
                password_hash: hash_password(password).unwrap(),
                is_admin: false,
            })
            .await
            .unwrap();

        let service = AuthService::new(
            store.clone(),
            JwtMaker::new(SECRET, "test"),
            Duration::minutes(15),
            Duration::hours(24),
        );
        (service, store)
    }

    #[tokio::test]
    async fn test_login_issues_tokens_and_session() {
        let (service, store) = service_with_user("a@x.com", "secret123").await;
        let before = Utc::now().timestamp();

        let outcome = service.login("a@x.com", "secret123").await.unwrap();

        assert!(!outcome.access_token.is_empty());
        assert!(!outcome.refresh_token.is_empty());
        assert_eq!(outcome.session_id, outcome.refresh_claims.jti);
        assert_ne!(outcome.access_claims.jti, outcome.refresh_claims.jti);
        assert_eq!(outcome.access_claims.exp - outcome.access_claims.iat, 15 * 60);
        assert_eq!(outcome.refresh_claims.exp - outcome.refresh_claims.iat, 24 * 3600);
        assert!(outcome.access_claims.iat >= before);

        let session = store.get_session(&outcome.session_id).await.unwrap().unwrap();
        assert_eq!(session.user_email, "a@x.com");
        assert!(!session.is_revoked);
        assert_eq!(session.expires_at, outcome.refresh_claims.expires_at());
        assert_eq!(session.refresh_token_hash, hash_token(&outcome.refresh_token));
    }

    #[tokio::test]
    async fn test_login_wrong_password_creates_nothing() {
        let (service, store) = service_with_user("a@x.com", "secret123").await;

        let result = service.login("a@x.com", "wrong").await;

        assert_eq!(result.unwrap_err(), AppError::Auth(AuthError::BadCredentials));
        assert_eq!(store.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_login_unknown_user() {
        let (service, store) = service_with_user("a@x.com", "secret123").await;

        let result = service.login("nobody@x.com", "secret123").await;

        assert_eq!(result.unwrap_err(), AppError::Auth(AuthError::UserNotFound));
        assert_eq!(store.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_concurrent_logins_are_independent() {
        let (service, store) = service_with_user("a@x.com", "secret123").await;

        let first = service.login("a@x.com", "secret123").await.unwrap();
        let second = service.login("a@x.com", "secret123").await.unwrap();

        assert_ne!(first.session_id, second.session_id);
        assert_eq!(store.session_count().await, 2);
    }

    #[tokio::test]
    async fn test_renew_keeps_identity_and_refresh_token() {
        let (service, store) = service_with_user("a@x.com", "secret123").await;
        let outcome = service.login("a@x.com", "secret123").await.unwrap();

        let (access_token, claims) = service.renew_access_token(&outcome.refresh_token).await.unwrap();

        assert_eq!(claims.sub, outcome.user.id);
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.is_admin, outcome.user.is_admin);
        assert_eq!(claims.exp - claims.iat, 15 * 60);
        assert_eq!(service.tokens().verify_token(&access_token).unwrap(), claims);

        // No rotation: the same refresh token keeps working
        assert!(service.renew_access_token(&outcome.refresh_token).await.is_ok());
        let session = store.get_session(&outcome.session_id).await.unwrap().unwrap();
        assert!(!session.is_revoked);
    }

    #[tokio::test]
    async fn test_renew_after_revoke_fails() {
        let (service, _) = service_with_user("a@x.com", "secret123").await;
        let outcome = service.login("a@x.com", "secret123").await.unwrap();

        service.revoke_session(&outcome.session_id).await.unwrap();

        assert_eq!(
            service.renew_access_token(&outcome.refresh_token).await.unwrap_err(),
            AppError::Auth(AuthError::SessionRevoked)
        );
        // The already-issued access token is still valid until it expires
        assert!(service.tokens().verify_token(&outcome.access_token).is_ok());
    }

    #[tokio::test]
    async fn test_operations_after_logout_fail() {
        let (service, _) = service_with_user("a@x.com", "secret123").await;
        let outcome = service.login("a@x.com", "secret123").await.unwrap();

        service.logout(&outcome.session_id).await.unwrap();

        let not_found = AppError::Auth(AuthError::SessionNotFound);
        assert_eq!(
            service.renew_access_token(&outcome.refresh_token).await.unwrap_err(),
            not_found
        );
        assert_eq!(service.logout(&outcome.session_id).await.unwrap_err(), not_found);
        assert_eq!(service.revoke_session(&outcome.session_id).await.unwrap_err(), not_found);
    }

    #[tokio::test]
    async fn test_renew_with_mismatched_email() {
        let (service, store) = service_with_user("a@x.com", "secret123").await;

        let (token, claims) = service
            .tokens()
            .create_token(1, "b@x.com", false, Duration::hours(24))
            .unwrap();
        let mut session = session_for(&token, &claims);
        session.user_email = "a@x.com".to_string();
        store.create_session(session).await.unwrap();

        assert_eq!(
            service.renew_access_token(&token).await.unwrap_err(),
            AppError::Auth(AuthError::SessionMismatch)
        );
    }

    #[tokio::test]
    async fn test_renew_with_foreign_token_for_session_id() {
        let (service, store) = service_with_user("a@x.com", "secret123").await;

        let (token, claims) = service
            .tokens()
            .create_token(1, "a@x.com", false, Duration::hours(24))
            .unwrap();
        store
            .create_session(Session {
                refresh_token_hash: hash_token("some-other-token"),
                ..session_for(&token, &claims)
            })
            .await
            .unwrap();

        assert_eq!(
            service.renew_access_token(&token).await.unwrap_err(),
            AppError::Auth(AuthError::SessionMismatch)
        );
    }

    #[tokio::test]
    async fn test_renew_rejects_bad_tokens() {
        let (service, _) = service_with_user("a@x.com", "secret123").await;
        let outcome = service.login("a@x.com", "secret123").await.unwrap();

        assert_eq!(
            service.renew_access_token("garbage").await.unwrap_err(),
            AppError::Auth(AuthError::MalformedToken)
        );

        let foreign = JwtMaker::new("another-secret-key-also-32-characters!!", "test");
        let (token, _) = foreign
            .create_token(outcome.user.id, "a@x.com", false, Duration::hours(24))
            .unwrap();
        assert_eq!(
            service.renew_access_token(&token).await.unwrap_err(),
            AppError::Auth(AuthError::InvalidSignature)
        );
    }

    #[tokio::test]
    async fn test_renew_with_expired_refresh_token() {
        let (service, store) = service_with_user("a@x.com", "secret123").await;

        let past = Utc::now() - Duration::hours(48);
        let (token, claims) = service
            .tokens()
            .create_token_at(1, "a@x.com", false, Duration::hours(24), past)
            .unwrap();
        store.create_session(session_for(&token, &claims)).await.unwrap();

        assert_eq!(
            service.renew_access_token(&token).await.unwrap_err(),
            AppError::Auth(AuthError::TokenExpired)
        );
    }

    #[tokio::test]
    async fn test_blank_session_id_is_rejected() {
        let (service, _) = service_with_user("a@x.com", "secret123").await;

        assert!(matches!(
            service.logout("  ").await,
            Err(AppError::Validation(ValidationError::EmptyField(_)))
        ));
        assert!(matches!(
            service.revoke_session("").await,
            Err(AppError::Validation(ValidationError::EmptyField(_)))
        ));
    }

    #[tokio::test]
    async fn test_session_id_is_not_trimmed() {
        let (service, store) = service_with_user("a@x.com", "secret123").await;
        let outcome = service.login("a@x.com", "secret123").await.unwrap();

        let padded = format!(" {}", outcome.session_id);
        assert_eq!(
            service.logout(&padded).await.unwrap_err(),
            AppError::Auth(AuthError::SessionNotFound)
        );
        assert_eq!(
            service.revoke_session(&padded).await.unwrap_err(),
            AppError::Auth(AuthError::SessionNotFound)
        );

        let session = store.get_session(&outcome.session_id).await.unwrap().unwrap();
        assert!(!session.is_revoked);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_password_work_runs_off_the_async_workers() {
        let (service, store) = service_with_user("a@x.com", "secret123").await;

        let (first, second, wrong) = tokio::join!(
            service.login("a@x.com", "secret123"),
            service.login("a@x.com", "secret123"),
            service.login("a@x.com", "nope"),
        );

        assert_ne!(first.unwrap().session_id, second.unwrap().session_id);
        assert_eq!(wrong.unwrap_err(), AppError::Auth(AuthError::BadCredentials));
        assert_eq!(store.session_count().await, 2);
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let store = Arc::new(InMemoryStore::new());
        let service = AuthService::new(
            store,
            JwtMaker::new(SECRET, "test"),
            Duration::minutes(15),
            Duration::hours(24),
        );

        let user = service
            .register(Registration {
                name: " Ada ".to_string(),
                email: "ada@example.com".to_string(),
                password: "SecurePass123".to_string(),
                is_admin: true,
            })
            .await
            .unwrap();
        assert_eq!(user.name, "Ada");
        assert_ne!(user.password_hash, "SecurePass123");

        let outcome = service.login("ada@example.com", "SecurePass123").await.unwrap();
        assert!(outcome.access_claims.is_admin);

        let duplicate = service
            .register(Registration {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                password: "SecurePass123".to_string(),
                is_admin: false,
            })
            .await;
        assert!(matches!(
            duplicate,
            Err(AppError::Database(DatabaseError::UniqueConstraintViolation(_)))
        ));
    }
}
