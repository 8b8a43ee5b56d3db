/// User and Session persistence
///
/// `AuthStore` is the contract the auth flow needs from persistence. Two
/// implementations ship with the crate: `PgStore` (sqlx/Postgres) for
/// production and `InMemoryStore` for tests and single-process demos.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::DatabaseError;

mod memory;
mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

/// Identity record owned by persistence. The hash never leaves the server.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a user; `password_hash` must come from the hasher.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
}

/// Public view of a user
#[derive(Debug, Clone, Serialize, serde::Deserialize, PartialEq)]
pub struct UserProfile {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            is_admin: user.is_admin,
        }
    }
}

/// Durable record backing a refresh token, keyed by the token's `jti`
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Session {
    pub id: String,
    pub user_email: String,
    /// SHA-256 hex digest of the refresh token string
    pub refresh_token_hash: String,
    pub is_revoked: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[async_trait]
pub trait AuthStore: Send + Sync {
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;

    /// Fails with `UniqueConstraintViolation` when the email is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, DatabaseError>;

    /// Fails with `UniqueConstraintViolation` when the id already exists.
    async fn create_session(&self, session: Session) -> Result<Session, DatabaseError>;

    async fn get_session(&self, id: &str) -> Result<Option<Session>, DatabaseError>;

    /// Fails with `NotFound` when no session has this id.
    async fn delete_session(&self, id: &str) -> Result<(), DatabaseError>;

    /// Single-row update of the revoked flag. Fails with `NotFound` when no
    /// session has this id.
    async fn revoke_session(&self, id: &str) -> Result<(), DatabaseError>;
}
