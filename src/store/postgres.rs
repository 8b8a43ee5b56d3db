use async_trait::async_trait;
use sqlx::PgPool;

use super::{AuthStore, NewUser, Session, User};
use crate::error::DatabaseError;

/// Postgres-backed store. Schema lives in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthStore for PgStore {
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, is_admin, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create_user(&self, user: NewUser) -> Result<User, DatabaseError> {
        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash, is_admin, created_at)
            VALUES ($1, $2, $3, $4, now())
            RETURNING id, name, email, password_hash, is_admin, created_at
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.is_admin)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn create_session(&self, session: Session) -> Result<Session, DatabaseError> {
        let created = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (id, user_email, refresh_token_hash, is_revoked, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_email, refresh_token_hash, is_revoked, expires_at, created_at
            "#,
        )
        .bind(&session.id)
        .bind(&session.user_email)
        .bind(&session.refresh_token_hash)
        .bind(session.is_revoked)
        .bind(session.expires_at)
        .bind(session.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn get_session(&self, id: &str) -> Result<Option<Session>, DatabaseError> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            SELECT id, user_email, refresh_token_hash, is_revoked, expires_at, created_at
            FROM sessions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    async fn delete_session(&self, id: &str) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("session {}", id)));
        }
        Ok(())
    }

    async fn revoke_session(&self, id: &str) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE sessions SET is_revoked = true WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("session {}", id)));
        }
        Ok(())
    }
}
