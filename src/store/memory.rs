use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{AuthStore, NewUser, Session, User};
use crate::error::DatabaseError;

#[derive(Default)]
struct Users {
    next_id: i64,
    by_email: HashMap<String, User>,
}

/// Process-local store. Each map sits behind its own lock, so every
/// operation is a single atomic read or write.
#[derive(Default)]
pub struct InMemoryStore {
    users: RwLock<Users>,
    sessions: RwLock<HashMap<String, Session>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl AuthStore for InMemoryStore {
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        Ok(self.users.read().await.by_email.get(email).cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, DatabaseError> {
        let mut users = self.users.write().await;
        if users.by_email.contains_key(&user.email) {
            return Err(DatabaseError::UniqueConstraintViolation(format!(
                "email {} already registered",
                user.email
            )));
        }

        users.next_id += 1;
        let created = User {
            id: users.next_id,
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            is_admin: user.is_admin,
            created_at: Utc::now(),
        };
        users.by_email.insert(created.email.clone(), created.clone());
        Ok(created)
    }

    async fn create_session(&self, session: Session) -> Result<Session, DatabaseError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.id) {
            return Err(DatabaseError::UniqueConstraintViolation(format!(
                "session {}",
                session.id
            )));
        }
        sessions.insert(session.id.clone(), session.clone());
        Ok(session)
    }

    async fn get_session(&self, id: &str) -> Result<Option<Session>, DatabaseError> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn delete_session(&self, id: &str) -> Result<(), DatabaseError> {
        self.sessions
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| DatabaseError::NotFound(format!("session {}", id)))
    }

    async fn revoke_session(&self, id: &str) -> Result<(), DatabaseError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| DatabaseError::NotFound(format!("session {}", id)))?;
        session.is_revoked = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(id: &str) -> Session {
        let now = Utc::now();
        Session {
            id: id.to_string(),
            user_email: "a@x.com".to_string(),
            refresh_token_hash: "deadbeef".to_string(),
            is_revoked: false,
            expires_at: now + Duration::hours(24),
            created_at: now,
        }
    }

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Ada".to_string(),
            email: email.to_string(),
            password_hash: "$2b$04$hash".to_string(),
            is_admin: false,
        }
    }

    #[tokio::test]
    async fn test_user_ids_increment_and_emails_unique() {
        let store = InMemoryStore::new();

        let a = store.create_user(new_user("a@x.com")).await.unwrap();
        let b = store.create_user(new_user("b@x.com")).await.unwrap();
        assert_eq!(a.id + 1, b.id);

        let dup = store.create_user(new_user("a@x.com")).await;
        assert!(matches!(dup, Err(DatabaseError::UniqueConstraintViolation(_))));
    }

    #[tokio::test]
    async fn test_email_lookup_is_case_sensitive() {
        let store = InMemoryStore::new();
        store.create_user(new_user("a@x.com")).await.unwrap();

        assert!(store.get_user_by_email("a@x.com").await.unwrap().is_some());
        assert!(store.get_user_by_email("A@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let store = InMemoryStore::new();
        store.create_session(session("s1")).await.unwrap();

        let fetched = store.get_session("s1").await.unwrap().unwrap();
        assert!(!fetched.is_revoked);

        store.revoke_session("s1").await.unwrap();
        assert!(store.get_session("s1").await.unwrap().unwrap().is_revoked);

        store.delete_session("s1").await.unwrap();
        assert!(store.get_session("s1").await.unwrap().is_none());
        assert_eq!(store.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_missing_session_operations() {
        let store = InMemoryStore::new();
        assert!(matches!(
            store.delete_session("nope").await,
            Err(DatabaseError::NotFound(_))
        ));
        assert!(matches!(
            store.revoke_session("nope").await,
            Err(DatabaseError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_session_id_rejected() {
        let store = InMemoryStore::new();
        store.create_session(session("s1")).await.unwrap();
        assert!(store.create_session(session("s1")).await.is_err());
    }
}
