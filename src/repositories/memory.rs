use async_trait::async_trait;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Credentials, HashedPassword, NewUser, PasswordReset, User, UserPage, UserQuery};
use crate::repositories::UserStore;

/// In-memory user store for testing
#[derive(Clone, Default)]
pub struct InMemoryUserStore {
    inner: Arc<Mutex<Vec<StoredUser>>>,
}

struct StoredUser {
    user: User,
    password_hash: HashedPassword,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert(&self, user: NewUser) -> AppResult<User> {
        let mut inner = self.inner.lock().await;

        if inner.iter().any(|stored| stored.user.email == user.email) {
            return Err(AppError::Conflict("Email already exists".to_string()));
        }

        let (user, password_hash) = user.into_user(OffsetDateTime::now_utc());
        inner.push(StoredUser {
            user: user.clone(),
            password_hash,
        });
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .iter()
            .find(|stored| stored.user.id == id)
            .map(|stored| stored.user.clone()))
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .iter()
            .find(|stored| stored.user.email == email)
            .map(|stored| stored.user.clone()))
    }

    async fn find_credentials(&self, email: &str) -> AppResult<Option<Credentials>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .iter()
            .find(|stored| stored.user.email == email)
            .map(|stored| Credentials {
                user: stored.user.clone(),
                password_hash: stored.password_hash.clone(),
            }))
    }

    async fn find_by_reset_token(
        &self,
        token_hash: &str,
        now: OffsetDateTime,
    ) -> AppResult<Option<User>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .iter()
            .find(|stored| {
                stored
                    .user
                    .password_reset
                    .as_ref()
                    .is_some_and(|reset| reset.token_hash == token_hash && !reset.is_expired(now))
            })
            .map(|stored| stored.user.clone()))
    }

    async fn set_password_reset(&self, id: Uuid, reset: Option<&PasswordReset>) -> AppResult<()> {
        let mut inner = self.inner.lock().await;
        let stored = inner
            .iter_mut()
            .find(|stored| stored.user.id == id)
            .ok_or_else(|| AppError::NotFound(format!("No user found with id: {}", id)))?;
        stored.user.password_reset = reset.cloned();
        Ok(())
    }

    async fn complete_password_reset(
        &self,
        id: Uuid,
        token_hash: &str,
        password_hash: &HashedPassword,
        changed_at: OffsetDateTime,
    ) -> AppResult<bool> {
        let mut inner = self.inner.lock().await;
        let Some(stored) = inner.iter_mut().find(|stored| {
            stored.user.id == id
                && stored
                    .user
                    .password_reset
                    .as_ref()
                    .is_some_and(|reset| reset.token_hash == token_hash)
        }) else {
            return Ok(false);
        };

        stored.password_hash = password_hash.clone();
        stored.user.password_changed_at = Some(changed_at);
        stored.user.password_reset = None;
        Ok(true)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let mut inner = self.inner.lock().await;
        let before = inner.len();
        inner.retain(|stored| stored.user.id != id);
        Ok(inner.len() < before)
    }

    async fn search(&self, query: &UserQuery) -> AppResult<UserPage> {
        let inner = self.inner.lock().await;

        // Insertion order is creation order
        let users = inner
            .iter()
            .map(|stored| &stored.user)
            .filter(|user| query.matches(user))
            .skip(usize::try_from(query.skip).unwrap_or(usize::MAX))
            .take(query.limit as usize)
            .cloned()
            .collect();

        Ok(UserPage {
            users,
            total_users: inner.len() as u64,
            users_on_vacation: inner.iter().filter(|s| s.user.on_vacation).count() as u64,
            users_on_holidays: inner.iter().filter(|s| s.user.on_holidays).count() as u64,
        })
    }
}
