pub mod memory;
pub mod mongo;

pub use memory::InMemoryUserStore;
pub use mongo::MongoUserStore;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{Credentials, HashedPassword, NewUser, PasswordReset, User, UserPage, UserQuery};

/// Credential store trait for abstracting the user document backend
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user. Duplicate emails fail with `AppError::Conflict`.
    async fn insert(&self, user: NewUser) -> AppResult<User>;

    /// Find user by ID
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Find user by email (password hash excluded)
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Find user by email with the stored password hash (sign-in only)
    async fn find_credentials(&self, email: &str) -> AppResult<Option<Credentials>>;

    /// Find the user holding an unexpired reset token with this hash
    async fn find_by_reset_token(
        &self,
        token_hash: &str,
        now: OffsetDateTime,
    ) -> AppResult<Option<User>>;

    /// Store or clear the pending password reset, touching nothing else
    async fn set_password_reset(&self, id: Uuid, reset: Option<&PasswordReset>) -> AppResult<()>;

    /// Replace the password and clear the reset state, but only while the
    /// reset token with `token_hash` is still pending. Returns false otherwise.
    async fn complete_password_reset(
        &self,
        id: Uuid,
        token_hash: &str,
        password_hash: &HashedPassword,
        changed_at: OffsetDateTime,
    ) -> AppResult<bool>;

    /// Delete user by ID. Returns false when nothing was deleted.
    async fn delete(&self, id: Uuid) -> AppResult<bool>;

    /// One page of matching users plus collection-wide counts
    async fn search(&self, query: &UserQuery) -> AppResult<UserPage>;
}
