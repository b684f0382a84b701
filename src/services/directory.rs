use std::sync::Arc;

use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{CreateUser, NewUser, User, UserPage, UserQuery};
use crate::repositories::UserStore;
use crate::services::PasswordHasher;

/// Read and administer user records
#[derive(Clone)]
pub struct UserDirectory {
    users: Arc<dyn UserStore>,
    hasher: PasswordHasher,
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("No user found with id: {}", id))
}

impl UserDirectory {
    pub fn new(users: Arc<dyn UserStore>, hasher: PasswordHasher) -> Self {
        Self { users, hasher }
    }

    pub async fn get(&self, id: Uuid) -> AppResult<User> {
        self.users.find_by_id(id).await?.ok_or_else(|| not_found(id))
    }

    /// Filtered page plus total, on-vacation and on-holidays counts
    pub async fn list(&self, query: &UserQuery) -> AppResult<UserPage> {
        self.users.search(query).await
    }

    pub async fn create(&self, input: CreateUser) -> AppResult<User> {
        let password_hash = self.hasher.hash(&input.password).await?;
        let user = self
            .users
            .insert(NewUser::from_input(input, password_hash))
            .await?;

        tracing::info!(user_id = %user.id, role = %user.role, "User created");
        Ok(user)
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        if !self.users.delete(id).await? {
            return Err(not_found(id));
        }

        tracing::info!(user_id = %id, "User deleted");
        Ok(())
    }
}
