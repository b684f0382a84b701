use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
    },
    Argon2,
};

use crate::error::{AppError, AppResult};
use crate::models::HashedPassword;

/// Salted adaptive password hashing (argon2id with default cost parameters)
#[derive(Clone, Default)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl PasswordHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash a password using Argon2 on the blocking pool
    pub async fn hash(&self, password: &str) -> AppResult<HashedPassword> {
        let argon2 = self.argon2.clone();
        let password = password.to_owned();

        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            argon2
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| HashedPassword::new(hash.to_string()))
                .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
        })
        .await
        .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
    }

    /// Verify a password against a hash
    pub async fn verify(&self, password: &str, hash: &HashedPassword) -> AppResult<bool> {
        let argon2 = self.argon2.clone();
        let password = password.to_owned();
        let hash = hash.clone();

        tokio::task::spawn_blocking(move || {
            let parsed_hash = PasswordHash::new(hash.as_str())
                .map_err(|e| AppError::Internal(format!("Invalid password hash: {}", e)))?;

            Ok(argon2
                .verify_password(password.as_bytes(), &parsed_hash)
                .is_ok())
        })
        .await
        .map_err(|e| AppError::Internal(format!("Password verification task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hasher = PasswordHasher::new();
        let hash = hasher.hash("Secur3P@ssw0rd!").await.unwrap();

        assert!(hash.as_str().starts_with("$argon2"));
        assert!(hasher.verify("Secur3P@ssw0rd!", &hash).await.unwrap());
        assert!(!hasher.verify("wrong-password", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_hash_is_salted() {
        let hasher = PasswordHasher::new();
        let first = hasher.hash("Secur3P@ssw0rd!").await.unwrap();
        let second = hasher.hash("Secur3P@ssw0rd!").await.unwrap();

        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_verify_errors_on_malformed_hash() {
        let hasher = PasswordHasher::new();
        let malformed = HashedPassword::new("not-a-hash".to_string());
        let result = hasher.verify("anything", &malformed).await;

        assert!(matches!(result, Err(AppError::Internal(_))));
    }
}
