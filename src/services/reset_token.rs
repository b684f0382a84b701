use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use time::{Duration, OffsetDateTime};

use crate::error::{AppError, AppResult};
use crate::models::{PasswordReset, User};
use crate::repositories::UserStore;

/// Bytes of entropy in a reset secret
const SECRET_BYTES: usize = 32;

/// Generates and redeems single-use password reset secrets.
///
/// The plaintext secret only ever travels to the user by mail; the store
/// keeps a SHA-256 digest. The secret is already high entropy, so a fast
/// hash is enough.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResetTokenManager;

impl ResetTokenManager {
    pub fn new() -> Self {
        Self
    }

    /// Create a fresh secret and the reset state to persist for it
    pub fn generate(&self, validity_minutes: i64) -> (String, PasswordReset) {
        let mut bytes = [0u8; SECRET_BYTES];
        OsRng.fill_bytes(&mut bytes);
        let secret = URL_SAFE_NO_PAD.encode(bytes);

        let reset = PasswordReset {
            token_hash: Self::hash(&secret),
            expires_at: OffsetDateTime::now_utc() + Duration::minutes(validity_minutes),
        };

        (secret, reset)
    }

    /// Hex SHA-256 digest of a secret, as stored
    pub fn hash(secret: &str) -> String {
        format!("{:x}", Sha256::digest(secret.as_bytes()))
    }

    /// Find the user a secret belongs to, provided it has not expired
    pub async fn consume(
        &self,
        store: &dyn UserStore,
        secret: &str,
        now: OffsetDateTime,
    ) -> AppResult<User> {
        store
            .find_by_reset_token(&Self::hash(secret), now)
            .await?
            .ok_or(AppError::InvalidOrExpiredResetToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_stores_only_hash() {
        let (secret, reset) = ResetTokenManager::new().generate(10);

        assert_eq!(secret.len(), 43);
        assert_ne!(reset.token_hash, secret);
        assert_eq!(reset.token_hash, ResetTokenManager::hash(&secret));
        assert_eq!(reset.token_hash.len(), 64);
    }

    #[test]
    fn test_generate_sets_expiry_window() {
        let before = OffsetDateTime::now_utc();
        let (_, reset) = ResetTokenManager::new().generate(10);

        assert!(reset.expires_at >= before + Duration::minutes(10));
        assert!(reset.expires_at <= OffsetDateTime::now_utc() + Duration::minutes(10));
    }

    #[test]
    fn test_secrets_are_unique() {
        let manager = ResetTokenManager::new();
        let (first, _) = manager.generate(10);
        let (second, _) = manager.generate(10);

        assert_ne!(first, second);
    }

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(
            ResetTokenManager::hash("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
