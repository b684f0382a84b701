use std::sync::Arc;

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};

/// JWT Claims structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid, // user id
    pub iat: i64,  // issued at timestamp
    pub exp: i64,  // expiration timestamp
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

/// Issues and verifies HS256 bearer tokens
#[derive(Clone)]
pub struct TokenIssuer {
    keys: Arc<Keys>,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            keys: Arc::new(Keys {
                encoding: EncodingKey::from_secret(secret.as_bytes()),
                decoding: DecodingKey::from_secret(secret.as_bytes()),
            }),
            ttl,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.jwt_secret,
            Duration::hours(config.jwt_expiration_hours),
        )
    }

    /// Generate a JWT token for a user
    pub fn issue(&self, subject: Uuid) -> AppResult<String> {
        self.issue_at(subject, OffsetDateTime::now_utc())
    }

    /// Generate a JWT token as if it had been issued at `issued_at`
    pub fn issue_at(&self, subject: Uuid, issued_at: OffsetDateTime) -> AppResult<String> {
        let claims = Claims {
            sub: subject,
            iat: issued_at.unix_timestamp(),
            exp: (issued_at + self.ttl).unix_timestamp(),
        };

        let token = encode(&Header::default(), &claims, &self.keys.encoding)
            .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))?;

        Ok(token)
    }

    /// Verify signature and expiry, then decode the claims
    pub fn decode(&self, token: &str) -> AppResult<Claims> {
        let token_data = decode::<Claims>(token, &self.keys.decoding, &Validation::default())?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(
            "test-jwt-secret-that-is-at-least-32-characters-long",
            Duration::hours(24),
        )
    }

    #[test]
    fn test_issue_and_decode() {
        let issuer = issuer();
        let user_id = Uuid::new_v4();

        let token = issuer.issue(user_id).unwrap();
        let claims = issuer.decode(&token).unwrap();

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.exp - claims.iat, 24 * 60 * 60);
    }

    #[test]
    fn test_decode_rejects_tampered_token() {
        let issuer = issuer();
        let token = issuer.issue(Uuid::new_v4()).unwrap();

        // Swap the payload for one carrying another subject
        let forged_payload = issuer.issue(Uuid::new_v4()).unwrap();
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged_parts: Vec<&str> = forged_payload.split('.').collect();
        parts[1] = forged_parts[1];
        let tampered = parts.join(".");

        assert!(matches!(issuer.decode(&tampered), Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_decode_rejects_foreign_secret() {
        let other = TokenIssuer::new("another-secret-entirely-32-characters!!", Duration::hours(1));
        let token = other.issue(Uuid::new_v4()).unwrap();

        assert!(matches!(issuer().decode(&token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_decode_rejects_expired_token() {
        let issuer = issuer();
        let issued_at = OffsetDateTime::now_utc() - Duration::days(2);
        let token = issuer.issue_at(Uuid::new_v4(), issued_at).unwrap();

        assert!(matches!(issuer.decode(&token), Err(AppError::TokenExpired)));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            issuer().decode("invalid-token"),
            Err(AppError::InvalidToken)
        ));
    }
}
