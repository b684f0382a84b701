use std::sync::Arc;

use time::OffsetDateTime;

use crate::error::{AppError, AppResult};
use crate::models::{CreateUser, NewUser, User};
use crate::repositories::UserStore;
use crate::services::mailer::{Mailer, OutgoingMail};
use crate::services::{PasswordHasher, ResetTokenManager, TokenIssuer};

/// Signed-in user and the bearer token proving it
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,
    pub token: String,
}

/// Sign-up, sign-in and password reset flows
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    hasher: PasswordHasher,
    tokens: TokenIssuer,
    resets: ResetTokenManager,
    mailer: Arc<dyn Mailer>,
    reset_validity_minutes: i64,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        hasher: PasswordHasher,
        tokens: TokenIssuer,
        mailer: Arc<dyn Mailer>,
        reset_validity_minutes: i64,
    ) -> Self {
        Self {
            users,
            hasher,
            tokens,
            resets: ResetTokenManager::new(),
            mailer,
            reset_validity_minutes,
        }
    }

    /// Create an account and sign it in
    pub async fn sign_up(&self, input: CreateUser) -> AppResult<AuthSession> {
        let password_hash = self.hasher.hash(&input.password).await?;
        let user = self
            .users
            .insert(NewUser::from_input(input, password_hash))
            .await?;

        let token = self.tokens.issue(user.id)?;

        tracing::info!(user_id = %user.id, "User signed up");
        Ok(AuthSession { user, token })
    }

    /// Check credentials and issue a token. Unknown email and wrong password
    /// fail identically.
    pub async fn sign_in(&self, email: &str, password: &str) -> AppResult<AuthSession> {
        let Some(credentials) = self.users.find_credentials(email).await? else {
            tracing::warn!("Sign-in attempt for unknown email");
            return Err(AppError::InvalidCredentials);
        };

        if !self.hasher.verify(password, &credentials.password_hash).await? {
            tracing::warn!(user_id = %credentials.user.id, "Sign-in with wrong password");
            return Err(AppError::InvalidCredentials);
        }

        let token = self.tokens.issue(credentials.user.id)?;

        tracing::info!(user_id = %credentials.user.id, "User signed in");
        Ok(AuthSession {
            user: credentials.user,
            token,
        })
    }

    /// Store a reset token for the account and mail the one-time link.
    /// `app_url` is the public base URL the link is built on.
    pub async fn forgot_password(&self, email: &str, app_url: &str) -> AppResult<()> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or_else(|| AppError::UnknownEmail(email.to_string()))?;

        let (secret, reset) = self.resets.generate(self.reset_validity_minutes);
        self.users.set_password_reset(user.id, Some(&reset)).await?;

        let reset_url = format!("{}/api/v1/auth/reset-password/{}", app_url, secret);
        let mail = OutgoingMail::password_reset(&user, &reset_url, self.reset_validity_minutes);

        if let Err(e) = self.mailer.send(mail).await {
            // The link never arrived, so the token must not stay redeemable
            self.users.set_password_reset(user.id, None).await?;
            return Err(e);
        }

        tracing::info!(user_id = %user.id, "Password reset token sent");
        Ok(())
    }

    /// Redeem a reset secret and set the new password.
    /// No token is issued; the user signs in again afterwards.
    pub async fn reset_password(&self, secret: &str, new_password: &str) -> AppResult<()> {
        let now = OffsetDateTime::now_utc();
        let user = self.resets.consume(self.users.as_ref(), secret, now).await?;

        let password_hash = self.hasher.hash(new_password).await?;
        let token_hash = ResetTokenManager::hash(secret);

        let completed = self
            .users
            .complete_password_reset(user.id, &token_hash, &password_hash, now)
            .await?;

        // Lost a race against another redemption of the same secret
        if !completed {
            return Err(AppError::InvalidOrExpiredResetToken);
        }

        tracing::info!(user_id = %user.id, "Password reset completed");
        Ok(())
    }
}
