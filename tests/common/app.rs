use std::sync::Arc;

use axum_test::TestServer;
use roster::build_router;
use roster::config::{Config, Environment};
use roster::repositories::InMemoryUserStore;
use roster::services::InMemoryMailer;
use roster::state::AppState;

/// Test configuration
pub fn test_config() -> Config {
    Config {
        environment: Environment::Development,
        mongodb_url: "mongodb://localhost:27017".to_string(),
        mongodb_database: "roster_test".to_string(),
        jwt_secret: "test-jwt-secret-that-is-at-least-32-characters-long".to_string(),
        jwt_expiration_hours: 24,
        jwt_cookie_expires_days: 1,
        reset_token_expires_minutes: 10,
        app_url: None,
        email_host: "localhost".to_string(),
        email_port: 1025,
        email_username: None,
        email_password: None,
        email_from: "noreply@roster.local".to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
    }
}

/// Test application wrapper
#[allow(dead_code)]
pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub store: InMemoryUserStore,
    pub mailer: InMemoryMailer,
}

#[allow(dead_code)]
impl TestApp {
    /// Create a new test application
    pub async fn new() -> Self {
        Self::with_parts(test_config(), InMemoryMailer::new())
    }

    /// Test application whose mail transport always fails
    pub async fn with_failing_mailer() -> Self {
        Self::with_parts(test_config(), InMemoryMailer::failing())
    }

    pub async fn with_config(config: Config) -> Self {
        Self::with_parts(config, InMemoryMailer::new())
    }

    fn with_parts(config: Config, mailer: InMemoryMailer) -> Self {
        // In-memory store and outbox keep tests free of MongoDB and SMTP
        let store = InMemoryUserStore::new();

        let state = AppState::from_parts(config, Arc::new(store.clone()), Arc::new(mailer.clone()));

        let router = build_router(state.clone());
        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            state,
            store,
            mailer,
        }
    }

    /// Reset secret from the most recent password reset mail
    pub async fn last_reset_secret(&self) -> Option<String> {
        let mail = self.mailer.last().await?;
        mail.body
            .lines()
            .find(|line| line.contains("/reset-password/"))
            .and_then(|line| line.trim().rsplit('/').next())
            .map(str::to_string)
    }
}
