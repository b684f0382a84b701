use std::sync::Arc;

use mongodb::Client as MongoClient;

use crate::config::Config;
use crate::repositories::{MongoUserStore, UserStore};
use crate::services::{AuthService, Mailer, PasswordHasher, SmtpMailer, TokenIssuer, UserDirectory};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub users: Arc<dyn UserStore>,
    pub tokens: TokenIssuer,
    pub auth: AuthService,
    pub directory: UserDirectory,
}

impl AppState {
    /// Create a new AppState by connecting to MongoDB and the SMTP relay
    pub async fn new(config: Config) -> Result<Self, AppStateError> {
        let mongo_client = MongoClient::with_uri_str(&config.mongodb_url)
            .await
            .map_err(|e| AppStateError::Mongo(e.to_string()))?;

        let store = MongoUserStore::new(&mongo_client.database(&config.mongodb_database));
        store
            .ensure_indexes()
            .await
            .map_err(|e| AppStateError::Mongo(e.to_string()))?;

        let mailer = SmtpMailer::from_config(&config)
            .map_err(|e| AppStateError::Mailer(e.to_string()))?;

        Ok(Self::from_parts(config, Arc::new(store), Arc::new(mailer)))
    }

    /// Wire the services over an existing store and mailer (used by tests)
    pub fn from_parts(config: Config, users: Arc<dyn UserStore>, mailer: Arc<dyn Mailer>) -> Self {
        let hasher = PasswordHasher::new();
        let tokens = TokenIssuer::from_config(&config);

        let auth = AuthService::new(
            users.clone(),
            hasher.clone(),
            tokens.clone(),
            mailer,
            config.reset_token_expires_minutes,
        );
        let directory = UserDirectory::new(users.clone(), hasher);

        Self {
            config,
            users,
            tokens,
            auth,
            directory,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppStateError {
    #[error("MongoDB connection error: {0}")]
    Mongo(String),

    #[error("Mailer setup error: {0}")]
    Mailer(String),
}
