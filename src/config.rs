use std::env;
use std::ops::RangeInclusive;
use std::str::FromStr;

const JWT_EXPIRATION_HOURS: RangeInclusive<i64> = 1..=24 * 365;
const JWT_COOKIE_EXPIRES_DAYS: RangeInclusive<i64> = 1..=365;
const RESET_TOKEN_EXPIRES_MINUTES: RangeInclusive<i64> = 1..=24 * 60;

/// Deployment mode, toggles cookie `Secure` flag and error debug fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            _ => Err(ConfigError::Invalid("APP_ENV")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,

    // Database
    pub mongodb_url: String,
    pub mongodb_database: String,

    // JWT
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub jwt_cookie_expires_days: i64,

    // Password reset
    pub reset_token_expires_minutes: i64,
    /// Public base URL used in reset links. Required in production; in
    /// development the request's Host header stands in when unset.
    pub app_url: Option<String>,

    // Mail
    pub email_host: String,
    pub email_port: u16,
    pub email_username: Option<String>,
    pub email_password: Option<String>,
    pub email_from: String,

    // Server
    pub host: String,
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if exists

        Self {
            environment: env::var("APP_ENV")
                .unwrap_or_else(|_| "development".to_string())
                .parse()?,

            // Database
            mongodb_url: env::var("MONGODB_URL")
                .map_err(|_| ConfigError::Missing("MONGODB_URL"))?,
            mongodb_database: env::var("MONGODB_DATABASE")
                .unwrap_or_else(|_| "roster".to_string()),

            // JWT
            jwt_secret: env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?,
            jwt_expiration_hours: parse_or("JWT_EXPIRATION_HOURS", 24)?,
            jwt_cookie_expires_days: parse_or("JWT_COOKIE_EXPIRES_DAYS", 1)?,

            // Password reset
            reset_token_expires_minutes: parse_or("RESET_TOKEN_EXPIRES_MINUTES", 10)?,
            app_url: env::var("APP_URL")
                .ok()
                .map(|url| url.trim_end_matches('/').to_string()),

            // Mail
            email_host: env::var("EMAIL_HOST").unwrap_or_else(|_| "localhost".to_string()),
            email_port: parse_or("EMAIL_PORT", 1025)?,
            email_username: env::var("EMAIL_USERNAME").ok(),
            email_password: env::var("EMAIL_PASSWORD").ok(),
            email_from: env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "noreply@roster.local".to_string()),

            // Server
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_or("PORT", 3001)?,
        }
        .validate()
    }

    /// Reject settings that parse but cannot be used
    pub fn validate(self) -> Result<Self, ConfigError> {
        check_range(
            "JWT_EXPIRATION_HOURS",
            self.jwt_expiration_hours,
            JWT_EXPIRATION_HOURS,
        )?;
        check_range(
            "JWT_COOKIE_EXPIRES_DAYS",
            self.jwt_cookie_expires_days,
            JWT_COOKIE_EXPIRES_DAYS,
        )?;
        check_range(
            "RESET_TOKEN_EXPIRES_MINUTES",
            self.reset_token_expires_minutes,
            RESET_TOKEN_EXPIRES_MINUTES,
        )?;

        // Reset links must never be built from a client-supplied Host
        if self.environment.is_production() && self.app_url.is_none() {
            return Err(ConfigError::Missing("APP_URL"));
        }

        Ok(self)
    }

    /// Get server address as "host:port"
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        Err(_) => Ok(default),
    }
}

fn check_range(
    key: &'static str,
    value: i64,
    range: RangeInclusive<i64>,
) -> Result<(), ConfigError> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid(key))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid environment variable: {0}")]
    Invalid(&'static str),
}
