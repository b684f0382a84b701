pub mod auth;
pub mod directory;
pub mod mailer;
pub mod password;
pub mod reset_token;
pub mod token;

pub use auth::{AuthService, AuthSession};
pub use directory::UserDirectory;
pub use mailer::{InMemoryMailer, Mailer, OutgoingMail, SmtpMailer};
pub use password::PasswordHasher;
pub use reset_token::ResetTokenManager;
pub use token::{Claims, TokenIssuer};
