use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

/// Authorization role. New accounts get the least privileged one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            _ => Err(()),
        }
    }
}

/// Pending password reset. Hash and expiry only ever exist together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordReset {
    /// SHA-256 hex digest of the emailed secret
    pub token_hash: String,
    pub expires_at: OffsetDateTime,
}

impl PasswordReset {
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at <= now
    }
}

/// User read model. Never carries the password hash.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub position: String,
    pub role: Role,
    pub on_vacation: bool,
    pub on_holidays: bool,
    pub away_till: Option<OffsetDateTime>,
    pub password_changed_at: Option<OffsetDateTime>,
    pub password_reset: Option<PasswordReset>,
    pub created_at: OffsetDateTime,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// True when the password was changed after a token issued at `issued_at`
    /// (unix seconds) was signed. Tokens only carry whole seconds, so one
    /// stamped in the same second as the change counts as older and a
    /// sign-in within that second has to be repeated.
    pub fn changed_password_after(&self, issued_at: i64) -> bool {
        self.password_changed_at
            .is_some_and(|changed_at| changed_at.unix_timestamp() >= issued_at)
    }
}

/// Argon2 PHC string. Only the password hasher creates new values, so
/// nothing can persist a plaintext password by accident.
#[derive(Clone, PartialEq, Eq)]
pub struct HashedPassword(String);

impl HashedPassword {
    /// Wrap a PHC string produced by the hasher or read back from storage
    pub(crate) fn new(hash: String) -> Self {
        Self(hash)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HashedPassword(..)")
    }
}

/// A user together with its stored password hash (sign-in only)
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: User,
    pub password_hash: HashedPassword,
}

/// Validated input for creating a user (sign-up or admin creation)
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub position: String,
    pub role: Role,
    pub on_vacation: bool,
    pub on_holidays: bool,
    pub away_till: Option<OffsetDateTime>,
}

/// User record ready for insertion, password already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: HashedPassword,
    pub position: String,
    pub role: Role,
    pub on_vacation: bool,
    pub on_holidays: bool,
    pub away_till: Option<OffsetDateTime>,
}

impl NewUser {
    pub fn from_input(input: CreateUser, password_hash: HashedPassword) -> Self {
        Self {
            first_name: input.first_name,
            last_name: input.last_name,
            email: input.email,
            password_hash,
            position: input.position,
            role: input.role,
            on_vacation: input.on_vacation,
            on_holidays: input.on_holidays,
            away_till: input.away_till,
        }
    }

    /// Build the stored user with a fresh id
    pub fn into_user(self, now: OffsetDateTime) -> (User, HashedPassword) {
        let user = User {
            id: Uuid::new_v4(),
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            position: self.position,
            role: self.role,
            on_vacation: self.on_vacation,
            on_holidays: self.on_holidays,
            away_till: self.away_till,
            password_changed_at: None,
            password_reset: None,
            created_at: now,
        };
        (user, self.password_hash)
    }
}

/// Filters and pagination for the user listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserQuery {
    /// Case-insensitive substring over first name, last name and position
    pub search: Option<String>,
    pub on_vacation: Option<bool>,
    pub on_holidays: Option<bool>,
    pub skip: u64,
    pub limit: u64,
}

impl Default for UserQuery {
    fn default() -> Self {
        Self {
            search: None,
            on_vacation: None,
            on_holidays: None,
            skip: 0,
            limit: 20,
        }
    }
}

impl UserQuery {
    /// In-process equivalent of the store's match stage
    pub fn matches(&self, user: &User) -> bool {
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let hit = [&user.first_name, &user.last_name, &user.position]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        if self.on_vacation.is_some_and(|flag| flag != user.on_vacation) {
            return false;
        }
        if self.on_holidays.is_some_and(|flag| flag != user.on_holidays) {
            return false;
        }
        true
    }
}

/// One page of users plus collection-wide counts
#[derive(Debug, Clone)]
pub struct UserPage {
    pub users: Vec<User>,
    pub total_users: u64,
    pub users_on_vacation: u64,
    pub users_on_holidays: u64,
}

/// Public user response (safe to return via API)
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub position: String,
    pub role: Role,
    pub on_vacation: bool,
    pub on_holidays: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    #[schema(value_type = Option<String>)]
    pub away_till: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    #[schema(value_type = Option<String>)]
    pub password_changed_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String)]
    pub created_at: OffsetDateTime,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            position: user.position,
            role: user.role,
            on_vacation: user.on_vacation,
            on_holidays: user.on_holidays,
            away_till: user.away_till,
            password_changed_at: user.password_changed_at,
            created_at: user.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            position: "Analyst".to_string(),
            role: Role::User,
            on_vacation: true,
            on_holidays: false,
            away_till: None,
            password_changed_at: None,
            password_reset: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn test_changed_password_after() {
        let mut user = sample_user();
        let now = OffsetDateTime::now_utc();

        // Never changed: no token is stale
        assert!(!user.changed_password_after(now.unix_timestamp()));

        user.password_changed_at = Some(now);
        assert!(user.changed_password_after((now - Duration::minutes(5)).unix_timestamp()));
        assert!(user.changed_password_after(now.unix_timestamp()));
        assert!(!user.changed_password_after((now + Duration::seconds(1)).unix_timestamp()));
        assert!(!user.changed_password_after((now + Duration::minutes(5)).unix_timestamp()));
    }

    #[test]
    fn test_role_defaults_to_user() {
        assert_eq!(Role::default(), Role::User);
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn test_query_matches_search_case_insensitively() {
        let user = sample_user();
        let query = UserQuery {
            search: Some("ANAL".to_string()),
            ..Default::default()
        };
        assert!(query.matches(&user));

        let query = UserQuery {
            search: Some("engineer".to_string()),
            ..Default::default()
        };
        assert!(!query.matches(&user));
    }

    #[test]
    fn test_query_matches_flags() {
        let user = sample_user();
        let on_vacation = UserQuery {
            on_vacation: Some(true),
            ..Default::default()
        };
        let on_holidays = UserQuery {
            on_holidays: Some(true),
            ..Default::default()
        };
        assert!(on_vacation.matches(&user));
        assert!(!on_holidays.matches(&user));
    }

    #[test]
    fn test_response_has_no_password_fields() {
        let value = serde_json::to_value(UserResponse::from(sample_user())).unwrap();
        assert!(value.get("password").is_none());
        assert!(value.get("passwordHash").is_none());
        assert!(value.get("passwordResetToken").is_none());
        assert_eq!(value["firstName"], "Ada");
        assert_eq!(value["role"], "user");
    }

    #[test]
    fn test_reset_expiry() {
        let now = OffsetDateTime::now_utc();
        let reset = PasswordReset {
            token_hash: "abc".to_string(),
            expires_at: now,
        };
        assert!(reset.is_expired(now));
        assert!(!reset.is_expired(now - Duration::seconds(1)));
    }
}
