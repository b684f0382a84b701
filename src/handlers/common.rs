use axum::extract::{FromRequest, FromRequestParts};
use email_address::EmailAddress;
use serde::{Deserialize, Serialize};
use time::{format_description::well_known::Rfc3339, Date, OffsetDateTime, Time};
use utoipa::{IntoParams, ToSchema};

use crate::error::{AppError, ValidationErrors};
use crate::models::{CreateUser, Role, UserQuery};

/// Largest page `GET /users` will return
pub const MAX_LIMIT: u64 = 100;

/// Largest offset the database accepts
pub const MAX_SKIP: u64 = i64::MAX as u64;

/// JSON body extractor whose rejections use the error envelope
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Query string extractor whose rejections use the error envelope
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

/// Success envelope: `{ "status": "success", "data": ... }`
#[derive(Debug, Serialize, ToSchema)]
pub struct Envelope<T> {
    #[schema(value_type = String, example = "success")]
    pub status: &'static str,
    pub data: T,
}

pub fn success<T>(data: T) -> Envelope<T> {
    Envelope {
        status: "success",
        data,
    }
}

// ============ Request DTOs ============

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct SignUpRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub position: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct SignInRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct ForgotPasswordRequest {
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct ResetPasswordRequest {
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub position: Option<String>,
    /// `admin` or `user`, defaults to `user`
    pub role: Option<String>,
    pub on_vacation: Option<bool>,
    pub on_holidays: Option<bool>,
    /// RFC 3339 timestamp or `YYYY-MM-DD`
    pub away_till: Option<String>,
}

/// Query parameters of `GET /users`. Kept as raw strings so that bad values
/// produce field errors instead of a generic rejection.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase", default)]
#[into_params(parameter_in = Query)]
pub struct UserQueryParams {
    /// Case-insensitive substring of first name, last name or position
    pub search_str: Option<String>,
    /// `true`, `false`, `1` or `0`
    pub on_vacation: Option<String>,
    /// `true`, `false`, `1` or `0`
    pub on_holidays: Option<String>,
    /// Records to skip, defaults to 0
    pub skip: Option<String>,
    /// Page size, defaults to 20, at most 100
    pub limit: Option<String>,
}

// ============ Validation ============

fn required_string(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<String>,
) -> Option<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Some(v),
        _ => {
            errors.add(field, format!("{} should not be empty", field));
            None
        }
    }
}

/// Trim, lower-case and check an email address
fn required_email(errors: &mut ValidationErrors, value: Option<String>) -> Option<String> {
    let email = value.map(|v| v.trim().to_lowercase()).unwrap_or_default();
    if EmailAddress::is_valid(&email) {
        Some(email)
    } else {
        errors.add("email", "email must be an email");
        None
    }
}

/// At least 8 characters with a lowercase letter, an uppercase letter,
/// a digit and a symbol
pub fn is_strong_password(password: &str) -> bool {
    password.chars().count() >= 8
        && password.chars().any(|c| c.is_lowercase())
        && password.chars().any(|c| c.is_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| !c.is_alphanumeric() && !c.is_whitespace())
}

fn strong_password(errors: &mut ValidationErrors, value: Option<String>) -> Option<String> {
    match value {
        Some(password) if is_strong_password(&password) => Some(password),
        Some(_) => {
            errors.add("password", "password is not strong enough");
            None
        }
        None => {
            errors.add("password", "password should not be empty");
            None
        }
    }
}

/// Accepts `true|false|1|0`
pub fn parse_bool(field: &str, value: &str) -> Result<bool, ValidationErrors> {
    match value {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ValidationErrors::single(
            field,
            format!("{} must be a boolean", field),
        )),
    }
}

/// RFC 3339 timestamp, or a plain date taken as midnight UTC
pub fn parse_away_till(value: &str) -> Result<OffsetDateTime, ValidationErrors> {
    let value = value.trim();
    if let Ok(at) = OffsetDateTime::parse(value, &Rfc3339) {
        return Ok(at);
    }

    let format = time::macros::format_description!("[year]-[month]-[day]");
    Date::parse(value, &format)
        .map(|date| date.with_time(Time::MIDNIGHT).assume_utc())
        .map_err(|_| {
            ValidationErrors::single("awayTill", "awayTill must be a valid ISO 8601 date string")
        })
}

pub fn validate_sign_up(req: SignUpRequest) -> Result<CreateUser, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let first_name = required_string(&mut errors, "firstName", req.first_name);
    let last_name = required_string(&mut errors, "lastName", req.last_name);
    let email = required_email(&mut errors, req.email);
    let password = strong_password(&mut errors, req.password);
    let position = required_string(&mut errors, "position", req.position);

    match (first_name, last_name, email, password, position) {
        (Some(first_name), Some(last_name), Some(email), Some(password), Some(position))
            if errors.is_empty() =>
        {
            Ok(CreateUser {
                first_name,
                last_name,
                email,
                password,
                position,
                // Sign-up never grants a role
                role: Role::User,
                on_vacation: false,
                on_holidays: false,
                away_till: None,
            })
        }
        _ => Err(errors),
    }
}

/// Normalized email and raw password
pub fn validate_sign_in(req: SignInRequest) -> Result<(String, String), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let email = required_email(&mut errors, req.email);
    let password = match req.password {
        Some(password) if !password.is_empty() => Some(password),
        _ => {
            errors.add("password", "password should not be empty");
            None
        }
    };

    match (email, password) {
        (Some(email), Some(password)) => Ok((email, password)),
        _ => Err(errors),
    }
}

pub fn validate_forgot_password(req: ForgotPasswordRequest) -> Result<String, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    required_email(&mut errors, req.email).ok_or(errors)
}

pub fn validate_reset_password(req: ResetPasswordRequest) -> Result<String, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    strong_password(&mut errors, req.password).ok_or(errors)
}

pub fn validate_create_user(req: CreateUserRequest) -> Result<CreateUser, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let first_name = required_string(&mut errors, "firstName", req.first_name);
    let last_name = required_string(&mut errors, "lastName", req.last_name);
    let email = required_email(&mut errors, req.email);
    let password = match req.password {
        Some(password) if !password.is_empty() => Some(password),
        _ => {
            errors.add("password", "password should not be empty");
            None
        }
    };
    let position = required_string(&mut errors, "position", req.position);

    let role = match req.role.as_deref().map(str::trim) {
        None => Role::default(),
        Some(role) => role.parse::<Role>().unwrap_or_else(|_| {
            errors.add("role", "Role must be either admin or user");
            Role::default()
        }),
    };

    let away_till = match req.away_till.as_deref() {
        None => None,
        Some(value) => match parse_away_till(value) {
            Ok(at) => Some(at),
            Err(e) => {
                for error in e.errors() {
                    errors.add(&error.field, error.message.clone());
                }
                None
            }
        },
    };

    match (first_name, last_name, email, password, position) {
        (Some(first_name), Some(last_name), Some(email), Some(password), Some(position))
            if errors.is_empty() =>
        {
            Ok(CreateUser {
                first_name,
                last_name,
                email,
                password,
                position,
                role,
                on_vacation: req.on_vacation.unwrap_or(false),
                on_holidays: req.on_holidays.unwrap_or(false),
                away_till,
            })
        }
        _ => Err(errors),
    }
}

fn parse_count(errors: &mut ValidationErrors, field: &str, value: Option<&str>) -> Option<u64> {
    let value = value?;
    match value.trim().parse::<u64>() {
        Ok(n) => Some(n),
        Err(_) => {
            errors.add(field, format!("{} must be a non-negative integer", field));
            None
        }
    }
}

pub fn validate_user_query(params: UserQueryParams) -> Result<UserQuery, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let defaults = UserQuery::default();

    let mut flag = |field: &str, value: Option<&str>| {
        value.and_then(|v| match parse_bool(field, v) {
            Ok(b) => Some(b),
            Err(e) => {
                for error in e.errors() {
                    errors.add(&error.field, error.message.clone());
                }
                None
            }
        })
    };
    let on_vacation = flag("onVacation", params.on_vacation.as_deref());
    let on_holidays = flag("onHolidays", params.on_holidays.as_deref());

    let skip = parse_count(&mut errors, "skip", params.skip.as_deref())
        .unwrap_or(defaults.skip)
        .min(MAX_SKIP);
    let limit = parse_count(&mut errors, "limit", params.limit.as_deref())
        .unwrap_or(defaults.limit)
        .clamp(1, MAX_LIMIT);

    let search = params
        .search_str
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    errors.into_result()?;

    Ok(UserQuery {
        search,
        on_vacation,
        on_holidays,
        skip,
        limit,
    })
}
