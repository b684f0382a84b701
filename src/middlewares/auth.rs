use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;

use crate::error::{AppError, AppResult};
use crate::models::User;
use crate::state::AppState;

/// Name of the cookie carrying the session token
pub const TOKEN_COOKIE: &str = "jwt";

const NOT_LOGGED_IN: &str = "You are not logged in! Please log in to get access.";
const USER_GONE: &str = "The user belonging to this token does no longer exist.";
const PASSWORD_CHANGED: &str = "User recently changed password! Please log in again.";

/// The user resolved from the request token
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

/// Extractor for AuthUser - can be used directly in handlers
/// Example: `async fn handler(AuthUser(user): AuthUser) -> ... { }`
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| AppError::unauthorized(NOT_LOGGED_IN))
    }
}

/// Bearer header first, then the `jwt` cookie
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    CookieJar::from_headers(headers)
        .get(TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
}

/// Resolve the current user from a request's headers
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> AppResult<User> {
    let token = extract_token(headers).ok_or_else(|| AppError::unauthorized(NOT_LOGGED_IN))?;

    let claims = state.tokens.decode(&token)?;

    let user = state
        .users
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| AppError::unauthorized(USER_GONE))?;

    if user.changed_password_after(claims.iat) {
        tracing::debug!(user_id = %user.id, "Rejected token issued before password change");
        return Err(AppError::unauthorized(PASSWORD_CHANGED));
    }

    Ok(user)
}

/// Auth middleware - validates the token and injects AuthUser into request extensions
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = authenticate(&state, request.headers()).await?;

    request.extensions_mut().insert(AuthUser(user));

    Ok(next.run(request).await)
}
