use axum::{
    extract::{Path, State},
    http::{header::HOST, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Serialize;
use utoipa::ToSchema;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::handlers::common::{
    success, validate_forgot_password, validate_reset_password, validate_sign_in,
    validate_sign_up, AppJson, Envelope, ForgotPasswordRequest, ResetPasswordRequest,
    SignInRequest, SignUpRequest,
};
use crate::middlewares::TOKEN_COOKIE;
use crate::models::UserResponse;
use crate::services::AuthSession;
use crate::state::AppState;

// ============ Response DTOs ============

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
}

impl From<AuthSession> for AuthResponse {
    fn from(session: AuthSession) -> Self {
        Self {
            user: session.user.into(),
            token: session.token,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// `jwt` cookie carrying a freshly issued token
fn session_cookie(config: &Config, token: String) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, token))
        .http_only(true)
        .secure(config.environment.is_production())
        .path("/")
        .max_age(time::Duration::days(config.jwt_cookie_expires_days))
        .build()
}

/// Public base URL for links in outgoing mail. The Host header is only
/// trusted in development.
fn app_url(config: &Config, headers: &HeaderMap) -> AppResult<String> {
    if let Some(url) = &config.app_url {
        return Ok(url.clone());
    }

    if config.environment.is_production() {
        return Err(AppError::Internal("APP_URL is not configured".to_string()));
    }

    let host = headers
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("localhost");
    Ok(format!("http://{}", host))
}

// ============ Handlers ============

/// Register a new user
#[utoipa::path(
    post,
    path = "/api/v1/auth/sign-up",
    request_body = SignUpRequest,
    responses(
        (status = 201, description = "User registered, token also set as `jwt` cookie", body = Envelope<AuthResponse>),
        (status = 400, description = "Validation error or email already exists")
    ),
    tag = "Auth"
)]
pub async fn sign_up(
    State(state): State<AppState>,
    jar: CookieJar,
    AppJson(payload): AppJson<SignUpRequest>,
) -> AppResult<impl IntoResponse> {
    let input = validate_sign_up(payload)?;
    let session = state.auth.sign_up(input).await?;

    let jar = jar.add(session_cookie(&state.config, session.token.clone()));

    Ok((
        StatusCode::CREATED,
        jar,
        Json(success(AuthResponse::from(session))),
    ))
}

/// Sign in with email and password
#[utoipa::path(
    post,
    path = "/api/v1/auth/sign-in",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in, token also set as `jwt` cookie", body = Envelope<AuthResponse>),
        (status = 400, description = "Invalid email or password")
    ),
    tag = "Auth"
)]
pub async fn sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
    AppJson(payload): AppJson<SignInRequest>,
) -> AppResult<impl IntoResponse> {
    let (email, password) = validate_sign_in(payload)?;
    let session = state.auth.sign_in(&email, &password).await?;

    let jar = jar.add(session_cookie(&state.config, session.token.clone()));

    Ok((jar, Json(success(AuthResponse::from(session)))))
}

/// Mail a password reset link
#[utoipa::path(
    post,
    path = "/api/v1/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset link sent", body = Envelope<MessageResponse>),
        (status = 400, description = "No user with this email"),
        (status = 500, description = "Email could not be sent")
    ),
    tag = "Auth"
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    AppJson(payload): AppJson<ForgotPasswordRequest>,
) -> AppResult<impl IntoResponse> {
    let email = validate_forgot_password(payload)?;
    let base_url = app_url(&state.config, &headers)?;

    state.auth.forgot_password(&email, &base_url).await?;

    Ok(Json(success(MessageResponse {
        message: "Token is sent to an email!".to_string(),
    })))
}

/// Set a new password using the secret from the reset link
#[utoipa::path(
    patch,
    path = "/api/v1/auth/reset-password/{token}",
    params(
        ("token" = String, Path, description = "Reset secret from the emailed link")
    ),
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password changed, sign in again"),
        (status = 400, description = "Token is invalid or has expired")
    ),
    tag = "Auth"
)]
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    AppJson(payload): AppJson<ResetPasswordRequest>,
) -> AppResult<impl IntoResponse> {
    let password = validate_reset_password(payload)?;

    state.auth.reset_password(&token, &password).await?;

    Ok(Json(success(())))
}
