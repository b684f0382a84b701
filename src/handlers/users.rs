use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppResult, ValidationErrors};
use crate::handlers::common::{
    success, validate_create_user, validate_user_query, AppJson, AppQuery, CreateUserRequest,
    Envelope, UserQueryParams,
};
use crate::middlewares::AuthUser;
use crate::models::{UserPage, UserResponse};
use crate::state::AppState;

// ============ Response DTOs ============

#[derive(Debug, Serialize, ToSchema)]
pub struct SingleUserResponse {
    pub user: UserResponse,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserListResponse {
    pub users: Vec<UserResponse>,
    pub users_on_vacation: u64,
    pub users_on_holidays: u64,
    pub total_users: u64,
}

impl From<UserPage> for UserListResponse {
    fn from(page: UserPage) -> Self {
        Self {
            users: page.users.into_iter().map(UserResponse::from).collect(),
            users_on_vacation: page.users_on_vacation,
            users_on_holidays: page.users_on_holidays,
            total_users: page.total_users,
        }
    }
}

fn parse_id(id: &str) -> Result<Uuid, ValidationErrors> {
    Uuid::parse_str(id.trim())
        .map_err(|_| ValidationErrors::single("id", format!("Invalid id: {}", id)))
}

// ============ Handlers ============

/// List users with search, filters and counts
#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(UserQueryParams),
    responses(
        (status = 200, description = "Page of users with unfiltered counts", body = Envelope<UserListResponse>),
        (status = 400, description = "Invalid query parameter"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<UserQueryParams>,
) -> AppResult<impl IntoResponse> {
    let query = validate_user_query(params)?;
    let page = state.directory.list(&query).await?;

    Ok(Json(success(UserListResponse::from(page))))
}

/// Get the signed-in user
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    responses(
        (status = 200, description = "Current user", body = Envelope<SingleUserResponse>),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Users"
)]
pub async fn get_me(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let user = state.directory.get(user.id).await?;

    Ok(Json(success(SingleUserResponse { user: user.into() })))
}

/// Get a user by id
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User found", body = Envelope<SingleUserResponse>),
        (status = 400, description = "Malformed id"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    let user = state.directory.get(id).await?;

    Ok(Json(success(SingleUserResponse { user: user.into() })))
}

/// Create a user (admin only)
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = Envelope<UserResponse>),
        (status = 400, description = "Validation error or email already exists"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not an admin")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateUserRequest>,
) -> AppResult<impl IntoResponse> {
    let input = validate_create_user(payload)?;
    let user = state.directory.create(input).await?;

    Ok((
        StatusCode::CREATED,
        Json(success(UserResponse::from(user))),
    ))
}

/// Delete a user (admin only)
#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User deleted"),
        (status = 400, description = "Malformed id"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "User not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Users"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    state.directory.delete(id).await?;

    Ok(Json(success(())))
}
