use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::error::{AppError, AppResult};
use crate::middlewares::AuthUser;
use crate::models::{Role, User};

/// Roles allowed to administer users
pub const ADMIN_ONLY: &[Role] = &[Role::Admin];

/// Check that a user holds one of the allowed roles
pub fn authorize_role(user: &User, allowed: &[Role]) -> AppResult<()> {
    if allowed.contains(&user.role) {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

/// Role guard, layered after `auth_middleware`.
///
/// ```ignore
/// route_layer(middleware::from_fn_with_state(ADMIN_ONLY, restrict_to))
/// ```
pub async fn restrict_to(
    State(allowed): State<&'static [Role]>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let AuthUser(user) = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| {
            AppError::unauthorized("You are not logged in! Please log in to get access.")
        })?;

    if let Err(e) = authorize_role(&user, allowed) {
        tracing::warn!(user_id = %user.id, role = %user.role, "Role check failed");
        return Err(e);
    }

    Ok(next.run(request).await)
}
