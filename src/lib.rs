// Library crate for Roster
// Exports modules for use by the server binary and tests

pub mod config;
pub mod error;
pub mod handlers;
pub mod middlewares;
pub mod models;
pub mod repositories;
pub mod services;
pub mod state;

use axum::{
    http::{header, HeaderValue, Method, Uri},
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};

use crate::error::AppError;
use crate::handlers::{
    create_user, delete_user, forgot_password, get_me, get_user, list_users, reset_password,
    sign_in, sign_up,
};
use crate::middlewares::{auth_middleware, expose_error_details, restrict_to, ADMIN_ONLY};
use crate::state::AppState;

async fn route_not_found(method: Method, uri: Uri) -> AppError {
    AppError::NotFound(format!("Cannot {} {}", method, uri.path()))
}

/// Build the application router with the given state
pub fn build_router(state: AppState) -> Router {
    // Admin-only routes, checked after the access guard below
    let admin_routes = Router::new()
        .route("/users", post(create_user))
        .route("/users/{id}", delete(delete_user))
        .route_layer(middleware::from_fn_with_state(ADMIN_ONLY, restrict_to));

    // Protected routes (require authentication)
    let protected_routes = Router::new()
        .route("/users", get(list_users))
        .route("/users/me", get(get_me))
        .route("/users/{id}", get(get_user))
        .merge(admin_routes)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api = Router::new()
        // Public auth routes
        .route("/auth/sign-up", post(sign_up))
        .route("/auth/sign-in", post(sign_in))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password/{token}", patch(reset_password))
        // Protected routes
        .merge(protected_routes);

    Router::new()
        .route("/", get(|| async { "Hello, Roster!" }))
        .nest("/api/v1", api)
        .fallback(route_not_found)
        .layer(middleware::from_fn_with_state(
            state.config.environment,
            expose_error_details,
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(CorsLayer::very_permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
