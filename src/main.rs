use anyhow::Context;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use roster::config::Config;
use roster::handlers::{
    AuthResponse, CreateUserRequest, ForgotPasswordRequest, MessageResponse, ResetPasswordRequest,
    SignInRequest, SignUpRequest, SingleUserResponse, UserListResponse,
};
use roster::models::{Role, UserResponse};
use roster::state::AppState;
use roster::{build_router, handlers};

/// Security scheme for Bearer token
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::sign_up,
        handlers::auth::sign_in,
        handlers::auth::forgot_password,
        handlers::auth::reset_password,
        handlers::users::list_users,
        handlers::users::get_me,
        handlers::users::get_user,
        handlers::users::create_user,
        handlers::users::delete_user,
    ),
    components(schemas(
        SignUpRequest,
        SignInRequest,
        ForgotPasswordRequest,
        ResetPasswordRequest,
        AuthResponse,
        MessageResponse,
        CreateUserRequest,
        SingleUserResponse,
        UserListResponse,
        UserResponse,
        Role,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Sign-up, sign-in and password reset"),
        (name = "Users", description = "User directory endpoints")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    let addr = config.server_addr();

    tracing::info!("Connecting to MongoDB...");
    let state = AppState::new(config)
        .await
        .context("Failed to initialize application state")?;
    tracing::info!("Database connection established");

    // Build the main application router
    let app = build_router(state)
        // Add Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Server started on http://{}", addr);
    tracing::info!("Swagger UI: http://{}/swagger-ui/", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
