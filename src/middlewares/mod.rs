pub mod auth;
pub mod errors;
pub mod role;

pub use auth::{auth_middleware, authenticate, extract_token, AuthUser, TOKEN_COOKIE};
pub use errors::expose_error_details;
pub use role::{authorize_role, restrict_to, ADMIN_ONLY};
