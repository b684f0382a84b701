pub mod auth;
pub mod common;
pub mod users;

pub use auth::{
    forgot_password, reset_password, sign_in, sign_up, AuthResponse, MessageResponse,
};
pub use common::{
    AppJson, AppQuery, CreateUserRequest, Envelope, ForgotPasswordRequest, ResetPasswordRequest,
    SignInRequest, SignUpRequest, UserQueryParams,
};
pub use users::{
    create_user, delete_user, get_me, get_user, list_users, SingleUserResponse, UserListResponse,
};
