mod auth;
mod health_check;
mod users;

pub use auth::{
    get_current_user, login, logout, renew_access_token, revoke_session, CurrentUserResponse,
    LoginRequest, LoginResponse, RenewAccessTokenRequest, RenewAccessTokenResponse,
};
pub use health_check::health_check;
pub use users::{create_user_as_admin, register, CreateUserRequest, RegisterRequest};
