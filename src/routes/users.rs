use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::auth::{AuthService, Claims, Registration};
use crate::error::{AppError, AuthError, ErrorContext};
use crate::store::{User, UserProfile};

/// Public sign-up body. Any `is_admin` field sent by the caller is ignored.
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub is_admin: bool,
}

/// POST /users
///
/// Self-service registration. Accounts created here are never administrators.
///
/// # Errors
/// - 400: Invalid name, email or weak password
/// - 409: Email already registered
/// - 500: Internal server error
pub async fn register(
    form: web::Json<RegisterRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let form = form.into_inner();
    let registration = Registration {
        name: form.name,
        email: form.email,
        password: form.password,
        is_admin: false,
    };

    let user = create_user(&auth, registration, "user_registration").await?;
    Ok(HttpResponse::Created().json(UserProfile::from(&user)))
}

/// POST /admin/users
///
/// **Requires an admin access token.** Creates an account, optionally with
/// admin rights.
///
/// # Errors
/// - 401: Missing or invalid access token
/// - 403: Caller is not an admin
/// - 400 / 409 / 500: as for `POST /users`
pub async fn create_user_as_admin(
    form: web::Json<CreateUserRequest>,
    claims: web::ReqData<Claims>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    if !claims.is_admin {
        tracing::warn!(user_id = claims.sub, "Non-admin attempted to create a user");
        return Err(AuthError::Forbidden.into());
    }

    let form = form.into_inner();
    let registration = Registration {
        name: form.name,
        email: form.email,
        password: form.password,
        is_admin: form.is_admin,
    };

    let user = create_user(&auth, registration, "admin_user_creation").await?;
    tracing::info!(
        admin_id = claims.sub,
        user_id = user.id,
        is_admin = user.is_admin,
        "User created by administrator"
    );

    Ok(HttpResponse::Created().json(UserProfile::from(&user)))
}

async fn create_user(
    auth: &AuthService,
    registration: Registration,
    operation: &str,
) -> Result<User, AppError> {
    let context = ErrorContext::new(operation);

    let user = auth.register(registration).await.map_err(|e| {
        context.log_error(&e);
        e
    })?;

    let context = context.with_user_id(user.id);
    tracing::info!(
        request_id = %context.request_id,
        user_id = ?context.user_id,
        "User created"
    );

    Ok(user)
}
