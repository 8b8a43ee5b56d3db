/// Authentication Routes
///
/// Login, logout, access-token renewal, session revocation and the current
/// identity behind an access token.

use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::{AuthService, Claims};
use crate::error::{AppError, AuthError, ErrorContext};
use crate::store::UserProfile;
use crate::validators::require_field;

/// User login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Token renewal request
#[derive(Deserialize)]
pub struct RenewAccessTokenRequest {
    pub refresh_token: String,
}

/// Successful login
#[derive(Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    pub session_id: String,
    pub access_token: String,
    pub refresh_token: String,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
    pub user: UserProfile,
}

/// Successful renewal
#[derive(Serialize, Deserialize, Debug)]
pub struct RenewAccessTokenResponse {
    pub access_token: String,
    pub access_token_expires_at: DateTime<Utc>,
}

/// Identity carried by the caller's access token
#[derive(Serialize, Deserialize, Debug)]
pub struct CurrentUserResponse {
    pub id: i64,
    pub email: String,
    pub is_admin: bool,
    pub expires_at: DateTime<Utc>,
}

/// POST /login
///
/// Authenticate with email and password; returns an access token, a
/// refresh token and the id of the session backing the refresh token.
///
/// # Errors
/// - 400: Missing email or password, malformed body
/// - 401: Invalid credentials (unknown email and wrong password look the same)
/// - 500: Internal server error
pub async fn login(
    form: web::Json<LoginRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("login");

    let email = require_field("email", &form.email)?;
    let password = require_field("password", &form.password)?;

    let outcome = auth.login(email, password).await.map_err(|e| {
        context.log_error(&e);
        e
    })?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = outcome.user.id,
        session_id = %outcome.session_id,
        "User logged in successfully"
    );

    Ok(HttpResponse::Ok().json(LoginResponse {
        session_id: outcome.session_id,
        access_token: outcome.access_token,
        refresh_token: outcome.refresh_token,
        access_token_expires_at: outcome.access_claims.expires_at(),
        refresh_token_expires_at: outcome.refresh_claims.expires_at(),
        user: UserProfile::from(&outcome.user),
    }))
}

/// POST /logout/{session_id}
///
/// Permanently delete a session.
///
/// # Errors
/// - 400: Blank session id
/// - 404: Unknown session
/// - 500: Store error
pub async fn logout(
    path: web::Path<String>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    auth.logout(&path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// POST /token/renew
///
/// Exchange a refresh token for a new access token. The refresh token is
/// not rotated.
///
/// # Errors
/// - 401: Invalid, expired, revoked, mismatched or logged-out refresh token
/// - 500: Internal server error
pub async fn renew_access_token(
    form: web::Json<RenewAccessTokenRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("renew_access_token");

    let (access_token, claims) = auth
        .renew_access_token(&form.refresh_token)
        .await
        .map_err(|e| {
            context.log_error(&e);
            match e {
                AppError::Auth(AuthError::SessionNotFound) => AuthError::SessionClosed.into(),
                other => other,
            }
        })?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = claims.sub,
        "Access token renewed"
    );

    Ok(HttpResponse::Ok().json(RenewAccessTokenResponse {
        access_token,
        access_token_expires_at: claims.expires_at(),
    }))
}

/// POST /session/{session_id}/revoke
///
/// **Requires an administrator access token.** Marks the session revoked;
/// access tokens already issued for it stay valid until they expire.
///
/// # Errors
/// - 400: Blank session id
/// - 401: Missing or invalid access token (handled by middleware)
/// - 403: Caller is not an administrator
/// - 404: Unknown session
/// - 500: Store error
pub async fn revoke_session(
    path: web::Path<String>,
    claims: web::ReqData<Claims>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    if !claims.is_admin {
        tracing::warn!(user_id = claims.sub, "Non-admin attempted session revocation");
        return Err(AuthError::Forbidden.into());
    }

    let session_id = path.into_inner();
    auth.revoke_session(&session_id).await?;

    tracing::info!(
        admin_id = claims.sub,
        session_id = %session_id,
        "Session revoked by administrator"
    );

    Ok(HttpResponse::NoContent().finish())
}

/// GET /me
///
/// **Requires a valid access token.** Echoes the identity it carries.
pub async fn get_current_user(claims: web::ReqData<Claims>) -> HttpResponse {
    HttpResponse::Ok().json(CurrentUserResponse {
        id: claims.sub,
        email: claims.email.clone(),
        is_admin: claims.is_admin,
        expires_at: claims.expires_at(),
    })
}
