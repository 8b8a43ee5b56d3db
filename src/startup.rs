use actix_web::dev::Server;
use actix_web::{error::JsonPayloadError, middleware::Logger, web, App, HttpRequest, HttpServer};
use std::net::TcpListener;

use crate::auth::AuthService;
use crate::error::{AppError, ValidationError};
use crate::logger::LoggerMiddleware;
use crate::middleware::JwtMiddleware;
use crate::routes::{
    create_user_as_admin, get_current_user, health_check, login, logout, register,
    renew_access_token, revoke_session,
};

/// Malformed JSON bodies get the same error envelope as every other failure.
fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::Validation(ValidationError::MalformedBody(err.to_string())).into()
}

pub fn run(listener: TcpListener, auth: AuthService) -> Result<Server, std::io::Error> {
    let tokens = auth.tokens().clone();
    let auth = web::Data::new(auth);

    let server = HttpServer::new(move || {
        App::new()
            // Global middleware
            .wrap(Logger::default())
            .wrap(LoggerMiddleware)

            // Shared state
            .app_data(auth.clone())
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))

            // Public routes
            .route("/health_check", web::get().to(health_check))
            .route("/users", web::post().to(register))
            .route("/login", web::post().to(login))
            .route("/logout/{session_id:.*}", web::post().to(logout))
            .route("/token/renew", web::post().to(renew_access_token))

            // Protected routes (require an access token)
            .service(
                web::scope("/session")
                    .wrap(JwtMiddleware::new(tokens.clone()))
                    .route("/{session_id:[^/]*}/revoke", web::post().to(revoke_session)),
            )
            .service(
                web::scope("/admin")
                    .wrap(JwtMiddleware::new(tokens.clone()))
                    .route("/users", web::post().to(create_user_as_admin)),
            )
            .service(
                web::resource("/me")
                    .wrap(JwtMiddleware::new(tokens.clone()))
                    .route(web::get().to(get_current_user)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
