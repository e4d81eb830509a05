use actix_web::{HttpResponse, Responder, Scope, post, web};
use tracing::info;

use crate::application::auth_service::AuthService;
use crate::data::user_repository::PostgresUserRepository;
use crate::domain::error::DomainError;
use crate::infrastructure::security::TOKEN_TTL_SECS;
use crate::presentation::dto::{AuthResponse, LoginRequest, RegisterRequest};

pub fn scope() -> Scope {
    web::scope("/auth").service(register).service(login)
}

/// Registration logs the new user straight in and returns a token.
#[post("/register")]
async fn register(
    service: web::Data<AuthService<PostgresUserRepository>>,
    payload: web::Json<RegisterRequest>,
) -> Result<impl Responder, DomainError> {
    let payload = payload.into_inner();
    let user = service
        .register(payload.username, payload.password.clone())
        .await?;

    info!(user_id = %user.id, username = %user.username, "user registered");

    let jwt = service.login(&user.username, &payload.password).await?;

    Ok(HttpResponse::Created().json(AuthResponse {
        access_token: jwt,
        expires_in: TOKEN_TTL_SECS,
        token_type: "Bearer".to_string(),
    }))
}

#[post("/login")]
async fn login(
    service: web::Data<AuthService<PostgresUserRepository>>,
    payload: web::Json<LoginRequest>,
) -> Result<impl Responder, DomainError> {
    let jwt = service.login(&payload.username, &payload.password).await?;

    info!(username = %payload.username, "user logged in");

    Ok(HttpResponse::Ok().json(AuthResponse {
        access_token: jwt,
        expires_in: TOKEN_TTL_SECS,
        token_type: "Bearer".to_string(),
    }))
}
