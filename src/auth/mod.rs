use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub mod cookie;
mod dto;
pub mod extractors;
pub mod handlers;
pub mod mailer;
pub mod oauth;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod service;
pub mod token;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(handlers::signup))
        .route("/auth/login", post(handlers::login))
        .route("/auth/logout", post(handlers::logout))
        .route("/auth/me", get(handlers::me))
        .route(
            "/auth/request-password-reset",
            post(handlers::request_password_reset),
        )
        .route("/auth/verify-reset-token", post(handlers::verify_reset_token))
        .route("/auth/reset-password", post(handlers::reset_password))
        .route("/auth/google/start", get(handlers::google_start))
        .route("/auth/google/callback", get(handlers::google_callback))
}
