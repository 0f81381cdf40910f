use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::auth::cookie::session_token_from_headers;
use crate::auth::repo_types::User;
use crate::auth::service;
use crate::error::ApiError;
use crate::state::AppState;

/// Extractor for routes that hard-require a live session. Missing cookie,
/// unknown token, expired session, and deleted user all reject the same way.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token_from_headers(&parts.headers);
        let user = service::current_user(state, token.as_deref())
            .await?
            .ok_or_else(ApiError::unauthorized)?;
        Ok(CurrentUser(user))
    }
}

/// Anonymous-tolerant variant for routes like `/auth/me` that answer
/// `user: null` instead of rejecting.
pub struct MaybeUser(pub Option<User>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token_from_headers(&parts.headers);
        let user = service::current_user(state, token.as_deref()).await?;
        Ok(MaybeUser(user))
    }
}

/// Session user whose email is on the configured admin allow-list. Gates the
/// database inspector routes.
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !state.config.is_admin(&user.email) {
            return Err(ApiError::Forbidden("Admin access required".into()));
        }
        Ok(AdminUser(user))
    }
}
