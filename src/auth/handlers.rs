use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse},
    Json,
};
use serde::Deserialize;
use tracing::instrument;

use crate::auth::cookie::{
    clear_oauth_state_cookie, clear_session_cookie, oauth_state_from_headers,
    session_token_from_headers, set_oauth_state_cookie, set_session_cookie,
};
use crate::auth::dto::{
    LoginRequest, MeResponse, MessageResponse, PublicUser, RequestPasswordResetRequest,
    ResetPasswordRequest, SignupRequest, UserResponse, VerifyResetTokenRequest, RESET_SENT_MESSAGE,
};
use crate::auth::extractors::MaybeUser;
use crate::auth::{oauth, service, token};
use crate::error::ApiError;
use crate::state::AppState;

fn require<'a>(field: &'a Option<String>, msg: &str) -> Result<&'a str, ApiError> {
    field
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::validation(msg))
}

fn redirect_found(location: String) -> impl IntoResponse {
    (
        StatusCode::FOUND,
        AppendHeaders([(header::LOCATION, location)]),
    )
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let email = require(&payload.email, "Missing email or password")?;
    let password = require(&payload.password, "Missing email or password")?;

    let user = service::signup(&state, email, payload.name.as_deref(), password).await?;
    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            user: PublicUser::from(user),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = require(&payload.email, "Missing email or password")?;
    let password = require(&payload.password, "Missing email or password")?;

    let credential = service::login(&state, email, password).await?;
    let cookie = set_session_cookie(&credential.token, state.config.session_ttl_hours);
    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(UserResponse {
            user: PublicUser::from(credential.user),
        }),
    ))
}

#[instrument(skip(state, headers))]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = session_token_from_headers(&headers);
    service::logout(&state, token.as_deref()).await?;
    Ok((
        AppendHeaders([(header::SET_COOKIE, clear_session_cookie())]),
        Json(serde_json::json!({})),
    ))
}

#[instrument(skip_all)]
pub async fn me(MaybeUser(user): MaybeUser) -> Json<MeResponse> {
    Json(MeResponse {
        user: user.map(PublicUser::from),
    })
}

#[instrument(skip(state, payload))]
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(payload): Json<RequestPasswordResetRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let email = require(&payload.email, "Email is required")?;
    service::request_password_reset(&state, email).await?;
    Ok(Json(MessageResponse {
        message: RESET_SENT_MESSAGE.into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn verify_reset_token(
    State(state): State<AppState>,
    Json(payload): Json<VerifyResetTokenRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let token = require(&payload.token, "Token is required")?;
    service::verify_reset_token(&state, token).await?;
    Ok(Json(MessageResponse {
        message: "Token is valid".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let token = require(&payload.token, "Token and new password are required")?;
    let password = require(&payload.password, "Token and new password are required")?;

    service::complete_password_reset(&state, token, password).await?;
    Ok(Json(MessageResponse {
        message: "Password has been reset successfully.".into(),
    }))
}

#[instrument(skip(state))]
pub async fn google_start(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let google = state
        .config
        .google
        .as_ref()
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("Google OAuth not configured")))?;

    // The nonce goes to the provider in the consent URL and comes home in a
    // short-lived cookie; the callback refuses any mismatch.
    let state_param = token::generate_token();
    Ok((
        AppendHeaders([(header::SET_COOKIE, set_oauth_state_cookie(&state_param))]),
        redirect_found(oauth::consent_url(google, &state_param)),
    ))
}

#[derive(Debug, Deserialize)]
pub struct OAuthCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
}

/// CSRF check on the callback: the `state` echoed by the provider must match
/// the nonce we stashed in the browser when the flow started.
fn check_oauth_state(
    from_query: Option<&str>,
    from_cookie: Option<&str>,
) -> Result<(), ApiError> {
    match (from_query, from_cookie) {
        (Some(q), Some(c)) if q == c => Ok(()),
        _ => Err(ApiError::validation("Invalid oauth state")),
    }
}

#[instrument(skip(state, query, headers))]
pub async fn google_callback(
    State(state): State<AppState>,
    Query(query): Query<OAuthCallbackQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let code = require(&query.code, "Missing oauth parameters")?;
    check_oauth_state(
        query.state.as_deref(),
        oauth_state_from_headers(&headers).as_deref(),
    )?;

    let credential = oauth::sign_in_with_code(&state, code).await?;
    let cookie = set_session_cookie(&credential.token, state.config.session_ttl_hours);
    Ok((
        AppendHeaders([
            (header::SET_COOKIE, cookie),
            (header::SET_COOKIE, clear_oauth_state_cookie()),
        ]),
        redirect_found(format!("{}/?auth=google", state.config.frontend_origin)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_rejects_missing_and_blank_fields() {
        assert!(require(&None, "missing").is_err());
        assert!(require(&Some("".into()), "missing").is_err());
        assert!(require(&Some("   ".into()), "missing").is_err());
        assert_eq!(require(&Some(" v ".into()), "missing").unwrap(), "v");
    }

    #[test]
    fn oauth_state_must_match_the_cookie() {
        assert!(check_oauth_state(Some("nonce"), Some("nonce")).is_ok());
        assert!(check_oauth_state(Some("nonce"), Some("other")).is_err());
        assert!(check_oauth_state(Some("nonce"), None).is_err());
        assert!(check_oauth_state(None, Some("nonce")).is_err());
        assert!(check_oauth_state(None, None).is_err());
    }

    #[test]
    fn reset_request_message_is_fixed() {
        // Anti-enumeration: the body must not vary with account existence.
        assert_eq!(
            RESET_SENT_MESSAGE,
            "If an account with that email exists, a password reset link has been sent."
        );
    }
}
