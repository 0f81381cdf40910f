//! Google OAuth bridge: authorization-code exchange, profile fetch, and the
//! local-account upsert. The identity provider is an external collaborator;
//! any failed call aborts with an upstream error instead of minting a
//! half-formed session.

use serde::Deserialize;
use tracing::info;

use crate::auth::repo_types::{Session, User};
use crate::auth::service::{self, SessionCredential};
use crate::auth::{password, token};
use crate::config::GoogleOAuthConfig;
use crate::error::ApiError;
use crate::state::AppState;

const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const USERINFO_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v3/userinfo";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GoogleProfile {
    pub email: Option<String>,
    pub name: Option<String>,
}

/// Build the consent-screen URL the browser is redirected to.
pub fn consent_url(google: &GoogleOAuthConfig, state_param: &str) -> String {
    let url = reqwest::Url::parse_with_params(
        AUTH_ENDPOINT,
        &[
            ("client_id", google.client_id.as_str()),
            ("redirect_uri", google.redirect_uri.as_str()),
            ("response_type", "code"),
            ("scope", "openid email profile"),
            ("access_type", "offline"),
            ("prompt", "select_account"),
            ("state", state_param),
        ],
    )
    .expect("static auth endpoint parses");
    url.into()
}

async fn exchange_code(
    http: &reqwest::Client,
    google: &GoogleOAuthConfig,
    code: &str,
) -> Result<String, ApiError> {
    let response = http
        .post(TOKEN_ENDPOINT)
        .form(&[
            ("code", code),
            ("client_id", google.client_id.as_str()),
            ("client_secret", google.client_secret.as_str()),
            ("redirect_uri", google.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await
        .map_err(|e| ApiError::upstream("token exchange request", e))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::Upstream(anyhow::anyhow!(
            "token exchange failed: {status}: {body}"
        )));
    }

    let token_body: TokenResponse = response
        .json()
        .await
        .map_err(|e| ApiError::upstream("token exchange body", e))?;

    token_body
        .access_token
        .ok_or_else(|| ApiError::Upstream(anyhow::anyhow!("no access token in provider response")))
}

async fn fetch_profile(
    http: &reqwest::Client,
    access_token: &str,
) -> Result<GoogleProfile, ApiError> {
    let response = http
        .get(USERINFO_ENDPOINT)
        .bearer_auth(access_token)
        .send()
        .await
        .map_err(|e| ApiError::upstream("userinfo request", e))?;

    if !response.status().is_success() {
        let status = response.status();
        return Err(ApiError::Upstream(anyhow::anyhow!(
            "userinfo fetch failed: {status}"
        )));
    }

    response
        .json()
        .await
        .map_err(|e| ApiError::upstream("userinfo body", e))
}

/// Complete the code exchange and sign the user in, creating a local account
/// on first sight. Provider-created accounts get a random, irrecoverable
/// password hash; they are reachable by password only via the reset flow.
pub async fn sign_in_with_code(state: &AppState, code: &str) -> Result<SessionCredential, ApiError> {
    let google = state
        .config
        .google
        .as_ref()
        .ok_or_else(|| ApiError::validation("Google OAuth not configured"))?;

    let access_token = exchange_code(&state.http, google, code).await?;
    let profile = fetch_profile(&state.http, &access_token).await?;

    let email = profile
        .email
        .as_deref()
        .map(service::normalize_email)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ApiError::validation("Google account has no email"))?;

    let user = match User::find_by_email(&state.db, &email).await? {
        Some(user) => user,
        None => {
            let placeholder = password::hash_password(
                &token::generate_token(),
                state.config.hash_time_cost,
            )?;
            let user =
                User::create(&state.db, &email, profile.name.as_deref(), &placeholder).await?;
            info!(user_id = %user.id, "user created via google sign-in");
            user
        }
    };

    let session_token = token::generate_token();
    Session::create(&state.db, user.id, &session_token).await?;
    info!(user_id = %user.id, "google sign-in completed");
    Ok(SessionCredential {
        token: session_token,
        user,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn google() -> GoogleOAuthConfig {
        GoogleOAuthConfig {
            client_id: "client-123".into(),
            client_secret: "secret".into(),
            redirect_uri: "http://localhost:4000/auth/google/callback".into(),
        }
    }

    #[test]
    fn consent_url_carries_required_params() {
        let url = consent_url(&google(), "xyz");
        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(url.contains("client_id=client-123"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("scope=openid+email+profile"));
        assert!(url.contains("state=xyz"));
        // The client secret never appears in the browser-visible URL.
        assert!(!url.contains("secret"));
    }

    #[test]
    fn token_response_tolerates_missing_access_token() {
        let parsed: TokenResponse = serde_json::from_str(r#"{"error":"invalid_grant"}"#).unwrap();
        assert!(parsed.access_token.is_none());

        let parsed: TokenResponse =
            serde_json::from_str(r#"{"access_token":"ya29.abc","expires_in":3599}"#).unwrap();
        assert_eq!(parsed.access_token.as_deref(), Some("ya29.abc"));
    }

    #[test]
    fn profile_parses_partial_payloads() {
        let parsed: GoogleProfile =
            serde_json::from_str(r#"{"sub":"1","email":"A@X.com"}"#).unwrap();
        assert_eq!(parsed.email.as_deref(), Some("A@X.com"));
        assert!(parsed.name.is_none());
    }
}
