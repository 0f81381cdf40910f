use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

/// Request-level error taxonomy. Every handler returns `Result<_, ApiError>`
/// and the `IntoResponse` impl decides the wire shape, so a single failed
/// request can never take the listener down.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    /// Bad credentials or an invalid/expired session. The message is kept
    /// uniform so callers cannot tell "no such user" from "wrong password".
    #[error("{0}")]
    Authentication(String),

    /// Invalid or expired password-reset token. Reported as 400 per the API
    /// contract, with one generic message for both causes.
    #[error("Invalid or expired password reset token")]
    ResetTokenInvalid,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// An external collaborator (identity provider, AI service) failed.
    /// Full detail is logged server-side; the caller only sees a 502.
    #[error("upstream service error")]
    Upstream(#[source] anyhow::Error),

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_credentials() -> Self {
        Self::Authentication("Invalid credentials".into())
    }

    pub fn unauthorized() -> Self {
        Self::Authentication("Unauthorized".into())
    }

    pub fn upstream(context: &'static str, err: impl Into<anyhow::Error>) -> Self {
        Self::Upstream(err.into().context(context))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::ResetTokenInvalid => StatusCode::BAD_REQUEST,
            Self::Authentication(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        Self::Internal(anyhow::Error::new(err).context("database error"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            // Never leak provider or store internals to the caller.
            Self::Upstream(err) => {
                error!(error = ?err, "upstream call failed");
                "Upstream service error".to_string()
            }
            Self::Internal(err) => {
                error!(error = ?err, "internal error");
                "Internal error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_follows_taxonomy() {
        assert_eq!(
            ApiError::validation("missing email").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::invalid_credentials().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::ResetTokenInvalid.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::Forbidden("admin only".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::Conflict("email exists".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::upstream("token exchange", anyhow::anyhow!("boom")).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn credential_failures_share_one_message() {
        // "user not found" and "wrong password" must be indistinguishable.
        assert_eq!(
            ApiError::invalid_credentials().to_string(),
            ApiError::invalid_credentials().to_string()
        );
    }

    #[test]
    fn reset_token_error_never_names_the_cause() {
        let msg = ApiError::ResetTokenInvalid.to_string();
        assert!(msg.contains("Invalid or expired"));
        assert!(!msg.to_lowercase().contains("not found"));
    }
}
