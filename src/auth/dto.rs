use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::repo_types::User;

/// Body of /auth/request-password-reset, byte-identical whether or not the
/// email matched an account.
pub const RESET_SENT_MESSAGE: &str =
    "If an account with that email exists, a password reset link has been sent.";

/// Request body for signup. Fields are optional so missing input is a plain
/// 400 validation failure rather than a deserialization rejection.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RequestPasswordResetRequest {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyResetTokenRequest {
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: Option<String>,
    pub password: Option<String>,
}

/// Public part of the user returned to clients.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: PublicUser,
}

/// `/auth/me` body: `user` is null for anonymous callers, never an error.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: Option<PublicUser>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    #[test]
    fn public_user_drops_the_hash() {
        let user = User {
            id: Uuid::new_v4(),
            email: "a@x.com".into(),
            name: None,
            password_hash: "hash".into(),
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_string(&PublicUser::from(user)).unwrap();
        assert!(json.contains("a@x.com"));
        assert!(!json.contains("hash"));
    }

    #[test]
    fn me_response_serializes_null_user() {
        let json = serde_json::to_string(&MeResponse { user: None }).unwrap();
        assert_eq!(json, r#"{"user":null}"#);
    }
}
