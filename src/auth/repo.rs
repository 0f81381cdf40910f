use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{PasswordResetToken, Session, User};

const USER_COLUMNS: &str = "id, email, name, password_hash, created_at, updated_at";

impl User {
    /// Find a user by already-normalized email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Insert a new user. Email uniqueness is enforced by the store's unique
    /// constraint; a duplicate surfaces as a database error with code 23505.
    pub async fn create(
        db: &PgPool,
        email: &str,
        name: Option<&str>,
        password_hash: &str,
    ) -> sqlx::Result<User> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, name, password_hash)
             VALUES ($1, $2, $3)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(email)
        .bind(name)
        .bind(password_hash)
        .fetch_one(db)
        .await
    }

    /// Set a new password hash and drop every live reset token for the user,
    /// in one transaction. Clearing all rows both consumes the token that was
    /// used and invalidates any stray ones.
    pub async fn update_password(
        db: &PgPool,
        user_id: Uuid,
        password_hash: &str,
    ) -> sqlx::Result<()> {
        let mut tx = db.begin().await?;
        sqlx::query("UPDATE users SET password_hash = $1, updated_at = now() WHERE id = $2")
            .bind(password_hash)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM password_reset_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await
    }
}

impl Session {
    pub async fn create(db: &PgPool, user_id: Uuid, token: &str) -> sqlx::Result<Session> {
        sqlx::query_as::<_, Session>(
            "INSERT INTO sessions (user_id, token)
             VALUES ($1, $2)
             RETURNING id, user_id, token, created_at",
        )
        .bind(user_id)
        .bind(token)
        .fetch_one(db)
        .await
    }

    /// Resolve a session token to its owning user, rejecting sessions older
    /// than the TTL. A user deleted since login resolves to nothing (the
    /// session row cascades away with the user).
    pub async fn resolve_user(
        db: &PgPool,
        token: &str,
        ttl_hours: i64,
    ) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(
            "SELECT u.id, u.email, u.name, u.password_hash, u.created_at, u.updated_at
             FROM users u
             JOIN sessions s ON s.user_id = u.id
             WHERE s.token = $1
               AND s.created_at > now() - ($2 * interval '1 hour')",
        )
        .bind(token)
        .bind(ttl_hours as f64)
        .fetch_optional(db)
        .await
    }

    /// Revoke a session. Deleting an unknown token is a no-op, which keeps
    /// logout idempotent.
    pub async fn delete_by_token(db: &PgPool, token: &str) -> sqlx::Result<()> {
        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Drop sessions past the TTL. `resolve_user` already refuses them; this
    /// reclaims the rows so the table does not grow without bound.
    pub async fn purge_expired(db: &PgPool, ttl_hours: i64) -> sqlx::Result<u64> {
        let result =
            sqlx::query("DELETE FROM sessions WHERE created_at < now() - ($1 * interval '1 hour')")
                .bind(ttl_hours as f64)
                .execute(db)
                .await?;
        Ok(result.rows_affected())
    }
}

impl PasswordResetToken {
    /// Issue a reset token for a user, replacing any previous one. The upsert
    /// rides the UNIQUE(user_id) index, so concurrent requests for the same
    /// user serialize on the row and the last writer wins; at most one token
    /// is ever live per user.
    pub async fn issue(
        db: &PgPool,
        user_id: Uuid,
        token_hash: &str,
        expires_at: OffsetDateTime,
    ) -> sqlx::Result<()> {
        sqlx::query(
            "INSERT INTO password_reset_tokens (user_id, token_hash, expires_at)
             VALUES ($1, $2, $3)
             ON CONFLICT (user_id) DO UPDATE
             SET token_hash = EXCLUDED.token_hash,
                 expires_at = EXCLUDED.expires_at,
                 created_at = now()",
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(db)
        .await?;
        Ok(())
    }

    pub async fn find_by_hash(
        db: &PgPool,
        token_hash: &str,
    ) -> sqlx::Result<Option<PasswordResetToken>> {
        sqlx::query_as::<_, PasswordResetToken>(
            "SELECT user_id, token_hash, expires_at, created_at
             FROM password_reset_tokens
             WHERE token_hash = $1",
        )
        .bind(token_hash)
        .fetch_optional(db)
        .await
    }

    /// Remove a single row; used to clean up an expired token on its first
    /// verification attempt.
    pub async fn delete_by_hash(db: &PgPool, token_hash: &str) -> sqlx::Result<()> {
        sqlx::query("DELETE FROM password_reset_tokens WHERE token_hash = $1")
            .bind(token_hash)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Drop tokens past their expiry that were never presented for
    /// verification.
    pub async fn purge_expired(db: &PgPool) -> sqlx::Result<u64> {
        let result = sqlx::query("DELETE FROM password_reset_tokens WHERE expires_at < now()")
            .execute(db)
            .await?;
        Ok(result.rows_affected())
    }
}
