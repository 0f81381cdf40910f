use async_trait::async_trait;
use tracing::info;

/// Out-of-band delivery channel for reset tokens. The channel itself is an
/// external collaborator; deployments swap in a real SMTP/API client.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_password_reset(&self, email: &str, token: &str) -> anyhow::Result<()>;
}

/// Development mailer: logs the reset link instead of sending it.
pub struct LogMailer {
    frontend_origin: String,
}

impl LogMailer {
    pub fn new(frontend_origin: String) -> Self {
        Self { frontend_origin }
    }

    fn reset_link(&self, token: &str) -> String {
        format!("{}/reset-password?token={}", self.frontend_origin, token)
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send_password_reset(&self, email: &str, token: &str) -> anyhow::Result<()> {
        info!(
            to = %email,
            link = %self.reset_link(token),
            "password reset email (mock, link expires in 1 hour)"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_link_points_at_frontend() {
        let mailer = LogMailer::new("http://localhost:8080".into());
        assert_eq!(
            mailer.reset_link("tok123"),
            "http://localhost:8080/reset-password?token=tok123"
        );
    }
}
