//! Outgoing mail
//!
//! Messages are sent through an SMTP relay with lettre. While no relay is
//! configured the mailer logs the message and skips it, so registration and
//! notifications keep working on a development box.

use crate::config::EmailConfig;
use anyhow::{anyhow, Result};
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

/// SMTP mailer
#[derive(Clone)]
pub struct Mailer {
    config: EmailConfig,
    site_url: String,
}

impl Mailer {
    pub fn new(config: EmailConfig, site_url: impl Into<String>) -> Self {
        Self {
            config,
            site_url: site_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.is_enabled()
    }

    /// Absolute link under the public API
    pub fn api_link(&self, path: &str) -> String {
        format!("{}/api/v1/{}", self.site_url, path.trim_start_matches('/'))
    }

    /// Send a plain text message.
    ///
    /// Returns `Ok(false)` when mail is disabled and nothing was sent.
    pub async fn send(&self, to: &str, subject: &str, body: String) -> Result<bool> {
        if !self.config.is_enabled() {
            tracing::warn!("SMTP not configured, skipping mail '{}' to {}", subject, to);
            return Ok(false);
        }

        let email = Message::builder()
            .from(
                self.config
                    .from_address
                    .parse()
                    .map_err(|e| anyhow!("Invalid from address: {}", e))?,
            )
            .to(to.parse().map_err(|e| anyhow!("Invalid to address: {}", e))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| anyhow!("Failed to build email: {}", e))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.smtp_host)
            .map_err(|e| anyhow!("Failed to create SMTP transport: {}", e))?
            .port(self.config.smtp_port);
        if !self.config.smtp_username.is_empty() {
            builder = builder.credentials(Credentials::new(
                self.config.smtp_username.clone(),
                self.config.smtp_password.clone(),
            ));
        }
        let mailer: AsyncSmtpTransport<Tokio1Executor> = builder.build();

        mailer
            .send(email)
            .await
            .map_err(|e| anyhow!("Failed to send email: {}", e))?;

        tracing::debug!("Sent mail '{}' to {}", subject, to);
        Ok(true)
    }

    pub async fn send_verification(&self, to: &str, username: &str, token: &str) -> Result<bool> {
        let link = self.api_link(&format!("users/activate/{}", token));
        let body = format!(
            "Hi {},\n\nWelcome to Authors Heaven. Confirm your email address by opening the link below:\n\n{}\n\nIf you did not create an account, ignore this message.",
            username, link
        );
        self.send(to, "Verify your Authors Heaven account", body).await
    }

    pub async fn send_password_reset(&self, to: &str, username: &str, token: &str) -> Result<bool> {
        let body = format!(
            "Hi {},\n\nUse this token to reset your password:\n\n{}\n\nSubmit it with your new password to {}.\nIf you did not ask for a reset, ignore this message.",
            username,
            token,
            self.api_link("users/password/reset/confirm")
        );
        self.send(to, "Reset your Authors Heaven password", body).await
    }

    /// Notification mail with its unsubscribe link
    pub async fn send_notification(
        &self,
        to: &str,
        description: &str,
        resource_url: Option<&str>,
        unsubscribe_token: &str,
    ) -> Result<bool> {
        let mut body = format!("{}\n", description);
        if let Some(url) = resource_url {
            body.push_str(&format!("\nRead it here: {}\n", url));
        }
        body.push_str(&format!(
            "\nTo stop receiving these emails, unsubscribe here: {}\n",
            self.api_link(&format!("notifications/unsubscribe_email/{}", unsubscribe_token))
        ));
        self.send(to, "New notification from Authors Heaven", body).await
    }
}
