use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{info, instrument, warn};

use crate::config::AppConfig;
use crate::errors::ServiceError;

/// Receipt delivery over SMTP (implicit TLS).
///
/// Delivery is best-effort: there is no retry queue, and callers on the
/// webhook path log failures instead of propagating them so the provider
/// acknowledgment is never withheld over a mail problem.
pub struct Mailer {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    sender: Option<String>,
}

impl Mailer {
    /// Builds the transport from config. Without sender credentials the
    /// mailer runs disabled and sends become logged no-ops, which keeps
    /// development setups working without an SMTP account.
    pub fn from_config(config: &AppConfig) -> Result<Self, ServiceError> {
        let (sender, password) = match (&config.email_sender, &config.email_password) {
            (Some(sender), Some(password)) => (sender.clone(), password.clone()),
            _ => {
                warn!("email transport not configured; receipt delivery disabled");
                return Ok(Self {
                    transport: None,
                    sender: None,
                });
            }
        };

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            .map_err(|e| ServiceError::MailError(e.to_string()))?
            .port(config.smtp_port)
            .credentials(Credentials::new(sender.clone(), password))
            .build();

        Ok(Self {
            transport: Some(transport),
            sender: Some(sender),
        })
    }

    /// Sends a plain-text message. Exactly one attempt, no backoff.
    #[instrument(skip(self, body))]
    pub async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), ServiceError> {
        let (Some(transport), Some(sender)) = (&self.transport, &self.sender) else {
            info!(%to, "email transport disabled; skipping send");
            return Ok(());
        };

        let message = Message::builder()
            .from(
                sender
                    .parse()
                    .map_err(|e| ServiceError::MailError(format!("invalid sender address: {e}")))?,
            )
            .to(to
                .parse()
                .map_err(|e| ServiceError::MailError(format!("invalid recipient address: {e}")))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| ServiceError::MailError(e.to_string()))?;

        transport
            .send(message)
            .await
            .map_err(|e| ServiceError::MailError(e.to_string()))?;

        info!(%to, "confirmation email sent");
        Ok(())
    }
}
