pub mod templates;

use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::transport::smtp::PoolConfig;
use lettre::{Message, SmtpTransport, Transport};
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("invalid mail address: {0}")]
    Address(String),
    #[error("failed to build message: {0}")]
    Build(String),
    #[error("smtp transport error: {0}")]
    Transport(String),
}

/// SMTP settings, collected once at startup and injected into the mailer.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

/// Outbound mail seam. Handlers depend on this trait so tests can record
/// sends instead of talking to an SMTP server.
pub trait Mailer: Send + Sync {
    fn send_verification_email(&self, to: &str, code: &str) -> Result<(), MailError>;
    fn send_confirmation_email(&self, to: &str) -> Result<(), MailError>;
    fn send_reset_email(&self, to: &str, code: &str) -> Result<(), MailError>;
}

pub struct SmtpMailer {
    transport: SmtpTransport,
    from: String,
}

impl SmtpMailer {
    /// Credentials present: authenticated relay over required TLS.
    /// Credentials absent: plain connection for a local capture relay
    /// (MailHog and friends).
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let transport = if config.username.is_empty() {
            SmtpTransport::builder_dangerous(config.host.clone())
                .port(config.port)
                .build()
        } else {
            let tls = TlsParameters::builder(config.host.clone())
                .build()
                .map_err(|e| MailError::Transport(e.to_string()))?;

            SmtpTransport::relay(&config.host)
                .map_err(|e| MailError::Transport(e.to_string()))?
                .credentials(Credentials::new(
                    config.username.clone(),
                    config.password.clone(),
                ))
                .port(config.port)
                .tls(Tls::Required(tls))
                .pool_config(PoolConfig::new().max_size(1))
                .timeout(Some(std::time::Duration::from_secs(10)))
                .build()
        };

        Ok(Self {
            transport,
            from: config.from.clone(),
        })
    }

    fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        let email = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| MailError::Address(format!("{}: {}", self.from, e)))?,
            )
            .to(to
                .parse()
                .map_err(|e| MailError::Address(format!("{}: {}", to, e)))?)
            .subject(subject)
            .header(lettre::message::header::ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport
            .send(&email)
            .map_err(|e| MailError::Transport(e.to_string()))?;

        info!("Email sent to {}", to);
        Ok(())
    }
}

impl Mailer for SmtpMailer {
    fn send_verification_email(&self, to: &str, code: &str) -> Result<(), MailError> {
        self.send(
            to,
            templates::VERIFICATION_SUBJECT,
            &templates::verification_body(code),
        )
    }

    fn send_confirmation_email(&self, to: &str) -> Result<(), MailError> {
        self.send(
            to,
            templates::CONFIRMATION_SUBJECT,
            templates::CONFIRMATION_BODY,
        )
    }

    fn send_reset_email(&self, to: &str, code: &str) -> Result<(), MailError> {
        self.send(to, templates::RESET_SUBJECT, &templates::reset_body(code))
    }
}
