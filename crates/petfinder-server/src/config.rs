use anyhow::Result;

use petfinder_mail::MailConfig;

/// Everything the process needs, read from the environment exactly once at
/// startup. Request paths never consult the environment; they receive this
/// value (or pieces of it) by injection.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: String,
    pub jwt_secret: String,
    pub mail: MailConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let host = std::env::var("PETFINDER_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = std::env::var("PETFINDER_PORT")
            .unwrap_or_else(|_| "5000".into())
            .parse()?;
        let db_path = std::env::var("PETFINDER_DB_PATH").unwrap_or_else(|_| "petfinder.db".into());
        let jwt_secret =
            std::env::var("PETFINDER_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());

        // Without credentials the mailer speaks plain SMTP to a local
        // capture relay (MailHog on 1025); with them it uses an
        // authenticated TLS relay.
        let mail = MailConfig {
            host: std::env::var("SMTP_HOST").unwrap_or_else(|_| "localhost".into()),
            port: std::env::var("SMTP_PORT")
                .unwrap_or_else(|_| "1025".into())
                .parse()?,
            username: std::env::var("SMTP_USERNAME").unwrap_or_default(),
            password: std::env::var("SMTP_PASSWORD").unwrap_or_default(),
            from: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| "Pet Finder <no-reply@petfinder.local>".into()),
        };

        Ok(Self {
            host,
            port,
            db_path,
            jwt_secret,
            mail,
        })
    }
}
