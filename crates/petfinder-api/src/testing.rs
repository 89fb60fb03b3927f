//! Shared fixtures for handler and policy tests: an in-memory database and
//! a mailer that records sends instead of speaking SMTP.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use petfinder_db::Database;
use petfinder_mail::{MailError, Mailer};
use petfinder_types::api::Claims;
use petfinder_types::models::Role;

use crate::auth::{AppState, AppStateInner};
use crate::token::TokenService;

#[derive(Clone, Debug, PartialEq)]
pub enum SentMail {
    Verification { to: String, code: String },
    Confirmation { to: String },
    Reset { to: String, code: String },
}

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<SentMail>>,
    fail: AtomicBool,
}

impl RecordingMailer {
    /// Make every subsequent send fail, to exercise the mail-failure paths.
    pub fn fail_sends(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn take_sent(&self) -> Vec<SentMail> {
        std::mem::take(&mut *self.sent.lock().unwrap())
    }

    fn record(&self, mail: SentMail) -> Result<(), MailError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MailError::Transport("mock transport failure".into()));
        }
        self.sent.lock().unwrap().push(mail);
        Ok(())
    }
}

impl Mailer for RecordingMailer {
    fn send_verification_email(&self, to: &str, code: &str) -> Result<(), MailError> {
        self.record(SentMail::Verification {
            to: to.to_string(),
            code: code.to_string(),
        })
    }

    fn send_confirmation_email(&self, to: &str) -> Result<(), MailError> {
        self.record(SentMail::Confirmation { to: to.to_string() })
    }

    fn send_reset_email(&self, to: &str, code: &str) -> Result<(), MailError> {
        self.record(SentMail::Reset {
            to: to.to_string(),
            code: code.to_string(),
        })
    }
}

pub fn test_state() -> (AppState, Arc<RecordingMailer>) {
    let mailer = Arc::new(RecordingMailer::default());
    let state = Arc::new(AppStateInner {
        db: Database::open_in_memory().unwrap(),
        tokens: TokenService::new("test-secret"),
        mailer: mailer.clone(),
    });
    (state, mailer)
}

pub fn claims_for(user_id: Uuid, role: Role) -> Claims {
    Claims {
        sub: user_id,
        role,
        exp: (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize,
    }
}
