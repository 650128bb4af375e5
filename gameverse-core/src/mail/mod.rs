//! 邮件发送：验证邮件与欢迎邮件

use crate::error::{GameVerseError, Result};
use async_trait::async_trait;
use std::sync::Mutex;
use tracing::info;

mod smtp;
pub mod templates;

pub use smtp::{SmtpConfig, SmtpMailer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailKind {
    Verification,
    Welcome,
}

/// A rendered message ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub kind: MailKind,
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Email transport.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> Result<()>;
}

/// Mailer used when no SMTP server is configured: writes the message to the log.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<()> {
        info!(to = %mail.to, subject = %mail.subject, kind = ?mail.kind, "mail not sent (no SMTP configured)");
        Ok(())
    }
}

/// Keeps every message in memory. Can be told to fail, to exercise error paths.
#[derive(Debug, Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<OutgoingMail>>,
    fail: bool,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 每次发送都返回错误
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<()> {
        if self.fail {
            return Err(GameVerseError::Mail(format!("refused mail to {}", mail.to)));
        }
        self.sent
            .lock()
            .map_err(|_| GameVerseError::Other("mailer lock poisoned".into()))?
            .push(mail);
        Ok(())
    }
}
