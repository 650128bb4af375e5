//! 邮箱验证：消费验证 token、重新发送验证邮件

use super::models::*;
use super::AccountManager;
use crate::error::{GameVerseError, Result};
use crate::mail::templates;
use chrono::Utc;
use tracing::{info, instrument, warn};

impl AccountManager {
    /// 消费验证 token 并激活账户。
    ///
    /// token 已被消费过时，只有激活的正是该 token 的账户才视为已验证；
    /// 其余情况（过期、不存在）返回 `InvalidInput`。
    #[instrument(skip(self, token))]
    pub async fn verify_email(&self, token: &str) -> Result<VerificationOutcome> {
        let now = Utc::now();
        let pending = self
            .users
            .find_user_by_verification_token(token)
            .await?
            .filter(|u| u.verification_token_expires.is_some_and(|exp| exp > now));

        let Some(mut user) = pending else {
            if self.users.find_user_verified_with(token).await?.is_some() {
                info!("verification token already consumed");
                return Ok(VerificationOutcome::AlreadyVerified);
            }
            return Err(GameVerseError::InvalidInput(
                "Invalid or expired verification token".into(),
            ));
        };

        user.email_verified = true;
        user.verification_token = None;
        user.verification_token_expires = None;
        user.verified_with_token = Some(token.to_string());
        user.updated_at = Some(now);
        self.users.save_user(&user).await?;
        info!(user_id = user.user_id, "email verified");

        let mail = templates::welcome_email(&user.email, &user.username);
        if let Err(e) = self.mailer.send(mail).await {
            warn!(user_id = user.user_id, error = %e, "welcome email failed");
        }

        Ok(VerificationOutcome::Verified)
    }

    /// 重新发送验证邮件，每个账户 60 秒内最多一次
    #[instrument(skip(self))]
    pub async fn resend_verification(&self, email: Option<&str>) -> Result<()> {
        let Some(email) = email.map(str::trim).filter(|e| !e.is_empty()) else {
            return Err(GameVerseError::InvalidInput("Email is required".into()));
        };

        let mut user = self
            .users
            .find_user_by_email(email)
            .await?
            .ok_or_else(|| GameVerseError::NotFound("User".into()))?;

        if user.email_verified {
            return Err(GameVerseError::AlreadyVerified);
        }

        let now = Utc::now();
        if let Some(last) = user.last_verification_email_sent {
            if now - last < self.resend_cooldown {
                return Err(GameVerseError::RateLimited {
                    retry_after: self.resend_cooldown.num_seconds().max(0) as u64,
                });
            }
        }

        let token = self.issue_verification_token(&mut user);
        user.last_verification_email_sent = Some(now);
        user.updated_at = Some(now);
        self.users.save_user(&user).await?;

        let mail = templates::verification_email(
            &user.email,
            &user.username,
            &self.verification_url(&token),
        );
        self.mailer.send(mail).await?;
        info!(user_id = user.user_id, "verification email resent");
        Ok(())
    }
}
