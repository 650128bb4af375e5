//! 账户管理器：核心结构、注册与资料查询

use super::crypto::{generate_verification_token, hash_password};
use super::models::*;
use crate::error::{GameVerseError, Result};
use crate::mail::{templates, Mailer};
use crate::store::UserStore;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// 生产环境的 bcrypt cost
pub const DEFAULT_HASH_COST: u32 = 10;

/// JWT 签名密钥（access 与 refresh 分开）
#[derive(Debug, Clone)]
pub struct TokenSecrets {
    pub access: String,
    pub refresh: String,
}

/// 账户管理器
#[derive(Clone)]
pub struct AccountManager {
    pub(super) users: Arc<dyn UserStore>,
    pub(super) mailer: Arc<dyn Mailer>,
    pub(super) secrets: TokenSecrets,
    /// Access token 有效期（秒）
    pub(super) access_token_ttl: i64,
    /// Refresh token 有效期（秒）
    pub(super) refresh_token_ttl: i64,
    /// 验证 token 有效期
    pub(super) verification_ttl: Duration,
    /// 两次发送验证邮件的最小间隔
    pub(super) resend_cooldown: Duration,
    pub(super) hash_cost: u32,
    /// 前端地址，用于拼接验证链接
    pub(super) frontend_url: String,
}

impl std::fmt::Debug for AccountManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountManager")
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("frontend_url", &self.frontend_url)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// 构造器和配置
// ============================================================================

impl AccountManager {
    pub fn new(users: Arc<dyn UserStore>, mailer: Arc<dyn Mailer>, secrets: TokenSecrets) -> Self {
        Self {
            users,
            mailer,
            secrets,
            access_token_ttl: 15 * 60,        // 15 分钟
            refresh_token_ttl: 5 * 24 * 3600, // 5 天
            verification_ttl: Duration::hours(24),
            resend_cooldown: Duration::seconds(60),
            hash_cost: DEFAULT_HASH_COST,
            frontend_url: "http://localhost:5173".to_string(),
        }
    }

    /// 配置 token 有效期（秒）
    pub fn with_ttl(mut self, access_ttl: i64, refresh_ttl: i64) -> Self {
        self.access_token_ttl = access_ttl;
        self.refresh_token_ttl = refresh_ttl;
        self
    }

    /// 配置 bcrypt cost（测试中使用较低的值）
    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    /// 配置前端地址；必须是合法的绝对 URL
    pub fn with_frontend_url(mut self, frontend_url: &str) -> Result<Self> {
        url::Url::parse(frontend_url).map_err(|e| {
            GameVerseError::InvalidInput(format!("invalid frontend url {}: {}", frontend_url, e))
        })?;
        self.frontend_url = frontend_url.trim_end_matches('/').to_string();
        Ok(self)
    }

    pub fn refresh_token_ttl(&self) -> i64 {
        self.refresh_token_ttl
    }
}

// ============================================================================
// 内部辅助方法
// ============================================================================

impl AccountManager {
    pub(super) fn verification_url(&self, token: &str) -> String {
        format!("{}/#/verify-email/{}", self.frontend_url, token)
    }

    /// 生成新的验证 token 并写入用户（不持久化）
    pub(super) fn issue_verification_token(&self, user: &mut User) -> String {
        let token = generate_verification_token();
        user.verification_token = Some(token.clone());
        user.verification_token_expires = Some(Utc::now() + self.verification_ttl);
        token
    }

    /// 去掉首尾空白后非空的字段；注册与登录对邮箱做同样的处理
    pub(super) fn required<'a>(value: &'a Option<String>) -> Option<&'a str> {
        value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }
}

// ============================================================================
// 注册与资料
// ============================================================================

impl AccountManager {
    /// 注册新用户。验证邮件在后台发送，发送失败只记录日志。
    #[instrument(skip(self, req))]
    pub async fn register(&self, req: RegisterRequest) -> Result<User> {
        let (Some(email), Some(username), Some(password)) = (
            Self::required(&req.email),
            Self::required(&req.username),
            req.password.as_deref().filter(|p| !p.is_empty()),
        ) else {
            return Err(GameVerseError::InvalidInput("All fields are required".into()));
        };

        if self
            .users
            .find_user_by_email_or_username(email, username)
            .await?
            .is_some()
        {
            return Err(GameVerseError::AlreadyExists("User".into()));
        }

        let password_hash = hash_password(password, self.hash_cost).await?;
        let user_id = self.users.next_user_id().await?;

        let now = Utc::now();
        let mut user = User {
            user_id,
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
            profile_picture: None,
            bio: None,
            game_list: Vec::new(),
            email_verified: false,
            verification_token: None,
            verification_token_expires: None,
            verified_with_token: None,
            last_verification_email_sent: None,
            reset_password_token: None,
            reset_password_expires: None,
            created_at: Some(now),
            updated_at: Some(now),
        };
        let token = self.issue_verification_token(&mut user);

        // 唯一索引兜底：并发注册时由存储层返回 AlreadyExists
        self.users.insert_user(&user).await?;
        info!(user_id = user.user_id, username = %user.username, "registered user");

        let mail = templates::verification_email(
            &user.email,
            &user.username,
            &self.verification_url(&token),
        );
        let mailer = Arc::clone(&self.mailer);
        let to = user.email.clone();
        tokio::spawn(async move {
            match mailer.send(mail).await {
                Ok(()) => info!(to = %to, "verification email sent"),
                Err(e) => warn!(to = %to, error = %e, "verification email failed"),
            }
        });

        Ok(user)
    }

    /// 获取用户资料（不含密码）
    #[instrument(skip(self))]
    pub async fn profile(&self, user_id: i64) -> Result<UserProfile> {
        let user = self
            .users
            .find_user(user_id)
            .await?
            .ok_or_else(|| GameVerseError::NotFound("User".into()))?;
        Ok(user.into())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::mail::{MailKind, MemoryMailer};
    use crate::store::MemoryStore;

    pub(crate) fn manager_with(mailer: Arc<MemoryMailer>) -> (Arc<MemoryStore>, AccountManager) {
        let store = Arc::new(MemoryStore::new());
        let manager = AccountManager::new(
            store.clone(),
            mailer,
            TokenSecrets {
                access: "access-secret".into(),
                refresh: "refresh-secret".into(),
            },
        )
        .with_hash_cost(4)
        .with_frontend_url("https://gameverse.example/")
        .unwrap();
        (store, manager)
    }

    pub(crate) fn request(email: &str, username: &str) -> RegisterRequest {
        RegisterRequest {
            email: Some(email.into()),
            username: Some(username.into()),
            password: Some("test123456".into()),
        }
    }

    /// 等待后台发信任务完成
    pub(crate) async fn wait_for_mail(mailer: &MemoryMailer, count: usize) {
        for _ in 0..100 {
            if mailer.sent().len() >= count {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("expected {} mails, got {}", count, mailer.sent().len());
    }

    #[tokio::test]
    async fn register_assigns_sequential_ids_and_sends_mail() {
        let mailer = Arc::new(MemoryMailer::new());
        let (_, manager) = manager_with(mailer.clone());

        let first = manager.register(request("a@test.com", "alice")).await.unwrap();
        let second = manager.register(request("b@test.com", "bob")).await.unwrap();
        assert_eq!(first.user_id + 1, second.user_id);
        assert!(!first.email_verified);
        assert!(first.verification_token_expires.unwrap() > Utc::now() + Duration::hours(23));

        wait_for_mail(&mailer, 2).await;
        let mail = &mailer.sent()[0];
        assert_eq!(mail.kind, MailKind::Verification);
        let token = first.verification_token.unwrap();
        assert!(mail
            .html
            .contains(&format!("https://gameverse.example/#/verify-email/{}", token)));
    }

    #[tokio::test]
    async fn register_rejects_duplicates() {
        let (store, manager) = manager_with(Arc::new(MemoryMailer::new()));
        manager.register(request("a@test.com", "alice")).await.unwrap();

        let err = manager
            .register(request("a@test.com", "other"))
            .await
            .unwrap_err();
        assert!(matches!(err, GameVerseError::AlreadyExists(_)));
        let err = manager
            .register(request("other@test.com", "alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, GameVerseError::AlreadyExists(_)));
        assert_eq!(store.user_count().await, 1);
    }

    #[tokio::test]
    async fn register_requires_all_fields() {
        let (_, manager) = manager_with(Arc::new(MemoryMailer::new()));
        let mut req = request("a@test.com", "alice");
        req.password = None;
        let err = manager.register(req).await.unwrap_err();
        assert!(matches!(err, GameVerseError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn register_survives_mail_failure() {
        let (_, manager) = manager_with(Arc::new(MemoryMailer::failing()));
        let user = manager.register(request("a@test.com", "alice")).await.unwrap();
        assert_eq!(user.username, "alice");
    }

    #[tokio::test]
    async fn profile_hides_secrets() {
        let (_, manager) = manager_with(Arc::new(MemoryMailer::new()));
        let user = manager.register(request("a@test.com", "alice")).await.unwrap();
        let profile = manager.profile(user.user_id).await.unwrap();
        let value = serde_json::to_value(&profile).unwrap();
        assert!(value.get("pass").is_none());
        assert!(value.get("verificationToken").is_none());
        assert_eq!(value["emailVerified"], false);

        let err = manager.profile(999).await.unwrap_err();
        assert!(matches!(err, GameVerseError::NotFound(_)));
    }
}
