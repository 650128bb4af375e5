use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use gameverse_core::{AccountManager, Catalog};
use sha2::{Digest, Sha512};
use std::sync::Arc;

use super::rate_limit::{RateLimiter, RATE_LIMIT_WINDOW};

/// 默认部署在一层反向代理之后
pub const DEFAULT_TRUSTED_PROXIES: usize = 1;

/// 运行环境
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("production") {
            Environment::Production
        } else {
            Environment::Development
        }
    }

    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

/// Shared application state for handlers.
#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<AccountManager>,
    pub catalog: Arc<Catalog>,
    /// refreshToken cookie 的签名密钥
    pub cookie_key: Key,
    pub environment: Environment,
    /// /user 与 /games 的通用限流（按 IP）
    pub general_limiter: Arc<RateLimiter>,
    /// 登录失败限流（按 IP，只统计失败）
    pub login_limiter: Arc<RateLimiter>,
    /// 注册失败限流（按 IP，只统计失败）
    pub register_limiter: Arc<RateLimiter>,
    /// 重发验证邮件限流（按 IP）
    pub resend_limiter: Arc<RateLimiter>,
    /// 前置反向代理的层数，决定从 X-Forwarded-For 右侧取第几个地址
    pub trusted_proxies: usize,
}

impl AppState {
    pub fn new(
        accounts: AccountManager,
        catalog: Catalog,
        cookie_secret: &str,
        environment: Environment,
    ) -> Self {
        Self {
            accounts: Arc::new(accounts),
            catalog: Arc::new(catalog),
            cookie_key: cookie_key(cookie_secret),
            environment,
            general_limiter: Arc::new(RateLimiter::new(100, RATE_LIMIT_WINDOW)),
            login_limiter: Arc::new(RateLimiter::new(5, RATE_LIMIT_WINDOW)),
            register_limiter: Arc::new(RateLimiter::new(20, RATE_LIMIT_WINDOW)),
            resend_limiter: Arc::new(RateLimiter::new(3, RATE_LIMIT_WINDOW)),
            trusted_proxies: DEFAULT_TRUSTED_PROXIES,
        }
    }

    pub fn with_trusted_proxies(mut self, hops: usize) -> Self {
        self.trusted_proxies = hops;
        self
    }
}

/// 任意长度的密钥经 SHA-512 扩展为 64 字节签名密钥
fn cookie_key(secret: &str) -> Key {
    let digest = Sha512::digest(secret.as_bytes());
    Key::from(digest.as_slice())
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}
