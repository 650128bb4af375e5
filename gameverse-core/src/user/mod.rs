//! 用户账户：注册、认证、邮箱验证与个人游戏库

mod auth;
mod crypto;
mod library;
mod manager;
mod models;
mod verification;

pub use crypto::{generate_verification_token, hash_password, verify_password};
pub use manager::{AccountManager, TokenSecrets, DEFAULT_HASH_COST};
pub use models::{
    AccessClaims, LibraryAction, LibraryToggle, LoginRequest, RefreshClaims, RegisterRequest,
    SessionTokens, User, UserProfile, VerificationOutcome,
};
