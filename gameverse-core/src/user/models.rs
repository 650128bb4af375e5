//! 用户数据模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

/// 用户账户（存储模型，包含密码哈希与验证 token）
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// 顺序分配的数字 ID
    pub user_id: i64,
    /// 用户名（唯一）
    pub username: String,
    /// 邮箱（唯一，用于登录）
    pub email: String,
    /// bcrypt 哈希后的密码
    #[serde(rename = "pass")]
    pub password_hash: String,
    pub profile_picture: Option<String>,
    pub bio: Option<String>,
    /// 收藏的游戏 ID，每个 ID 至多出现一次
    #[serde(default)]
    pub game_list: Vec<i64>,
    #[serde(rename = "emailVerified", default)]
    pub email_verified: bool,
    #[serde(rename = "verificationToken")]
    pub verification_token: Option<String>,
    #[serde(rename = "verificationTokenExpires", default, with = "crate::models::bson_date")]
    pub verification_token_expires: Option<DateTime<Utc>>,
    /// 激活账户时消费掉的验证 token
    #[serde(rename = "verifiedWithToken")]
    pub verified_with_token: Option<String>,
    #[serde(rename = "lastVerificationEmailSent", default, with = "crate::models::bson_date")]
    pub last_verification_email_sent: Option<DateTime<Utc>>,
    #[serde(rename = "resetPasswordToken")]
    pub reset_password_token: Option<String>,
    #[serde(rename = "resetPasswordExpires", default, with = "crate::models::bson_date")]
    pub reset_password_expires: Option<DateTime<Utc>>,
    #[serde(rename = "createdAt", default, with = "crate::models::bson_date")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "updatedAt", default, with = "crate::models::bson_date")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// 对外展示的用户资料（不含密码与 token）
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub profile_picture: Option<String>,
    pub bio: Option<String>,
    pub game_list: Vec<i64>,
    #[serde(rename = "emailVerified")]
    pub email_verified: bool,
    #[serde(rename = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "updatedAt")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            user_id: user.user_id,
            username: user.username,
            email: user.email,
            profile_picture: user.profile_picture,
            bio: user.bio,
            game_list: user.game_list,
            email_verified: user.email_verified,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// 注册请求（兼容旧字段名 user_email / user_username / user_pass）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterRequest {
    #[serde(default, alias = "user_email")]
    pub email: Option<String>,
    #[serde(default, alias = "user_username")]
    pub username: Option<String>,
    #[serde(default, alias = "user_pass")]
    pub password: Option<String>,
}

/// 登录请求
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default, alias = "user_email")]
    pub email: Option<String>,
    #[serde(default, alias = "user_pass")]
    pub password: Option<String>,
}

/// Access token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    pub iat: i64,
    pub exp: i64,
}

/// Refresh token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub user_id: i64,
    pub iat: i64,
    pub exp: i64,
}

/// 登录成功后签发的一对 token
#[derive(Debug, Clone)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
    /// Refresh token 有效期（秒），用于 cookie max-age
    pub refresh_ttl: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryAction {
    Added,
    Removed,
}

/// 收藏切换结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryToggle {
    pub action: LibraryAction,
    pub game_list: Vec<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    Verified,
    /// 该 token 之前已经激活过账户
    AlreadyVerified,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{self, doc};

    #[test]
    fn user_reads_mongoose_documents() {
        let now = bson::DateTime::now();
        let stored = doc! {
            "user_id": 7,
            "username": "alice",
            "email": "alice@test.com",
            "pass": "$2b$10$hash",
            "game_list": [3, 5],
            "emailVerified": false,
            "verificationToken": "abc",
            "verificationTokenExpires": now,
            "createdAt": now,
            "updatedAt": now,
        };
        let user: User = bson::from_document(stored).unwrap();
        assert_eq!(
            user.verification_token_expires.map(|d| d.timestamp_millis()),
            Some(now.timestamp_millis())
        );
        assert_eq!(user.last_verification_email_sent, None);
        assert_eq!(user.game_list, vec![3, 5]);

        let raw = bson::to_raw_document_buf(&user).unwrap();
        assert!(raw.get_datetime("createdAt").is_ok());
        assert!(raw.get("lastVerificationEmailSent").unwrap().is_none());
    }
}
