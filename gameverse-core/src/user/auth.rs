//! JWT 认证：登录、签发 token、校验、基于 refresh token 的会话续期

use super::crypto::verify_password;
use super::models::*;
use super::AccountManager;
use crate::error::{GameVerseError, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tracing::{debug, info, instrument, warn};

impl AccountManager {
    /// 用户登录：校验密码与邮箱验证状态，签发 access + refresh token
    #[instrument(skip(self, req))]
    pub async fn login(&self, req: LoginRequest) -> Result<SessionTokens> {
        let (Some(email), Some(password)) = (
            Self::required(&req.email),
            req.password.as_deref().filter(|p| !p.is_empty()),
        ) else {
            return Err(GameVerseError::InvalidInput(
                "Email and password required".into(),
            ));
        };

        let user = self
            .users
            .find_user_by_email(email)
            .await?
            .ok_or_else(|| GameVerseError::Unauthorized("Invalid credentials".into()))?;

        if !verify_password(password, &user.password_hash).await? {
            warn!(user_id = user.user_id, "login failed: invalid password");
            return Err(GameVerseError::Unauthorized("Invalid credentials".into()));
        }

        if !user.email_verified {
            return Err(GameVerseError::EmailNotVerified);
        }

        info!(user_id = user.user_id, "user logged in");
        Ok(SessionTokens {
            access_token: self.issue_access_token(&user)?,
            refresh_token: self.issue_refresh_token(&user)?,
            refresh_ttl: self.refresh_token_ttl,
        })
    }

    /// 签发 access token
    pub fn issue_access_token(&self, user: &User) -> Result<String> {
        let now = Utc::now();
        let claims = AccessClaims {
            user_id: user.user_id,
            username: user.username.clone(),
            email: user.email.clone(),
            created_at: user.created_at,
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.access_token_ttl)).timestamp(),
        };
        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secrets.access.as_bytes()),
        )?)
    }

    /// 签发 refresh token
    pub fn issue_refresh_token(&self, user: &User) -> Result<String> {
        let now = Utc::now();
        let claims = RefreshClaims {
            user_id: user.user_id,
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.refresh_token_ttl)).timestamp(),
        };
        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secrets.refresh.as_bytes()),
        )?)
    }

    /// 校验 access token（签名与过期时间）
    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims> {
        let data = decode::<AccessClaims>(
            token,
            &DecodingKey::from_secret(self.secrets.access.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| GameVerseError::Unauthorized(format!("invalid token: {}", e)))?;
        Ok(data.claims)
    }

    /// 用 refresh token 换取新的 access token。
    ///
    /// token 无效或用户已不存在时返回 `Ok(None)`，只有存储错误才会向上传递。
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<Option<String>> {
        let claims = match decode::<RefreshClaims>(
            refresh_token,
            &DecodingKey::from_secret(self.secrets.refresh.as_bytes()),
            &Validation::new(Algorithm::HS256),
        ) {
            Ok(data) => data.claims,
            Err(e) => {
                debug!(error = %e, "refresh token rejected");
                return Ok(None);
            }
        };

        let Some(user) = self.users.find_user(claims.user_id).await? else {
            return Ok(None);
        };
        Ok(Some(self.issue_access_token(&user)?))
    }
}

#[cfg(test)]
mod tests {
    use super::super::manager::tests::{manager_with, request};
    use super::*;
    use crate::mail::MemoryMailer;
    use crate::store::UserStore;
    use std::sync::Arc;

    async fn verified_user(manager: &AccountManager, store: &dyn UserStore) -> User {
        let mut user = manager.register(request("a@test.com", "alice")).await.unwrap();
        user.email_verified = true;
        store.save_user(&user).await.unwrap();
        user
    }

    fn login_req(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: Some(email.into()),
            password: Some(password.into()),
        }
    }

    #[tokio::test]
    async fn unverified_login_is_rejected() {
        let (_, manager) = manager_with(Arc::new(MemoryMailer::new()));
        manager.register(request("a@test.com", "alice")).await.unwrap();
        let err = manager
            .login(login_req("a@test.com", "test123456"))
            .await
            .unwrap_err();
        assert!(matches!(err, GameVerseError::EmailNotVerified));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_are_unauthorized() {
        let (store, manager) = manager_with(Arc::new(MemoryMailer::new()));
        verified_user(&manager, store.as_ref()).await;

        let err = manager.login(login_req("a@test.com", "nope")).await.unwrap_err();
        assert!(matches!(err, GameVerseError::Unauthorized(_)));
        let err = manager
            .login(login_req("x@test.com", "test123456"))
            .await
            .unwrap_err();
        assert!(matches!(err, GameVerseError::Unauthorized(_)));
        let err = manager
            .login(LoginRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GameVerseError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn login_trims_email_like_register() {
        let (store, manager) = manager_with(Arc::new(MemoryMailer::new()));
        let mut user = manager
            .register(request("  b@test.com ", "bob"))
            .await
            .unwrap();
        assert_eq!(user.email, "b@test.com");
        user.email_verified = true;
        store.save_user(&user).await.unwrap();

        let tokens = manager.login(login_req("  b@test.com ", "test123456")).await;
        assert!(tokens.is_ok());
        let err = manager.login(login_req("   ", "test123456")).await.unwrap_err();
        assert!(matches!(err, GameVerseError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn login_issues_verifiable_tokens() {
        let (store, manager) = manager_with(Arc::new(MemoryMailer::new()));
        let user = verified_user(&manager, store.as_ref()).await;

        let tokens = manager
            .login(login_req("a@test.com", "test123456"))
            .await
            .unwrap();
        let claims = manager.verify_access_token(&tokens.access_token).unwrap();
        assert_eq!(claims.user_id, user.user_id);
        assert_eq!(claims.email, "a@test.com");
        assert!(claims.exp - claims.iat == 15 * 60);

        // refresh token 不能当作 access token 使用（密钥不同）
        assert!(manager.verify_access_token(&tokens.refresh_token).is_err());

        let renewed = manager
            .refresh_session(&tokens.refresh_token)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            manager.verify_access_token(&renewed).unwrap().user_id,
            user.user_id
        );
    }

    #[tokio::test]
    async fn refresh_with_garbage_or_deleted_user_is_none() {
        let (store, manager) = manager_with(Arc::new(MemoryMailer::new()));
        assert!(manager.refresh_session("garbage").await.unwrap().is_none());

        let user = verified_user(&manager, store.as_ref()).await;
        let refresh = manager.issue_refresh_token(&user).unwrap();
        store.delete_all_users().await.unwrap();
        assert!(manager.refresh_session(&refresh).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_access_token_is_rejected() {
        let (store, manager) = manager_with(Arc::new(MemoryMailer::new()));
        let manager = manager.with_ttl(-3600, 60);
        let user = verified_user(&manager, store.as_ref()).await;
        let token = manager.issue_access_token(&user).unwrap();
        assert!(matches!(
            manager.verify_access_token(&token),
            Err(GameVerseError::Unauthorized(_))
        ));
    }
}
