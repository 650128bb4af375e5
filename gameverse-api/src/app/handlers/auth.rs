//! 认证相关 API handlers

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use axum_extra::extract::cookie::{Cookie, SameSite, SignedCookieJar};
use gameverse_core::{LoginRequest, RegisterRequest, VerificationOutcome};
use serde::Deserialize;
use serde_json::{json, Value};

use super::super::error::ApiError;
use super::super::middleware::{AuthUser, ClientIp};
use super::super::state::AppState;

/// refresh token 所在的 cookie 名
pub const REFRESH_COOKIE: &str = "refreshToken";

#[derive(Debug, Default, Deserialize)]
pub struct ResendRequest {
    #[serde(default, alias = "user_email")]
    pub email: Option<String>,
}

/// refreshToken cookie 的公共属性；设置与清除必须一致，浏览器才会覆盖同一个 cookie
fn base_refresh_cookie(state: &AppState, value: String) -> Cookie<'static> {
    let production = state.environment.is_production();
    Cookie::build((REFRESH_COOKIE, value))
        .path("/")
        .http_only(true)
        .secure(production)
        .same_site(if production { SameSite::None } else { SameSite::Lax })
        .build()
}

fn refresh_cookie(state: &AppState, token: String) -> Cookie<'static> {
    let mut cookie = base_refresh_cookie(state, token);
    cookie.set_max_age(time::Duration::seconds(state.accounts.refresh_token_ttl()));
    cookie
}

/// 立即过期的同名 cookie
fn removal_cookie(state: &AppState) -> Cookie<'static> {
    let mut cookie = base_refresh_cookie(state, String::new());
    cookie.set_max_age(time::Duration::ZERO);
    cookie.set_expires(time::OffsetDateTime::UNIX_EPOCH);
    cookie
}

/// POST /auth/register - 注册，验证邮件在后台发送
pub async fn register(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if !state.register_limiter.check(&ip).await {
        return Err(ApiError::too_many_requests(
            "Trop de tentatives d'inscription, réessayez dans 15 minutes",
        ));
    }

    let result = async {
        let Json(req) = body?;
        state.accounts.register(req).await?;
        Ok::<_, ApiError>(())
    }
    .await;

    if let Err(e) = result {
        state.register_limiter.record(&ip).await;
        return Err(e);
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Compte créé ! Un email de vérification a été envoyé (vérifiez vos spams). Si vous ne le recevez pas, contactez le support.",
            "emailSent": true,
        })),
    ))
}

/// POST /auth/login_process - 登录，access token 在响应体，refresh token 写入签名 cookie
pub async fn login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    jar: SignedCookieJar,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(SignedCookieJar, Json<Value>), ApiError> {
    if !state.login_limiter.check(&ip).await {
        return Err(ApiError::too_many_requests(
            "Trop de tentatives de connexion, réessayez dans 15 minutes",
        ));
    }

    let result = async {
        let Json(req) = body?;
        Ok::<_, ApiError>(state.accounts.login(req).await?)
    }
    .await;

    let tokens = match result {
        Ok(tokens) => tokens,
        Err(e) => {
            state.login_limiter.record(&ip).await;
            return Err(e);
        }
    };

    let jar = jar.add(refresh_cookie(&state, tokens.refresh_token));
    Ok((jar, Json(json!({ "data": tokens.access_token }))))
}

/// POST /auth/logout - 清除 refresh cookie（请求未携带 cookie 时同样下发）
pub async fn logout(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> impl IntoResponse {
    tracing::info!(user_id = claims.user_id, "user logged out");
    (
        [(header::SET_COOKIE, removal_cookie(&state).to_string())],
        Json(json!({ "message": "Logged out", "removeAccessToken": true })),
    )
}

/// GET /auth/status - 用 refresh cookie 换取新的 access token
pub async fn status(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> Result<Json<Value>, ApiError> {
    // 签名校验失败的 cookie 在这里就是 None
    let Some(cookie) = jar.get(REFRESH_COOKIE) else {
        return Ok(Json(json!({ "isConnected": false })));
    };

    match state.accounts.refresh_session(cookie.value()).await? {
        Some(access_token) => Ok(Json(json!({
            "isConnected": true,
            "newAccessToken": access_token,
        }))),
        None => Ok(Json(json!({ "isConnected": false }))),
    }
}

/// GET /auth/verify-email/:token
pub async fn verify_email(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let body = match state.accounts.verify_email(&token).await? {
        VerificationOutcome::Verified => json!({
            "message": "Email verified successfully. You can now login.",
            "verified": true,
        }),
        VerificationOutcome::AlreadyVerified => json!({
            "message": "Email already verified successfully. You can now login.",
            "verified": true,
            "alreadyVerified": true,
        }),
    };
    Ok(Json(body))
}

/// POST /auth/resend-verification
pub async fn resend_verification(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    body: Result<Json<ResendRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    if !state.resend_limiter.allow(&ip).await {
        return Err(ApiError::too_many_requests(
            "Trop de demandes de renvoi, réessayez dans 15 minutes",
        ));
    }

    let Json(req) = body?;
    state
        .accounts
        .resend_verification(req.email.as_deref())
        .await?;

    Ok(Json(json!({
        "message": "Verification email resent successfully",
        "emailSent": true,
    })))
}
