use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;

use axum::body::Body;
use axum::extract::{ConnectInfo, FromRequestParts, State};
use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::http::request::Parts;
use axum::http::{Extensions, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use gameverse_core::AccessClaims;
use serde_json::json;

use super::error::{ApiError, InternalErrorDetail};
use super::state::AppState;

/// 已认证用户：校验 `Authorization: Bearer <token>` 后得到的 access token claims
#[derive(Debug, Clone)]
pub struct AuthUser(pub AccessClaims);

impl FromRequestParts<AppState> for AuthUser {
	type Rejection = ApiError;

	fn from_request_parts<'a, 'b, 'c>(
		parts: &'a mut Parts,
		state: &'b AppState,
	) -> Pin<Box<dyn Future<Output = Result<Self, Self::Rejection>> + Send + 'c>>
	where
		'a: 'c,
		'b: 'c,
	{
		Box::pin(async move {
			let authorization = parts
				.headers
				.get(header::AUTHORIZATION)
				.ok_or_else(ApiError::unauthorized)?;

			// 非 Bearer 方案视同未携带凭证
			let token = authorization
				.to_str()
				.ok()
				.and_then(bearer_token)
				.ok_or_else(ApiError::unauthorized)?;

			let claims = state.accounts.verify_access_token(token).map_err(|e| {
				tracing::debug!(error = %e, "access token rejected");
				ApiError::unauthorized_with_message("Invalid or Expired Token")
			})?;
			Ok(AuthUser(claims))
		})
	}
}

fn bearer_token(value: &str) -> Option<&str> {
	value
		.strip_prefix("Bearer ")
		.map(str::trim)
		.filter(|token| !token.is_empty())
}

/// 客户端 IP，用作限流 key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl FromRequestParts<AppState> for ClientIp {
	type Rejection = Infallible;

	fn from_request_parts<'a, 'b, 'c>(
		parts: &'a mut Parts,
		state: &'b AppState,
	) -> Pin<Box<dyn Future<Output = Result<Self, Self::Rejection>> + Send + 'c>>
	where
		'a: 'c,
		'b: 'c,
	{
		Box::pin(async move {
			Ok(ClientIp(client_ip(
				&parts.headers,
				&parts.extensions,
				state.trusted_proxies,
			)))
		})
	}
}

/// 从请求中提取客户端 IP
///
/// 地址链为 X-Forwarded-For 各项加上 socket 地址。最右侧的 `trusted_proxies`
/// 跳由我们自己的代理写入，再往左的内容客户端可以任意伪造，因此从右往左
/// 跳过这些代理后取第一个地址；链不够长时取最左侧。
fn client_ip(headers: &HeaderMap, extensions: &Extensions, trusted_proxies: usize) -> String {
	let socket = extensions
		.get::<ConnectInfo<SocketAddr>>()
		.map(|ci| ci.0.ip().to_string())
		.unwrap_or_else(|| "unknown".to_string());

	let mut chain: Vec<String> = headers
		.get_all("X-Forwarded-For")
		.iter()
		.filter_map(|v| v.to_str().ok())
		.flat_map(|v| v.split(','))
		.map(str::trim)
		.filter(|s| !s.is_empty())
		.map(str::to_string)
		.collect();
	chain.push(socket);

	let index = chain.len().saturating_sub(1 + trusted_proxies);
	chain.swap_remove(index)
}

/// /user 与 /games 的通用限流
pub async fn general_rate_limit(
	State(state): State<AppState>,
	request: Request<Body>,
	next: Next,
) -> Result<Response, ApiError> {
	let ip = client_ip(request.headers(), request.extensions(), state.trusted_proxies);
	if !state.general_limiter.allow(&ip).await {
		tracing::warn!(ip = %ip, path = %request.uri().path(), "general rate limit hit");
		return Err(ApiError::too_many_requests(
			"Trop de requêtes, réessayez dans 15 minutes",
		));
	}
	Ok(next.run(request).await)
}

/// 为所有响应添加安全相关的 header；HSTS 只在生产环境开启
pub async fn security_headers(
	State(state): State<AppState>,
	request: Request<Body>,
	next: Next,
) -> Response {
	let mut response = next.run(request).await;
	let headers = response.headers_mut();

	let mut defaults = vec![
		(header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
		(header::X_FRAME_OPTIONS, "SAMEORIGIN"),
		(header::REFERRER_POLICY, "no-referrer"),
		(HeaderName::from_static("cross-origin-opener-policy"), "same-origin"),
		(header::X_DNS_PREFETCH_CONTROL, "off"),
	];
	if state.environment.is_production() {
		defaults.push((
			header::STRICT_TRANSPORT_SECURITY,
			"max-age=31536000; includeSubDomains",
		));
	}

	for (name, value) in defaults {
		headers
			.entry(name)
			.or_insert(HeaderValue::from_static(value));
	}
	response
}

/// 开发环境：把 500 响应中隐藏的原始错误信息写回响应体
pub async fn expose_internal_errors(request: Request<Body>, next: Next) -> Response {
	let response = next.run(request).await;
	let Some(detail) = response.extensions().get::<InternalErrorDetail>().cloned() else {
		return response;
	};

	let status = response.status();
	let (mut parts, _) = response.into_parts();
	let body = Json(json!({
		"message": detail.0,
		"status": status.as_u16(),
		"timestamp": chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
	}));
	parts.headers.remove(header::CONTENT_LENGTH);
	let rebuilt = body.into_response();
	Response::from_parts(parts, rebuilt.into_body())
}
