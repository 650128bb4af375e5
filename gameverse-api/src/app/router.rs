use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    game_filters, get_game, handler_404, health, list_games, login, logout, me, popular_games,
    random_genres, register, resend_verification, status, toggle_library, verify_email,
};
use super::middleware::{expose_internal_errors, general_rate_limit, security_headers};
use super::state::AppState;

/// JSON 请求体上限
const BODY_LIMIT: usize = 10 * 1024 * 1024;

/// 根据配置的来源列表构建 CorsLayer
fn build_cors_layer(cors_origins: Vec<String>) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-requested-with"),
            header::ACCEPT,
            header::ORIGIN,
        ])
        .allow_credentials(true);

    if cors_origins.is_empty() {
        tracing::warn!(
            "GV_CORS_ORIGINS is empty, allowing all origins without credentials. \
             Set GV_CORS_ORIGINS so the refresh cookie can be sent cross-site."
        );
        base.allow_origin(AllowOrigin::any())
            .allow_credentials(false) // any() 不能与 credentials(true) 共用
    } else {
        let origins: Vec<HeaderValue> = cors_origins
            .into_iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        base.allow_origin(origins)
    }
}

/// Build the router with routes and middleware wired.
pub fn app_router(state: AppState, cors_origins: Vec<String>) -> Router {
    // 认证端点：登录 / 注册 / 重发各自在 handler 中限流
    let auth_routes = Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login_process", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/status", get(status))
        .route("/auth/verify-email/:token", get(verify_email))
        .route("/auth/resend-verification", post(resend_verification));

    // 用户与目录端点（通用限流）
    let limited_routes = Router::new()
        .route("/user/me", get(me))
        .route("/user/library/toggle", post(toggle_library))
        .route("/games", get(list_games))
        .route("/games/search", get(list_games))
        .route("/games/category", get(list_games))
        .route("/games/popular", get(popular_games))
        .route("/games/filters", get(game_filters))
        .route("/games/random-genres", get(random_genres))
        .route("/games/:id", get(get_game))
        .route_layer(from_fn_with_state(state.clone(), general_rate_limit));

    let mut router = Router::new()
        .route("/health", get(health))
        .merge(auth_routes)
        .merge(limited_routes)
        .fallback(handler_404);

    if !state.environment.is_production() {
        router = router.layer(from_fn(expose_internal_errors));
    }

    router
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(from_fn_with_state(state.clone(), security_headers))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(cors_origins))
        .with_state(state)
}
