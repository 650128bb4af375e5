mod app;

use app::{app_router, AppState, Environment};
use dotenvy::dotenv;
use gameverse_core::mail::{LogMailer, Mailer, SmtpConfig, SmtpMailer};
use gameverse_core::store::{resolve_database_name, DEFAULT_MONGO_URI};
use gameverse_core::{
    AccountManager, Catalog, GameStore, MemoryStore, MongoStore, TokenSecrets, UserStore,
};
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_PORT: u16 = 5001;
const DEFAULT_FRONTEND_URL: &str = "http://localhost:5173";
const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:3001",
    "http://localhost:5173",
    "https://game-verse-frontend.vercel.app",
    "https://gameverse.nassimmanseur.fr",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StoreKind {
    Mongo,
    /// 进程内存储，重启即丢失
    Memory,
}

#[derive(Debug, Clone)]
struct ApiConfig {
    bind: SocketAddr,
    environment: Environment,
    store: StoreKind,
    mongo_uri: String,
    db_name: String,
    /// access token 签名密钥
    access_secret: String,
    /// refresh token 签名密钥
    refresh_secret: String,
    /// refreshToken cookie 签名密钥
    cookie_secret: String,
    /// 未配置时使用只写日志的 mailer
    smtp: Option<SmtpConfig>,
    frontend_url: String,
    /// CORS 允许的来源列表（空则允许所有）
    cors_origins: Vec<String>,
    /// 前置反向代理层数（限流取客户端 IP 用），未设置时沿用默认值
    trusted_proxies: Option<usize>,
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// 未配置的密钥每次启动随机生成（重启后已签发的 token / cookie 全部失效）
fn secret_or_random(names: &[&str]) -> String {
    names
        .iter()
        .find_map(|name| non_empty_var(name))
        .unwrap_or_else(|| {
            warn!("{} not set; generating a random secret for this run", names[0]);
            uuid::Uuid::new_v4().to_string()
        })
}

impl ApiConfig {
    fn from_env() -> Self {
        let bind = non_empty_var("GV_BIND")
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| {
                let port = non_empty_var("PORT")
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(DEFAULT_PORT);
                SocketAddr::from(([0, 0, 0, 0], port))
            });

        let environment = non_empty_var("GV_ENV")
            .or_else(|| non_empty_var("NODE_ENV"))
            .map(|e| Environment::parse(&e))
            .unwrap_or_default();

        let store = match non_empty_var("GV_STORE").as_deref() {
            Some(kind) if kind.eq_ignore_ascii_case("memory") => StoreKind::Memory,
            _ => StoreKind::Mongo,
        };

        let mongo_uri = non_empty_var("MONGO_URI").unwrap_or_else(|| DEFAULT_MONGO_URI.into());
        let db_name = resolve_database_name(non_empty_var("GV_DB_NAME").as_deref(), &mongo_uri);

        // ACCES_JWT_SECRET 是旧部署中使用的拼写
        let access_secret = secret_or_random(&["ACCESS_JWT_SECRET", "ACCES_JWT_SECRET"]);
        let refresh_secret = secret_or_random(&["REFRESH_JWT_SECRET"]);
        let cookie_secret = secret_or_random(&["COOKIE_SECRET"]);

        let smtp = match (
            non_empty_var("EMAIL_HOST"),
            non_empty_var("EMAIL_USER"),
            non_empty_var("EMAIL_PASS"),
        ) {
            (Some(host), Some(user), Some(password)) => Some(SmtpConfig {
                host,
                port: non_empty_var("EMAIL_PORT")
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(587),
                user,
                password,
                sender_name: "GameVerse".into(),
            }),
            _ => None,
        };

        let frontend_url =
            non_empty_var("FRONTEND_URL").unwrap_or_else(|| DEFAULT_FRONTEND_URL.into());

        // CORS 允许的来源，逗号分隔；"*" 表示允许所有
        let cors_origins = match non_empty_var("GV_CORS_ORIGINS") {
            Some(s) if s == "*" => vec![],
            Some(s) => s
                .split(',')
                .filter(|t| !t.trim().is_empty())
                .map(|t| t.trim().to_string())
                .collect(),
            None => DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect(),
        };

        Self {
            bind,
            environment,
            store,
            mongo_uri,
            db_name,
            access_secret,
            refresh_secret,
            cookie_secret,
            smtp,
            frontend_url,
            cors_origins,
            trusted_proxies: non_empty_var("GV_TRUSTED_PROXIES").and_then(|n| n.parse().ok()),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 优先读取 .env（若存在）
    let _ = dotenv();
    init_tracing();

    let config = ApiConfig::from_env();
    info!(
        bind = %config.bind,
        environment = ?config.environment,
        store = ?config.store,
        "starting API"
    );

    let (games, users): (Arc<dyn GameStore>, Arc<dyn UserStore>) = match config.store {
        StoreKind::Mongo => {
            let store = Arc::new(MongoStore::connect(&config.mongo_uri, &config.db_name).await?);
            (store.clone() as Arc<dyn GameStore>, store as Arc<dyn UserStore>)
        }
        StoreKind::Memory => {
            warn!("using in-memory store; data is lost on restart");
            let store = Arc::new(MemoryStore::new());
            (store.clone() as Arc<dyn GameStore>, store as Arc<dyn UserStore>)
        }
    };

    let mailer: Arc<dyn Mailer> = match &config.smtp {
        Some(smtp) => {
            info!(host = %smtp.host, port = smtp.port, "SMTP mailer configured");
            Arc::new(SmtpMailer::new(smtp)?)
        }
        None => {
            warn!("EMAIL_HOST / EMAIL_USER / EMAIL_PASS not set; emails will only be logged");
            Arc::new(LogMailer)
        }
    };

    let accounts = AccountManager::new(
        users,
        mailer,
        TokenSecrets {
            access: config.access_secret.clone(),
            refresh: config.refresh_secret.clone(),
        },
    )
    .with_frontend_url(&config.frontend_url)?;

    let mut state = AppState::new(
        accounts,
        Catalog::new(games),
        &config.cookie_secret,
        config.environment,
    );
    if let Some(hops) = config.trusted_proxies {
        state = state.with_trusted_proxies(hops);
    }

    let app = app_router(state, config.cors_origins.clone());
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!("listening on {}", config.bind);
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await?;

    Ok(())
}

fn init_tracing() {
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    let filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
