mod client;
mod ops;

use clap::{Parser, Subcommand};
use gameverse_core::store::{resolve_database_name, DEFAULT_MONGO_URI};
use gameverse_core::MongoStore;
use ops::{
    cleanup_users, list_games, login, me, seed_games, seed_user, toggle, GameSearch,
    OutputFormat,
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// GameVerse 命令行工具：数据库维护 + HTTP API 调用
#[derive(Parser)]
#[command(
    name = "gameverse-cli",
    author,
    version,
    about = "CLI for the GameVerse API"
)]
struct Cli {
    /// API base url
    #[arg(long, env = "GV_API_BASE", default_value = "http://127.0.0.1:5001")]
    api_base: String,

    /// Bearer token for authentication
    #[arg(long, env = "GV_TOKEN")]
    token: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    output: OutputFormat,

    /// MongoDB 连接串（seed / seed-user / cleanup-users 使用）
    #[arg(long, env = "MONGO_URI", default_value = DEFAULT_MONGO_URI)]
    mongo_uri: String,

    /// 数据库名；未指定时取连接串中的库名，与 API 服务一致
    #[arg(long, env = "GV_DB_NAME")]
    db_name: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    // ==================== 数据库维护 ====================
    /// 用 JSON 文件替换整个游戏目录
    Seed {
        /// `{"games": [...]}` 或 `[...]`
        #[arg(long, short)]
        file: PathBuf,
    },
    /// 创建已验证的测试用户
    SeedUser,
    /// 删除所有用户
    CleanupUsers,

    // ==================== API ====================
    /// 登录，获取 access token
    Login {
        #[arg(long, short)]
        email: String,
        #[arg(long, short)]
        password: String,
    },
    /// 当前用户资料
    Me,
    /// 浏览游戏目录
    Games {
        /// 标题关键字
        #[arg(long)]
        q: Option<String>,
        /// 类型（可重复）
        #[arg(long = "genre")]
        genres: Vec<String>,
        /// 平台（可重复）
        #[arg(long = "platform")]
        platforms: Vec<String>,
        #[arg(long)]
        page: Option<u64>,
        #[arg(long)]
        limit: Option<u64>,
    },
    /// 将游戏加入或移出个人游戏库
    Toggle { game_id: i64 },
}

/// 库名解析规则与 API 服务相同
async fn connect_store(mongo_uri: &str, db_name: Option<&str>) -> anyhow::Result<MongoStore> {
    let db_name = resolve_database_name(db_name, mongo_uri);
    tracing::debug!(database = %db_name, "connecting to MongoDB");
    Ok(MongoStore::connect(mongo_uri, &db_name).await?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载 .env 文件（如果存在），忽略错误
    let _ = dotenvy::dotenv();
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        // 数据库命令
        Commands::Seed { file } => {
            let store = connect_store(&cli.mongo_uri, cli.db_name.as_deref()).await?;
            seed_games(store, &file, cli.output).await?
        }
        Commands::SeedUser => {
            let store = connect_store(&cli.mongo_uri, cli.db_name.as_deref()).await?;
            seed_user(store, cli.output).await?
        }
        Commands::CleanupUsers => {
            let store = connect_store(&cli.mongo_uri, cli.db_name.as_deref()).await?;
            cleanup_users(store, cli.output).await?
        }

        // API 命令
        Commands::Login { email, password } => {
            let client = client::build_client(&None)?;
            login(&client, &cli.api_base, &email, &password, cli.output).await?;
        }
        Commands::Me => {
            let client = client::build_client(&cli.token)?;
            me(&client, &cli.api_base, cli.output).await?
        }
        Commands::Games {
            q,
            genres,
            platforms,
            page,
            limit,
        } => {
            let client = client::build_client(&cli.token)?;
            let search = GameSearch {
                q,
                genres,
                platforms,
                page,
                limit,
            };
            list_games(&client, &cli.api_base, &search, cli.output).await?
        }
        Commands::Toggle { game_id } => {
            let client = client::build_client(&cli.token)?;
            toggle(&client, &cli.api_base, game_id, cli.output).await?
        }
    }

    Ok(())
}

fn init_tracing() {
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    let filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into());
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
