//! 直接操作数据库的维护命令：导入游戏、创建测试用户、清空用户

use super::ui::{print_header, print_kv, print_success, print_warning};
use super::{print_json, OutputFormat};
use anyhow::Context;
use chrono::Utc;
use gameverse_core::user::{hash_password, DEFAULT_HASH_COST};
use gameverse_core::{Catalog, Game, MongoStore, User, UserStore};
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

pub const TEST_USER_EMAIL: &str = "test@test.com";
pub const TEST_USER_NAME: &str = "TestUser";
pub const TEST_USER_PASSWORD: &str = "test123456";

/// 导入文件：`{"games": [...]}` 或直接是数组
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SeedFile {
    Wrapped { games: Vec<Game> },
    Bare(Vec<Game>),
}

pub fn parse_seed_file(raw: &str) -> anyhow::Result<Vec<Game>> {
    let file: SeedFile = serde_json::from_str(raw).context("invalid games file")?;
    Ok(match file {
        SeedFile::Wrapped { games } => games,
        SeedFile::Bare(games) => games,
    })
}

/// 用文件内容替换整个游戏目录
pub async fn seed_games(store: MongoStore, file: &Path, output: OutputFormat) -> anyhow::Result<()> {
    let raw = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let games = parse_seed_file(&raw)?;
    tracing::info!(count = games.len(), file = %file.display(), "seeding games");

    let catalog = Catalog::new(Arc::new(store));
    let inserted = catalog.seed(games).await?;

    match output {
        OutputFormat::Json => print_json(&json!({ "inserted": inserted }))?,
        OutputFormat::Table => {
            print_header("🎮 Catalog seeded");
            print_kv("Inserted", &inserted.to_string());
        }
    }
    Ok(())
}

/// 创建已验证的测试用户（已存在则跳过）
pub async fn seed_user(store: MongoStore, output: OutputFormat) -> anyhow::Result<()> {
    if store.find_user_by_email(TEST_USER_EMAIL).await?.is_some() {
        match output {
            OutputFormat::Json => print_json(&json!({ "created": false }))?,
            OutputFormat::Table => {
                print_warning(&format!("Test user already exists: {}", TEST_USER_EMAIL))
            }
        }
        return Ok(());
    }

    let now = Utc::now();
    let user = User {
        user_id: store.next_user_id().await?,
        username: TEST_USER_NAME.into(),
        email: TEST_USER_EMAIL.into(),
        password_hash: hash_password(TEST_USER_PASSWORD, DEFAULT_HASH_COST).await?,
        profile_picture: Some("https://via.placeholder.com/150".into()),
        bio: Some("Test user for development".into()),
        game_list: Vec::new(),
        email_verified: true,
        verification_token: None,
        verification_token_expires: None,
        verified_with_token: None,
        last_verification_email_sent: None,
        reset_password_token: None,
        reset_password_expires: None,
        created_at: Some(now),
        updated_at: Some(now),
    };
    store.insert_user(&user).await?;

    match output {
        OutputFormat::Json => print_json(&json!({
            "created": true,
            "user_id": user.user_id,
            "email": TEST_USER_EMAIL,
        }))?,
        OutputFormat::Table => {
            print_success("Test user created");
            print_kv("Email", TEST_USER_EMAIL);
            print_kv("Password", TEST_USER_PASSWORD);
            print_kv("User ID", &user.user_id.to_string());
        }
    }
    Ok(())
}

/// 删除所有用户
pub async fn cleanup_users(store: MongoStore, output: OutputFormat) -> anyhow::Result<()> {
    let deleted = store.delete_all_users().await?;
    match output {
        OutputFormat::Json => print_json(&json!({ "deleted": deleted }))?,
        OutputFormat::Table => print_success(&format!("Deleted {} users", deleted)),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_file_accepts_both_shapes() {
        let wrapped = parse_seed_file(r#"{"games": [{"title": "Hades"}, {"title": "Celeste"}]}"#)
            .unwrap();
        assert_eq!(wrapped.len(), 2);
        assert_eq!(wrapped[1].title, "Celeste");

        let bare = parse_seed_file(r#"[{"title": "Hades", "genres": {"fr": ["Action"]}}]"#).unwrap();
        assert_eq!(bare[0].genres.fr, vec!["Action"]);

        assert!(parse_seed_file(r#"{"items": []}"#).is_err());
    }
}
