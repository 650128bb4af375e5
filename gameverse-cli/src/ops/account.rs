//! 账户相关的 CLI 操作（经由 HTTP API）

use super::ui::{print_header, print_hint, print_kv, print_success};
use super::{print_json, OutputFormat};
use crate::client::handle_error;
use gameverse_core::UserProfile;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
struct LoginResponse {
    data: String,
}

#[derive(Debug, Deserialize)]
struct ToggleResponse {
    message: String,
    game_list: Vec<i64>,
}

/// 登录并打印 access token
pub async fn login(
    client: &Client,
    base: &str,
    email: &str,
    password: &str,
    output: OutputFormat,
) -> anyhow::Result<String> {
    let resp = client
        .post(format!("{}/auth/login_process", base))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await?;
    let body: LoginResponse = handle_error(resp).await?.json().await?;

    match output {
        OutputFormat::Json => print_json(&json!({ "accessToken": body.data }))?,
        OutputFormat::Table => {
            print_header("🔐 Logged in");
            print_kv("Access Token", &body.data);
            println!();
            print_hint("export GV_TOKEN=<access token> to reuse it");
        }
    }
    Ok(body.data)
}

pub async fn me(client: &Client, base: &str, output: OutputFormat) -> anyhow::Result<()> {
    let resp = client.get(format!("{}/user/me", base)).send().await?;
    let profile: UserProfile = handle_error(resp).await?.json().await?;

    match output {
        OutputFormat::Json => print_json(&profile)?,
        OutputFormat::Table => {
            print_header(&format!("👤 {}", profile.username));
            print_kv("User ID", &profile.user_id.to_string());
            print_kv("Email", &profile.email);
            print_kv(
                "Verified",
                if profile.email_verified { "yes" } else { "no" },
            );
            if let Some(bio) = &profile.bio {
                print_kv("Bio", bio);
            }
            let games = profile
                .game_list
                .iter()
                .map(i64::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            print_kv("Library", if games.is_empty() { "-" } else { &games });
        }
    }
    Ok(())
}

/// 切换游戏是否在个人游戏库中
pub async fn toggle(
    client: &Client,
    base: &str,
    game_id: i64,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let resp = client
        .post(format!("{}/user/library/toggle", base))
        .json(&json!({ "gameId": game_id }))
        .send()
        .await?;
    let body: Value = handle_error(resp).await?.json().await?;

    match output {
        OutputFormat::Json => print_json(&body)?,
        OutputFormat::Table => {
            let body: ToggleResponse = serde_json::from_value(body)?;
            print_success(&body.message);
            print_kv("Library size", &body.game_list.len().to_string());
        }
    }
    Ok(())
}
