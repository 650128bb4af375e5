//! 目录浏览

use super::ui::{print_empty, print_kv, print_table_header, print_table_row, truncate};
use super::{print_json, OutputFormat};
use crate::client::handle_error;
use gameverse_core::{CatalogListing, Game};
use reqwest::Client;

/// 查询条件（对应 GET /games 的参数）
#[derive(Debug, Default)]
pub struct GameSearch {
    pub q: Option<String>,
    pub genres: Vec<String>,
    pub platforms: Vec<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl GameSearch {
    /// 数组参数按重复 key 发送
    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(q) = &self.q {
            pairs.push(("q", q.clone()));
        }
        pairs.extend(self.genres.iter().map(|g| ("genres", g.clone())));
        pairs.extend(self.platforms.iter().map(|p| ("platforms", p.clone())));
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        pairs
    }
}

pub async fn list_games(
    client: &Client,
    base: &str,
    search: &GameSearch,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let resp = client
        .get(format!("{}/games", base))
        .query(&search.query_pairs())
        .send()
        .await?;
    let listing: CatalogListing = handle_error(resp).await?.json().await?;

    if output == OutputFormat::Json {
        return print_json(&listing);
    }

    match listing {
        CatalogListing::Page(page) => {
            print_games(&page.data);
            println!();
            print_kv(
                "Page",
                &format!("{} ({} per page, {} total)", page.page, page.limit, page.total),
            );
        }
        CatalogListing::Games(games) => print_games(&games),
    }
    Ok(())
}

fn print_games(games: &[Game]) {
    if games.is_empty() {
        print_empty("No games found");
        return;
    }
    println!();
    print_table_header(&[("ID", 6), ("TITLE", 36), ("GENRES", 28), ("ADDED", 6)]);
    for game in games {
        let id = game.game_id.to_string();
        let title = truncate(&game.title, 36);
        let genres = truncate(&game.genres.fr.join(", "), 28);
        let added = game.added.to_string();
        print_table_row(&[(&id, 6), (&title, 36), (&genres, 28), (&added, 6)]);
    }
}
