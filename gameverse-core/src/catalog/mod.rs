//! 游戏目录：列表查询、热门、筛选项、随机类型与详情

mod query;

pub use query::{
    ArrayFilter, CatalogParams, CatalogQuery, FacetField, FilterMode, GameFilter, Pagination,
    SortDirection, SortSpec, CATEGORY_SAMPLE_SIZE, DEFAULT_PAGE_LIMIT, LEGACY_LIMIT,
};

use crate::error::{GameVerseError, Result};
use crate::models::Game;
use crate::store::GameStore;
use chrono::Utc;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{instrument, warn};

/// 热门列表条数
pub const POPULAR_LIMIT: i64 = 20;
/// 随机类型：每个类型至少包含的游戏数
pub const MIN_GAMES_PER_GENRE: u64 = 7;
/// 随机类型：返回的类型数
pub const RANDOM_GENRE_COUNT: usize = 3;
/// 候选不足或查询失败时返回的类型
pub const FALLBACK_GENRES: [&str; 3] = ["Action", "Aventure", "Indépendant"];

/// One page of results with the full filtered count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogPage {
    pub data: Vec<Game>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

/// Listing response: a page when pagination was requested, otherwise a bare
/// array (capped list or category sample).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CatalogListing {
    Page(CatalogPage),
    Games(Vec<Game>),
}

/// Available filter values, each sorted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFilters {
    pub genres: Vec<String>,
    pub platforms: Vec<String>,
    pub themes: Vec<String>,
    pub developers: Vec<String>,
    pub publishers: Vec<String>,
}

/// 目录服务
#[derive(Clone)]
pub struct Catalog {
    games: Arc<dyn GameStore>,
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog").finish_non_exhaustive()
    }
}

impl Catalog {
    pub fn new(games: Arc<dyn GameStore>) -> Self {
        Self { games }
    }

    /// 按查询条件列出游戏
    #[instrument(skip(self))]
    pub async fn list(&self, query: &CatalogQuery) -> Result<CatalogListing> {
        if query.is_sample() {
            let games = self
                .games
                .sample_games(&query.filter, CATEGORY_SAMPLE_SIZE)
                .await?;
            return Ok(CatalogListing::Games(games));
        }

        match query.pagination {
            Some(pagination) => {
                let limit = i64::try_from(pagination.limit).unwrap_or(i64::MAX);
                let (total, data) = futures::try_join!(
                    self.games.count_games(&query.filter),
                    self.games
                        .find_games(&query.filter, &query.sort, pagination.skip(), limit),
                )?;
                Ok(CatalogListing::Page(CatalogPage {
                    data,
                    total,
                    page: pagination.page,
                    limit: pagination.limit,
                }))
            }
            None => {
                let games = self
                    .games
                    .find_games(&query.filter, &query.sort, 0, LEGACY_LIMIT)
                    .await?;
                Ok(CatalogListing::Games(games))
            }
        }
    }

    /// 按热度降序的前 20 个游戏
    pub async fn popular(&self) -> Result<Vec<Game>> {
        self.games
            .find_games(&GameFilter::default(), &SortSpec::default(), 0, POPULAR_LIMIT)
            .await
    }

    /// 所有筛选维度的可选值（并发查询）
    #[instrument(skip(self))]
    pub async fn filters(&self) -> Result<CatalogFilters> {
        let (genres, platforms, themes, developers, publishers) = futures::try_join!(
            self.sorted_values(FacetField::Genres),
            self.sorted_values(FacetField::Platforms),
            self.sorted_values(FacetField::Themes),
            self.sorted_values(FacetField::Developers),
            self.sorted_values(FacetField::Publishers),
        )?;
        Ok(CatalogFilters {
            genres,
            platforms,
            themes,
            developers,
            publishers,
        })
    }

    async fn sorted_values(&self, field: FacetField) -> Result<Vec<String>> {
        let mut values = self.games.distinct_values(field).await?;
        values.sort();
        values.dedup();
        Ok(values)
    }

    /// 随机挑选 3 个至少有 7 个游戏的类型；不会失败，异常时返回默认类型
    #[instrument(skip(self))]
    pub async fn random_genres(&self) -> Vec<String> {
        let candidates = match self.games.genres_with_at_least(MIN_GAMES_PER_GENRE).await {
            Ok(genres) => genres,
            Err(e) => {
                warn!(error = %e, "genre lookup failed, using fallback genres");
                Vec::new()
            }
        };

        if candidates.len() < RANDOM_GENRE_COUNT {
            return FALLBACK_GENRES.iter().map(|g| g.to_string()).collect();
        }

        let mut rng = rand::thread_rng();
        candidates
            .choose_multiple(&mut rng, RANDOM_GENRE_COUNT)
            .cloned()
            .collect()
    }

    /// 按 game_id 获取详情
    pub async fn game(&self, game_id: i64) -> Result<Game> {
        self.games
            .find_game(game_id)
            .await?
            .ok_or_else(|| GameVerseError::NotFound("Game".into()))
    }

    /// 用给定数据替换整个目录，game_id 按顺序从 1 开始重新分配
    #[instrument(skip(self, games), fields(count = games.len()))]
    pub async fn seed(&self, games: Vec<Game>) -> Result<usize> {
        let now = Utc::now();
        let games = games
            .into_iter()
            .enumerate()
            .map(|(index, mut game)| {
                game.game_id = index as i64 + 1;
                game.created_at.get_or_insert(now);
                game.updated_at = Some(now);
                game
            })
            .collect();
        self.games.replace_games(games).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MultilingualList;
    use crate::store::MemoryStore;

    fn game(title: &str, genres: &[&str], added: i64) -> Game {
        Game {
            title: title.to_string(),
            genres: MultilingualList {
                en: vec![],
                fr: genres.iter().map(|g| g.to_string()).collect(),
            },
            platforms: vec!["PC".into()],
            added,
            ..Default::default()
        }
    }

    async fn seeded(games: Vec<Game>) -> Catalog {
        let catalog = Catalog::new(Arc::new(MemoryStore::new()));
        catalog.seed(games).await.unwrap();
        catalog
    }

    fn params() -> CatalogParams {
        CatalogParams::default()
    }

    #[tokio::test]
    async fn page_two_returns_next_window_and_total() {
        let games = (0..25)
            .map(|i| game(&format!("Game {i}"), &["Action"], 100 - i))
            .collect();
        let catalog = seeded(games).await;

        let mut p = params();
        p.page = Some("2".into());
        p.limit = Some("10".into());
        let listing = catalog.list(&CatalogQuery::from_params(&p)).await.unwrap();
        let CatalogListing::Page(page) = listing else {
            panic!("expected a page");
        };
        assert_eq!(page.total, 25);
        assert_eq!(page.page, 2);
        assert_eq!(page.limit, 10);
        let ids: Vec<i64> = page.data.iter().map(|g| g.game_id).collect();
        assert_eq!(ids, (11..=20).collect::<Vec<i64>>());
    }

    #[tokio::test]
    async fn legacy_listing_is_capped() {
        let games = (0..60).map(|i| game(&format!("G{i}"), &[], i)).collect();
        let catalog = seeded(games).await;
        let listing = catalog.list(&CatalogQuery::from_params(&params())).await.unwrap();
        let CatalogListing::Games(games) = listing else {
            panic!("expected a bare list");
        };
        assert_eq!(games.len(), 50);
        assert_eq!(games[0].added, 59);
    }

    #[tokio::test]
    async fn and_mode_requires_every_genre() {
        let catalog = seeded(vec![
            game("A", &["Action", "RPG"], 1),
            game("B", &["Action"], 2),
            game("C", &["RPG"], 3),
        ])
        .await;
        let mut p = params();
        p.genres = vec!["Action".into(), "RPG".into()];
        p.genres_mode = Some("AND".into());
        let CatalogListing::Games(games) =
            catalog.list(&CatalogQuery::from_params(&p)).await.unwrap()
        else {
            panic!("expected a bare list");
        };
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].title, "A");
    }

    #[tokio::test]
    async fn category_samples_at_most_seven() {
        let mut games: Vec<Game> = (0..12).map(|i| game(&format!("A{i}"), &["Action"], i)).collect();
        games.extend((0..5).map(|i| game(&format!("R{i}"), &["RPG"], i)));
        let catalog = seeded(games).await;

        let mut p = params();
        p.category = Some("Action".into());
        let CatalogListing::Games(sample) =
            catalog.list(&CatalogQuery::from_params(&p)).await.unwrap()
        else {
            panic!("expected a bare list");
        };
        assert_eq!(sample.len(), 7);
        assert!(sample.iter().all(|g| g.genres.fr.contains(&"Action".to_string())));
    }

    #[tokio::test]
    async fn popular_and_details() {
        let catalog = seeded(vec![game("Low", &[], 1), game("High", &[], 9)]).await;
        let popular = catalog.popular().await.unwrap();
        assert_eq!(popular[0].title, "High");

        assert_eq!(catalog.game(1).await.unwrap().title, "Low");
        assert!(matches!(
            catalog.game(99).await.unwrap_err(),
            GameVerseError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn filters_are_sorted_and_distinct() {
        let catalog = seeded(vec![
            game("A", &["RPG", "Action"], 1),
            game("B", &["Action"], 2),
        ])
        .await;
        let filters = catalog.filters().await.unwrap();
        assert_eq!(filters.genres, vec!["Action", "RPG"]);
        assert_eq!(filters.platforms, vec!["PC"]);
        assert!(filters.themes.is_empty());
    }

    #[tokio::test]
    async fn random_genres_fall_back_when_catalog_is_small() {
        let catalog = seeded(vec![game("A", &["Action"], 1)]).await;
        assert_eq!(catalog.random_genres().await, FALLBACK_GENRES.to_vec());

        let mut games = Vec::new();
        for genre in ["Action", "RPG", "Course", "Puzzle"] {
            games.extend((0..7).map(|i| game(&format!("{genre}{i}"), &[genre], i)));
        }
        let catalog = seeded(games).await;
        let picked = catalog.random_genres().await;
        assert_eq!(picked.len(), 3);
        assert!(picked
            .iter()
            .all(|g| ["Action", "RPG", "Course", "Puzzle"].contains(&g.as_str())));
    }
}
