//! 目录查询构建：把 query string 参数转换为过滤 / 排序 / 分页描述。
//!
//! 同一个 [`CatalogQuery`] 既能渲染为 MongoDB 过滤文档，也能直接在内存中匹配
//! [`Game`]，两种存储后端因此共享同一套语义。

use crate::models::Game;
use mongodb::bson::{doc, Bson, Document};
use serde::{Deserialize, Serialize};

/// 未分页时（旧版调用方）返回的最大条数
pub const LEGACY_LIMIT: i64 = 50;
/// 分页时 limit 的默认值
pub const DEFAULT_PAGE_LIMIT: u64 = 50;
/// 首页 category 组件的随机样本大小
pub const CATEGORY_SAMPLE_SIZE: usize = 7;

/// Raw listing parameters, as they arrive in the query string.
///
/// Array filters may be repeated (`genres=A&genres=B`); values are never split
/// on commas because some labels contain them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogParams {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub platforms: Vec<String>,
    #[serde(default)]
    pub themes: Vec<String>,
    #[serde(default)]
    pub developers: Vec<String>,
    #[serde(default)]
    pub publishers: Vec<String>,
    #[serde(default, rename = "genresMode")]
    pub genres_mode: Option<String>,
    #[serde(default, rename = "platformsMode")]
    pub platforms_mode: Option<String>,
    #[serde(default, rename = "themesMode")]
    pub themes_mode: Option<String>,
    #[serde(default, rename = "developersMode")]
    pub developers_mode: Option<String>,
    #[serde(default, rename = "publishersMode")]
    pub publishers_mode: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, rename = "sortBy")]
    pub sort_by: Option<String>,
    #[serde(default, rename = "sortOrder")]
    pub sort_order: Option<String>,
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default)]
    pub limit: Option<String>,
}

/// How the values of one array filter combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    /// 字段包含任意一个值（$in）
    #[default]
    Or,
    /// 字段包含全部值（$all）
    And,
}

impl FilterMode {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("AND") => FilterMode::And,
            _ => FilterMode::Or,
        }
    }
}

/// Filterable list fields of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FacetField {
    Genres,
    Platforms,
    Themes,
    Developers,
    Publishers,
}

impl FacetField {
    pub const ALL: [FacetField; 5] = [
        FacetField::Genres,
        FacetField::Platforms,
        FacetField::Themes,
        FacetField::Developers,
        FacetField::Publishers,
    ];

    /// Document path; genres and themes filter on the French labels.
    pub fn path(self) -> &'static str {
        match self {
            FacetField::Genres => "genres.fr",
            FacetField::Platforms => "platforms",
            FacetField::Themes => "themes.fr",
            FacetField::Developers => "developers",
            FacetField::Publishers => "publishers",
        }
    }

    pub fn values(self, game: &Game) -> &[String] {
        match self {
            FacetField::Genres => &game.genres.fr,
            FacetField::Platforms => &game.platforms,
            FacetField::Themes => &game.themes.fr,
            FacetField::Developers => &game.developers,
            FacetField::Publishers => &game.publishers,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayFilter {
    pub field: FacetField,
    pub values: Vec<String>,
    pub mode: FilterMode,
}

impl ArrayFilter {
    fn matches(&self, game: &Game) -> bool {
        let present = self.field.values(game);
        match self.mode {
            FilterMode::Or => self.values.iter().any(|v| present.contains(v)),
            FilterMode::And => self.values.iter().all(|v| present.contains(v)),
        }
    }

    fn condition(&self) -> Document {
        let values: Vec<Bson> = self.values.iter().cloned().map(Bson::String).collect();
        match self.mode {
            FilterMode::Or => doc! { "$in": values },
            FilterMode::And => doc! { "$all": values },
        }
    }
}

/// Fields searched by the free-text term.
const TEXT_FIELDS: [&str; 3] = ["title", "developers", "publishers"];

/// Filter half of a catalog query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameFilter {
    /// 标题 / 开发商 / 发行商的大小写不敏感子串匹配
    pub text: Option<String>,
    pub arrays: Vec<ArrayFilter>,
    /// 单一类型（genres.fr 精确包含），覆盖 genres 过滤
    pub category: Option<String>,
}

impl GameFilter {
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.arrays.is_empty() && self.category.is_none()
    }

    /// Render as a MongoDB filter document.
    pub fn to_document(&self) -> Document {
        let mut filter = Document::new();
        if let Some(text) = &self.text {
            let pattern = regex::escape(text);
            let clauses: Vec<Document> = TEXT_FIELDS
                .iter()
                .map(|field| doc! { *field: { "$regex": pattern.as_str(), "$options": "i" } })
                .collect();
            filter.insert("$or", clauses);
        }
        for array in &self.arrays {
            filter.insert(array.field.path(), array.condition());
        }
        if let Some(category) = &self.category {
            filter.insert(FacetField::Genres.path(), category.as_str());
        }
        filter
    }

    /// Evaluate the same filter against an in-memory game.
    pub fn matches(&self, game: &Game) -> bool {
        if let Some(text) = &self.text {
            let needle = text.to_lowercase();
            let hit = game.title.to_lowercase().contains(&needle)
                || game
                    .developers
                    .iter()
                    .chain(game.publishers.iter())
                    .any(|v| v.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        if !self.arrays.iter().all(|a| a.matches(game)) {
            return false;
        }
        match &self.category {
            Some(category) => game.genres.fr.contains(category),
            None => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_i32(self) -> i32 {
        match self {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        }
    }
}

/// Sort half of a catalog query. `field` is a document path such as `added`
/// or `release_date`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            field: "added".to_string(),
            direction: SortDirection::Desc,
        }
    }
}

impl SortSpec {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    /// Sort document; `game_id` breaks ties so pages stay stable.
    pub fn to_document(&self) -> Document {
        let mut sort = doc! { self.field.as_str(): self.direction.as_i32() };
        if self.field != "game_id" {
            sort.insert("game_id", 1);
        }
        sort
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
}

impl Pagination {
    /// 页码来自查询串，可能极大：饱和计算，并限制在 MongoDB 可接受的 i64 范围内
    pub fn skip(&self) -> u64 {
        (self.page - 1)
            .saturating_mul(self.limit)
            .min(i64::MAX as u64)
    }
}

/// What a listing request asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogQuery {
    pub filter: GameFilter,
    pub sort: SortSpec,
    pub pagination: Option<Pagination>,
}

impl CatalogQuery {
    pub fn from_params(params: &CatalogParams) -> Self {
        let text = non_empty(params.q.as_deref());
        let category = non_empty(params.category.as_deref());

        let facets = [
            (FacetField::Genres, &params.genres, &params.genres_mode),
            (FacetField::Platforms, &params.platforms, &params.platforms_mode),
            (FacetField::Themes, &params.themes, &params.themes_mode),
            (FacetField::Developers, &params.developers, &params.developers_mode),
            (FacetField::Publishers, &params.publishers, &params.publishers_mode),
        ];
        let arrays = facets
            .into_iter()
            // category 覆盖 genres 条件
            .filter(|(field, _, _)| !(category.is_some() && *field == FacetField::Genres))
            .filter_map(|(field, values, mode)| {
                let values: Vec<String> = values
                    .iter()
                    .filter(|v| !v.is_empty())
                    .cloned()
                    .collect();
                if values.is_empty() {
                    return None;
                }
                Some(ArrayFilter {
                    field,
                    values,
                    mode: FilterMode::parse(mode.as_deref()),
                })
            })
            .collect();

        let sort = match non_empty(params.sort_by.as_deref()) {
            Some(field) => {
                let direction = match params.sort_order.as_deref() {
                    Some("asc") => SortDirection::Asc,
                    _ => SortDirection::Desc,
                };
                SortSpec::new(field, direction)
            }
            None => SortSpec::default(),
        };

        let pagination = if params.page.is_some() || params.limit.is_some() {
            Some(Pagination {
                page: parse_positive(params.page.as_deref()).unwrap_or(1),
                limit: parse_positive(params.limit.as_deref()).unwrap_or(DEFAULT_PAGE_LIMIT),
            })
        } else {
            None
        };

        Self {
            filter: GameFilter {
                text,
                arrays,
                category,
            },
            sort,
            pagination,
        }
    }

    /// `category` short-circuits to a random sample.
    pub fn is_sample(&self) -> bool {
        self.filter.category.is_some()
    }
}

fn non_empty(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_positive(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|n| *n >= 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MultilingualList;

    fn params() -> CatalogParams {
        CatalogParams::default()
    }

    fn game(genres: &[&str]) -> Game {
        Game {
            game_id: 1,
            title: "Hollow Knight".into(),
            developers: vec!["Team Cherry".into()],
            genres: MultilingualList {
                en: vec![],
                fr: genres.iter().map(|g| g.to_string()).collect(),
            },
            ..Default::default()
        }
    }

    #[test]
    fn text_search_covers_three_fields_and_escapes() {
        let mut p = params();
        p.q = Some("c++".into());
        let query = CatalogQuery::from_params(&p);
        let filter = query.filter.to_document();
        let clauses = filter.get_array("$or").unwrap();
        assert_eq!(clauses.len(), 3);
        let title = clauses[0].as_document().unwrap().get_document("title").unwrap();
        assert_eq!(title.get_str("$regex").unwrap(), r"c\+\+");
        assert_eq!(title.get_str("$options").unwrap(), "i");
    }

    #[test]
    fn array_filters_follow_mode() {
        let mut p = params();
        p.genres = vec!["Action".into(), "Aventure".into()];
        p.genres_mode = Some("AND".into());
        p.platforms = vec!["PC".into()];
        let filter = CatalogQuery::from_params(&p).filter.to_document();
        let genres = filter.get_document("genres.fr").unwrap();
        assert!(genres.contains_key("$all"));
        let platforms = filter.get_document("platforms").unwrap();
        assert!(platforms.contains_key("$in"));
    }

    #[test]
    fn values_with_commas_are_not_split() {
        let mut p = params();
        p.themes = vec!["Science-fiction, Horreur".into()];
        let query = CatalogQuery::from_params(&p);
        assert_eq!(query.filter.arrays[0].values, vec!["Science-fiction, Horreur"]);
    }

    #[test]
    fn category_replaces_genre_filter() {
        let mut p = params();
        p.genres = vec!["RPG".into()];
        p.category = Some("Action".into());
        let query = CatalogQuery::from_params(&p);
        assert!(query.is_sample());
        assert!(query.filter.arrays.is_empty());
        assert_eq!(query.filter.to_document().get_str("genres.fr").unwrap(), "Action");
    }

    #[test]
    fn sort_defaults_to_popularity() {
        let query = CatalogQuery::from_params(&params());
        assert_eq!(query.sort, SortSpec::default());
        let sort = query.sort.to_document();
        assert_eq!(sort.get_i32("added").unwrap(), -1);
        assert_eq!(sort.get_i32("game_id").unwrap(), 1);

        let mut p = params();
        p.sort_by = Some("title".into());
        p.sort_order = Some("asc".into());
        let query = CatalogQuery::from_params(&p);
        assert_eq!(query.sort, SortSpec::new("title", SortDirection::Asc));
    }

    #[test]
    fn pagination_only_when_requested() {
        assert!(CatalogQuery::from_params(&params()).pagination.is_none());

        let mut p = params();
        p.page = Some("2".into());
        let pagination = CatalogQuery::from_params(&p).pagination.unwrap();
        assert_eq!(pagination, Pagination { page: 2, limit: 50 });
        assert_eq!(pagination.skip(), 50);

        p.page = Some("abc".into());
        p.limit = Some("0".into());
        let pagination = CatalogQuery::from_params(&p).pagination.unwrap();
        assert_eq!(pagination, Pagination { page: 1, limit: 50 });
    }

    #[test]
    fn huge_page_does_not_overflow_skip() {
        let mut p = params();
        p.page = Some(u64::MAX.to_string());
        p.limit = Some("50".into());
        let pagination = CatalogQuery::from_params(&p).pagination.unwrap();
        assert_eq!(pagination.page, u64::MAX);
        assert_eq!(pagination.skip(), i64::MAX as u64);

        let pagination = Pagination { page: 3, limit: 10 };
        assert_eq!(pagination.skip(), 20);
    }

    #[test]
    fn only_exact_and_selects_and_mode() {
        assert_eq!(FilterMode::parse(Some("AND")), FilterMode::And);
        assert_eq!(FilterMode::parse(Some("and")), FilterMode::Or);
        assert_eq!(FilterMode::parse(Some(" AND ")), FilterMode::Or);
        assert_eq!(FilterMode::parse(None), FilterMode::Or);
    }

    #[test]
    fn in_memory_matching_mirrors_document() {
        let mut p = params();
        p.genres = vec!["Action".into(), "Plateforme".into()];
        p.genres_mode = Some("AND".into());
        let query = CatalogQuery::from_params(&p);
        assert!(query.filter.matches(&game(&["Action", "Plateforme", "Indépendant"])));
        assert!(!query.filter.matches(&game(&["Action"])));

        p.genres_mode = None;
        let query = CatalogQuery::from_params(&p);
        assert!(query.filter.matches(&game(&["Action"])));

        let mut p = params();
        p.q = Some("cherry".into());
        assert!(CatalogQuery::from_params(&p).filter.matches(&game(&[])));
    }
}
