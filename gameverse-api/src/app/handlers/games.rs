//! 游戏目录 API handlers（公开）

use axum::extract::{Path, State};
use axum::Json;
use axum_extra::extract::Query;
use gameverse_core::{
    CatalogFilters, CatalogListing, CatalogParams, CatalogQuery, Game, GameVerseError,
};

use super::super::error::ApiError;
use super::super::state::AppState;

/// GET /games, /games/search, /games/category
///
/// 数组参数可重复出现（`genres=A&genres=B`）。
pub async fn list_games(
    State(state): State<AppState>,
    Query(params): Query<CatalogParams>,
) -> Result<Json<CatalogListing>, ApiError> {
    let query = CatalogQuery::from_params(&params);
    let listing = state.catalog.list(&query).await?;
    Ok(Json(listing))
}

/// GET /games/popular
pub async fn popular_games(State(state): State<AppState>) -> Result<Json<Vec<Game>>, ApiError> {
    Ok(Json(state.catalog.popular().await?))
}

/// GET /games/filters
pub async fn game_filters(State(state): State<AppState>) -> Result<Json<CatalogFilters>, ApiError> {
    Ok(Json(state.catalog.filters().await?))
}

/// GET /games/random-genres - 总是 200
pub async fn random_genres(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.catalog.random_genres().await)
}

/// GET /games/:id
pub async fn get_game(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Game>, ApiError> {
    let game_id: i64 = id
        .trim()
        .parse()
        .map_err(|_| ApiError::bad_request(format!("invalid game id: {}", id)))?;

    match state.catalog.game(game_id).await {
        Ok(game) => Ok(Json(game)),
        Err(GameVerseError::NotFound(_)) => Err(ApiError::not_found("Jeu non trouvé")),
        Err(e) => Err(e.into()),
    }
}

