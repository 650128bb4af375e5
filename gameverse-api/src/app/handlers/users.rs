//! 当前用户 API handlers（需要 access token）

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use gameverse_core::{LibraryAction, UserProfile};
use serde::Deserialize;
use serde_json::{json, Value};
use serde_with::{serde_as, DisplayFromStr, PickFirst};

use super::super::error::ApiError;
use super::super::middleware::AuthUser;
use super::super::state::AppState;

/// `gameId` 可以是数字，也可以是数字字符串
#[serde_as]
#[derive(Debug, Default, Deserialize)]
pub struct ToggleRequest {
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    #[serde(default, rename = "gameId")]
    pub game_id: Option<i64>,
}

/// GET /user/me - 当前用户资料
pub async fn me(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<UserProfile>, ApiError> {
    let profile = state.accounts.profile(claims.user_id).await?;
    Ok(Json(profile))
}

/// POST /user/library/toggle - 收藏 / 取消收藏
pub async fn toggle_library(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    body: Result<Json<ToggleRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(req) = body?;
    let game_id = req
        .game_id
        .filter(|id| *id != 0)
        .ok_or_else(|| ApiError::bad_request("Game ID required"))?;

    let toggle = state
        .accounts
        .toggle_library(claims.user_id, game_id)
        .await?;

    let message = match toggle.action {
        LibraryAction::Added => "Game added",
        LibraryAction::Removed => "Game removed",
    };
    Ok(Json(json!({
        "message": message,
        "game_list": toggle.game_list,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_id_accepts_numbers_and_numeric_strings() {
        let req: ToggleRequest = serde_json::from_str(r#"{"gameId": 42}"#).unwrap();
        assert_eq!(req.game_id, Some(42));
        let req: ToggleRequest = serde_json::from_str(r#"{"gameId": "7"}"#).unwrap();
        assert_eq!(req.game_id, Some(7));
        let req: ToggleRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.game_id, None);
    }
}
