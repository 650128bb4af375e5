//! 个人游戏库：切换收藏

use super::models::*;
use super::AccountManager;
use crate::error::{GameVerseError, Result};
use tracing::{info, instrument};

impl AccountManager {
    /// 切换游戏在用户收藏中的状态：不存在则追加，存在则移除
    #[instrument(skip(self))]
    pub async fn toggle_library(&self, user_id: i64, game_id: i64) -> Result<LibraryToggle> {
        let (action, game_list) = self
            .users
            .toggle_game(user_id, game_id)
            .await?
            .ok_or_else(|| GameVerseError::NotFound("User".into()))?;
        info!(user_id, game_id, ?action, "library toggled");
        Ok(LibraryToggle { action, game_list })
    }
}

#[cfg(test)]
mod tests {
    use super::super::manager::tests::{manager_with, request};
    use super::*;
    use crate::mail::MemoryMailer;
    use std::sync::Arc;

    #[tokio::test]
    async fn toggling_twice_restores_the_list() {
        let (_, manager) = manager_with(Arc::new(MemoryMailer::new()));
        let user = manager.register(request("a@test.com", "alice")).await.unwrap();

        manager.toggle_library(user.user_id, 7).await.unwrap();
        let added = manager.toggle_library(user.user_id, 42).await.unwrap();
        assert_eq!(added.action, LibraryAction::Added);
        assert_eq!(added.game_list, vec![7, 42]);

        let removed = manager.toggle_library(user.user_id, 42).await.unwrap();
        assert_eq!(removed.action, LibraryAction::Removed);
        assert_eq!(removed.game_list, vec![7]);
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let (_, manager) = manager_with(Arc::new(MemoryMailer::new()));
        let err = manager.toggle_library(404, 1).await.unwrap_err();
        assert!(matches!(err, GameVerseError::NotFound(_)));
    }
}
