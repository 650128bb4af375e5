use super::{GameStore, UserStore};
use crate::catalog::{FacetField, GameFilter, SortDirection, SortSpec};
use crate::error::{GameVerseError, Result};
use crate::models::Game;
use crate::user::{LibraryAction, User};
use async_trait::async_trait;
use chrono::Utc;
use rand::seq::SliceRandom;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct UserTable {
    by_id: BTreeMap<i64, User>,
    /// 最近一次分配的 user_id
    last_id: i64,
}

/// 基于内存的存储：开发模式与测试使用，进程退出即丢失。
#[derive(Debug, Default)]
pub struct MemoryStore {
    games: RwLock<Vec<Game>>,
    users: RwLock<UserTable>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn user_count(&self) -> usize {
        self.users.read().await.by_id.len()
    }
}

/// Resolve a dotted path (`genres.fr`) inside a serialized game.
fn lookup<'a>(value: &'a Value, path: &str) -> &'a Value {
    path.split('.')
        .try_fold(value, |current, key| current.get(key))
        .unwrap_or(&Value::Null)
}

/// Ordering close to MongoDB's: missing < numbers < strings; arrays compare by
/// their first element.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Number(_) => 1,
            Value::String(_) => 2,
            Value::Object(_) => 3,
            Value::Array(_) => 4,
            Value::Bool(_) => 5,
        }
    }
    match (a, b) {
        (Value::Array(x), _) => compare_values(x.first().unwrap_or(&Value::Null), b),
        (_, Value::Array(y)) => compare_values(a, y.first().unwrap_or(&Value::Null)),
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

fn sort_games(games: &mut [Game], sort: &SortSpec) -> Result<()> {
    let mut keyed = games
        .iter()
        .map(|g| serde_json::to_value(g).map(|v| lookup(&v, &sort.field).clone()))
        .collect::<std::result::Result<Vec<Value>, _>>()?
        .into_iter()
        .zip(games.iter().cloned())
        .collect::<Vec<_>>();
    keyed.sort_by(|(ka, ga), (kb, gb)| {
        let primary = compare_values(ka, kb);
        let primary = match sort.direction {
            SortDirection::Asc => primary,
            SortDirection::Desc => primary.reverse(),
        };
        primary.then(ga.game_id.cmp(&gb.game_id))
    });
    for (slot, (_, game)) in games.iter_mut().zip(keyed) {
        *slot = game;
    }
    Ok(())
}

#[async_trait]
impl GameStore for MemoryStore {
    async fn find_games(
        &self,
        filter: &GameFilter,
        sort: &SortSpec,
        skip: u64,
        limit: i64,
    ) -> Result<Vec<Game>> {
        let mut matched: Vec<Game> = self
            .games
            .read()
            .await
            .iter()
            .filter(|g| filter.matches(g))
            .cloned()
            .collect();
        sort_games(&mut matched, sort)?;
        let window = matched.into_iter().skip(usize::try_from(skip).unwrap_or(usize::MAX));
        Ok(if limit > 0 {
            window.take(limit as usize).collect()
        } else {
            window.collect()
        })
    }

    async fn count_games(&self, filter: &GameFilter) -> Result<u64> {
        let games = self.games.read().await;
        Ok(games.iter().filter(|g| filter.matches(g)).count() as u64)
    }

    async fn sample_games(&self, filter: &GameFilter, size: usize) -> Result<Vec<Game>> {
        let games = self.games.read().await;
        let matched: Vec<&Game> = games.iter().filter(|g| filter.matches(g)).collect();
        let mut rng = rand::thread_rng();
        Ok(matched
            .choose_multiple(&mut rng, size)
            .map(|g| (*g).clone())
            .collect())
    }

    async fn find_game(&self, game_id: i64) -> Result<Option<Game>> {
        let games = self.games.read().await;
        Ok(games.iter().find(|g| g.game_id == game_id).cloned())
    }

    async fn distinct_values(&self, field: FacetField) -> Result<Vec<String>> {
        let games = self.games.read().await;
        let mut values: Vec<String> = games
            .iter()
            .flat_map(|g| field.values(g).iter().cloned())
            .filter(|v| !v.is_empty())
            .collect();
        values.dedup();
        Ok(values)
    }

    async fn genres_with_at_least(&self, min_count: u64) -> Result<Vec<String>> {
        let games = self.games.read().await;
        let mut counts: HashMap<&str, u64> = HashMap::new();
        for genre in games.iter().flat_map(|g| g.genres.fr.iter()) {
            if !genre.is_empty() {
                *counts.entry(genre.as_str()).or_default() += 1;
            }
        }
        let mut genres: Vec<(&str, u64)> = counts
            .into_iter()
            .filter(|(_, count)| *count >= min_count)
            .collect();
        genres.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        Ok(genres.into_iter().map(|(g, _)| g.to_string()).collect())
    }

    async fn replace_games(&self, games: Vec<Game>) -> Result<usize> {
        let count = games.len();
        *self.games.write().await = games;
        Ok(count)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn next_user_id(&self) -> Result<i64> {
        let mut table = self.users.write().await;
        table.last_id += 1;
        Ok(table.last_id)
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        let mut table = self.users.write().await;
        let duplicate = table.by_id.values().any(|u| {
            u.user_id == user.user_id || u.email == user.email || u.username == user.username
        });
        if duplicate {
            return Err(GameVerseError::AlreadyExists("User".into()));
        }
        table.last_id = table.last_id.max(user.user_id);
        table.by_id.insert(user.user_id, user.clone());
        Ok(())
    }

    async fn find_user(&self, user_id: i64) -> Result<Option<User>> {
        Ok(self.users.read().await.by_id.get(&user_id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let table = self.users.read().await;
        Ok(table.by_id.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> Result<Option<User>> {
        let table = self.users.read().await;
        Ok(table
            .by_id
            .values()
            .find(|u| u.email == email || u.username == username)
            .cloned())
    }

    async fn find_user_by_verification_token(&self, token: &str) -> Result<Option<User>> {
        let table = self.users.read().await;
        Ok(table
            .by_id
            .values()
            .find(|u| u.verification_token.as_deref() == Some(token))
            .cloned())
    }

    async fn find_user_verified_with(&self, token: &str) -> Result<Option<User>> {
        let table = self.users.read().await;
        Ok(table
            .by_id
            .values()
            .find(|u| u.email_verified && u.verified_with_token.as_deref() == Some(token))
            .cloned())
    }

    async fn save_user(&self, user: &User) -> Result<()> {
        let mut table = self.users.write().await;
        match table.by_id.get_mut(&user.user_id) {
            Some(slot) => {
                *slot = user.clone();
                Ok(())
            }
            None => Err(GameVerseError::NotFound("User".into())),
        }
    }

    async fn toggle_game(
        &self,
        user_id: i64,
        game_id: i64,
    ) -> Result<Option<(LibraryAction, Vec<i64>)>> {
        let mut table = self.users.write().await;
        let Some(user) = table.by_id.get_mut(&user_id) else {
            return Ok(None);
        };
        let action = match user.game_list.iter().position(|id| *id == game_id) {
            Some(index) => {
                user.game_list.remove(index);
                LibraryAction::Removed
            }
            None => {
                user.game_list.push(game_id);
                LibraryAction::Added
            }
        };
        user.updated_at = Some(Utc::now());
        Ok(Some((action, user.game_list.clone())))
    }

    async fn delete_all_users(&self) -> Result<u64> {
        let mut table = self.users.write().await;
        let count = table.by_id.len() as u64;
        table.by_id.clear();
        Ok(count)
    }
}
