use super::{GameStore, UserStore};
use crate::catalog::{FacetField, GameFilter, SortSpec};
use crate::error::{GameVerseError, Result};
use crate::models::Game;
use crate::user::{LibraryAction, User};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{self, doc, Bson, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{IndexOptions, ReturnDocument};
use mongodb::{Client, Collection, Database, IndexModel};
use tracing::{debug, info, instrument};

const GAMES: &str = "games";
const USERS: &str = "users";
const COUNTERS: &str = "counters";
/// counters 集合中用户 id 序列的 _id
const USER_SEQUENCE: &str = "user_id";
/// 并发切换收藏时的重试次数
const TOGGLE_ATTEMPTS: usize = 3;

/// 未配置时使用的连接串与数据库名
pub const DEFAULT_MONGO_URI: &str = "mongodb://localhost:27017/gameLibrary";
pub const DEFAULT_DB_NAME: &str = "gameLibrary";

/// 从连接串中取数据库名：`mongodb://host:27017/gameLibrary?x=y` -> `gameLibrary`
pub fn database_from_uri(uri: &str) -> Option<String> {
    let (_, rest) = uri.split_once("://")?;
    let (_, path) = rest.split_once('/')?;
    let name = path.split('?').next()?.trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// 显式指定的库名优先，其次取连接串中的库名，最后使用默认值
pub fn resolve_database_name(explicit: Option<&str>, uri: &str) -> String {
    explicit
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .or_else(|| database_from_uri(uri))
        .unwrap_or_else(|| DEFAULT_DB_NAME.to_string())
}

/// MongoDB 存储
#[derive(Clone)]
pub struct MongoStore {
    db: Database,
}

impl std::fmt::Debug for MongoStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoStore")
            .field("db", &self.db.name())
            .finish()
    }
}

impl MongoStore {
    /// 连接数据库并确保索引与 id 序列就绪
    pub async fn connect(uri: &str, database_name: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri).await?;
        let store = Self {
            db: client.database(database_name),
        };
        store.init_indexes().await?;
        store.sync_user_sequence().await?;
        info!(database = database_name, "connected to MongoDB");
        Ok(store)
    }

    fn games(&self) -> Collection<Game> {
        self.db.collection(GAMES)
    }

    fn users(&self) -> Collection<User> {
        self.db.collection(USERS)
    }

    fn counters(&self) -> Collection<Document> {
        self.db.collection(COUNTERS)
    }

    async fn init_indexes(&self) -> Result<()> {
        for field in ["email", "username", "user_id"] {
            let index = IndexModel::builder()
                .keys(doc! { field: 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build();
            self.users().create_index(index).await?;
        }

        let game_id = IndexModel::builder()
            .keys(doc! { "game_id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.games().create_index(game_id).await?;

        let popularity = IndexModel::builder().keys(doc! { "added": -1 }).build();
        self.games().create_index(popularity).await?;

        debug!("database indexes ensured");
        Ok(())
    }

    /// 序列值不小于已有的最大 user_id（兼容序列引入前写入的数据）
    async fn sync_user_sequence(&self) -> Result<()> {
        let highest = self
            .users()
            .find_one(doc! {})
            .sort(doc! { "user_id": -1 })
            .await?
            .map(|u| u.user_id)
            .unwrap_or(0);

        self.counters()
            .update_one(
                doc! { "_id": USER_SEQUENCE },
                doc! { "$max": { "seq": highest } },
            )
            .upsert(true)
            .await?;
        Ok(())
    }

    async fn game_list(&self, user_id: i64) -> Result<Option<Vec<i64>>> {
        Ok(self
            .users()
            .find_one(doc! { "user_id": user_id })
            .await?
            .map(|u| u.game_list))
    }
}

/// 唯一索引冲突（E11000）
fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match &*err.kind {
        ErrorKind::Write(WriteFailure::WriteError(write)) => write.code == 11000,
        ErrorKind::InsertMany(failure) => failure
            .write_errors
            .as_ref()
            .is_some_and(|errors| errors.iter().any(|e| e.code == 11000)),
        _ => false,
    }
}

#[async_trait]
impl GameStore for MongoStore {
    async fn find_games(
        &self,
        filter: &GameFilter,
        sort: &SortSpec,
        skip: u64,
        limit: i64,
    ) -> Result<Vec<Game>> {
        let games = self.games();
        let mut find = games
            .find(filter.to_document())
            .sort(sort.to_document())
            .skip(skip);
        if limit > 0 {
            find = find.limit(limit);
        }
        let found: Vec<Game> = find.await?.try_collect().await?;
        Ok(found)
    }

    async fn count_games(&self, filter: &GameFilter) -> Result<u64> {
        Ok(self.games().count_documents(filter.to_document()).await?)
    }

    async fn sample_games(&self, filter: &GameFilter, size: usize) -> Result<Vec<Game>> {
        let pipeline = vec![
            doc! { "$match": filter.to_document() },
            doc! { "$sample": { "size": size as i64 } },
        ];
        let documents: Vec<Document> = self.games().aggregate(pipeline).await?.try_collect().await?;
        documents
            .into_iter()
            .map(|d| bson::from_document(d).map_err(GameVerseError::from))
            .collect()
    }

    async fn find_game(&self, game_id: i64) -> Result<Option<Game>> {
        Ok(self.games().find_one(doc! { "game_id": game_id }).await?)
    }

    async fn distinct_values(&self, field: FacetField) -> Result<Vec<String>> {
        let values = self.games().distinct(field.path(), doc! {}).await?;
        Ok(values
            .into_iter()
            .filter_map(|v| match v {
                Bson::String(s) if !s.is_empty() => Some(s),
                _ => None,
            })
            .collect())
    }

    async fn genres_with_at_least(&self, min_count: u64) -> Result<Vec<String>> {
        let pipeline = vec![
            doc! { "$unwind": "$genres.fr" },
            doc! { "$group": { "_id": "$genres.fr", "count": { "$sum": 1 } } },
            doc! { "$match": {
                "count": { "$gte": min_count as i64 },
                "_id": { "$nin": [Bson::Null, ""] },
            } },
            doc! { "$sort": { "count": -1, "_id": 1 } },
        ];
        let documents: Vec<Document> = self.games().aggregate(pipeline).await?.try_collect().await?;
        Ok(documents
            .iter()
            .filter_map(|d| d.get_str("_id").ok().map(str::to_string))
            .collect())
    }

    #[instrument(skip(self, games), fields(count = games.len()))]
    async fn replace_games(&self, games: Vec<Game>) -> Result<usize> {
        let removed = self.games().delete_many(doc! {}).await?;
        info!(removed = removed.deleted_count, "cleared game catalog");
        if games.is_empty() {
            return Ok(0);
        }
        let inserted = self.games().insert_many(&games).await?;
        Ok(inserted.inserted_ids.len())
    }
}

#[async_trait]
impl UserStore for MongoStore {
    async fn next_user_id(&self) -> Result<i64> {
        let counter = self
            .counters()
            .find_one_and_update(
                doc! { "_id": USER_SEQUENCE },
                doc! { "$inc": { "seq": 1_i64 } },
            )
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await?
            .ok_or_else(|| GameVerseError::Other("user id sequence missing".into()))?;

        match counter.get("seq") {
            Some(Bson::Int64(seq)) => Ok(*seq),
            Some(Bson::Int32(seq)) => Ok(i64::from(*seq)),
            other => Err(GameVerseError::Bson(format!(
                "unexpected user id sequence value: {:?}",
                other
            ))),
        }
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        match self.users().insert_one(user).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Err(GameVerseError::AlreadyExists("User".into())),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_user(&self, user_id: i64) -> Result<Option<User>> {
        Ok(self.users().find_one(doc! { "user_id": user_id }).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.users().find_one(doc! { "email": email }).await?)
    }

    async fn find_user_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> Result<Option<User>> {
        Ok(self
            .users()
            .find_one(doc! { "$or": [{ "email": email }, { "username": username }] })
            .await?)
    }

    async fn find_user_by_verification_token(&self, token: &str) -> Result<Option<User>> {
        Ok(self
            .users()
            .find_one(doc! { "verificationToken": token })
            .await?)
    }

    async fn find_user_verified_with(&self, token: &str) -> Result<Option<User>> {
        Ok(self
            .users()
            .find_one(doc! { "emailVerified": true, "verifiedWithToken": token })
            .await?)
    }

    async fn save_user(&self, user: &User) -> Result<()> {
        let result = self
            .users()
            .replace_one(doc! { "user_id": user.user_id }, user)
            .await?;
        if result.matched_count == 0 {
            return Err(GameVerseError::NotFound("User".into()));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn toggle_game(
        &self,
        user_id: i64,
        game_id: i64,
    ) -> Result<Option<(LibraryAction, Vec<i64>)>> {
        for _ in 0..TOGGLE_ATTEMPTS {
            let now = Bson::DateTime(bson::DateTime::now());

            let pushed = self
                .users()
                .update_one(
                    doc! { "user_id": user_id, "game_list": { "$ne": game_id } },
                    doc! { "$push": { "game_list": game_id }, "$set": { "updatedAt": now.clone() } },
                )
                .await?;
            if pushed.matched_count == 1 {
                return Ok(self
                    .game_list(user_id)
                    .await?
                    .map(|list| (LibraryAction::Added, list)));
            }

            let pulled = self
                .users()
                .update_one(
                    doc! { "user_id": user_id, "game_list": game_id },
                    doc! { "$pull": { "game_list": game_id }, "$set": { "updatedAt": now } },
                )
                .await?;
            if pulled.matched_count == 1 {
                return Ok(self
                    .game_list(user_id)
                    .await?
                    .map(|list| (LibraryAction::Removed, list)));
            }

            // 两次都未命中：用户不存在，或被并发请求抢先切换
            if self.find_user(user_id).await?.is_none() {
                return Ok(None);
            }
            debug!("library toggle raced, retrying");
        }
        Err(GameVerseError::Other(format!(
            "library toggle for user {} did not settle",
            user_id
        )))
    }

    async fn delete_all_users(&self) -> Result<u64> {
        let result = self.users().delete_many(doc! {}).await?;
        Ok(result.deleted_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_name_comes_from_uri_path() {
        assert_eq!(
            database_from_uri("mongodb://localhost:27017/gameLibrary").as_deref(),
            Some("gameLibrary")
        );
        assert_eq!(
            database_from_uri("mongodb+srv://u:p@cluster.example/prod?retryWrites=true").as_deref(),
            Some("prod")
        );
        assert_eq!(database_from_uri("mongodb://localhost:27017"), None);
        assert_eq!(database_from_uri("mongodb://localhost:27017/"), None);
    }

    #[test]
    fn database_name_resolution_order() {
        assert_eq!(resolve_database_name(None, DEFAULT_MONGO_URI), "gameLibrary");
        assert_eq!(resolve_database_name(None, "mongodb://db:27017/staging"), "staging");
        assert_eq!(resolve_database_name(None, "mongodb://db:27017"), DEFAULT_DB_NAME);
        assert_eq!(
            resolve_database_name(Some("other"), "mongodb://db:27017/staging"),
            "other"
        );
        assert_eq!(resolve_database_name(Some("  "), "mongodb://db:27017/staging"), "staging");
    }
}
