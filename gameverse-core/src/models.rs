use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

/// Cover / artwork reference.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageResource {
    pub thumb: Option<String>,
    pub original: Option<String>,
}

/// A string available in English and French.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultilingualText {
    pub en: Option<String>,
    pub fr: Option<String>,
}

/// A list of labels available in English and French.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultilingualList {
    #[serde(default)]
    pub en: Vec<String>,
    #[serde(default)]
    pub fr: Vec<String>,
}

/// Catalog entry. Immutable after seeding except for the `added` counter.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Game {
    /// 导入时按顺序分配
    #[serde(default)]
    pub game_id: i64,
    pub title: String,
    pub description: Option<MultilingualText>,
    #[serde(default)]
    pub platforms: Vec<String>,
    #[serde(default)]
    pub genres: MultilingualList,
    pub cover: Option<ImageResource>,
    #[serde(default)]
    pub developers: Vec<String>,
    #[serde(default)]
    pub publishers: Vec<String>,
    #[serde(default)]
    pub artworks: Vec<ImageResource>,
    #[serde(default)]
    pub game_modes: MultilingualList,
    #[serde(default)]
    pub player_perspectives: MultilingualList,
    #[serde(default)]
    pub themes: MultilingualList,
    #[serde(default)]
    pub franchises: Vec<String>,
    #[serde(default)]
    pub dlcs: Vec<String>,
    #[serde(default)]
    pub game_engines: Vec<String>,
    #[serde(default)]
    pub videos: Vec<String>,
    pub release_date: Option<String>,
    /// 热度（被加入收藏的次数）
    #[serde(default)]
    pub added: i64,
    #[serde(rename = "createdAt", default, with = "bson_date")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "updatedAt", default, with = "bson_date")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// 日期字段的序列化：写入 MongoDB 时为 BSON Date，JSON 中为 RFC 3339 字符串。
/// 读取时两种形式都接受。
pub(crate) mod bson_date {
    use chrono::{DateTime, Utc};
    use mongodb::bson::{self, Bson};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            None => serializer.serialize_none(),
            Some(dt) if serializer.is_human_readable() => dt.serialize(serializer),
            Some(dt) => bson::DateTime::from_millis(dt.timestamp_millis()).serialize(serializer),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<Bson>::deserialize(deserializer)? {
            None | Some(Bson::Null) => Ok(None),
            Some(Bson::DateTime(dt)) => DateTime::from_timestamp_millis(dt.timestamp_millis())
                .map(Some)
                .ok_or_else(|| D::Error::custom("date out of range")),
            Some(Bson::String(s)) => DateTime::parse_from_rfc3339(&s)
                .map(|dt| Some(dt.with_timezone(&Utc)))
                .map_err(D::Error::custom),
            Some(other) => Err(D::Error::custom(format!("expected a date, found {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn game_deserializes_sparse_documents() {
        let game: Game = serde_json::from_value(json!({
            "game_id": 3,
            "title": "Hades",
            "genres": { "fr": ["Action"] },
            "cover": { "thumb": "t.jpg" }
        }))
        .unwrap();
        assert_eq!(game.genres.fr, vec!["Action"]);
        assert!(game.genres.en.is_empty());
        assert_eq!(game.added, 0);
        assert_eq!(game.cover.unwrap().original, None);
    }

    #[test]
    fn game_skips_missing_optionals_when_serialized() {
        let game = Game {
            game_id: 1,
            title: "Celeste".into(),
            ..Default::default()
        };
        let value = serde_json::to_value(&game).unwrap();
        assert!(value.get("description").is_none());
        assert!(value.get("createdAt").is_none());
        assert_eq!(value["platforms"], json!([]));
    }

    #[test]
    fn dates_are_bson_dates_in_mongo_and_strings_in_json() {
        use chrono::TimeZone;
        use mongodb::bson::{self, doc};

        let created = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let stored = doc! {
            "game_id": 1,
            "title": "Hades",
            "createdAt": bson::DateTime::from_millis(created.timestamp_millis()),
        };
        let game: Game = bson::from_document(stored).unwrap();
        assert_eq!(game.created_at, Some(created));
        assert_eq!(game.updated_at, None);

        let raw = bson::to_raw_document_buf(&game).unwrap();
        assert_eq!(
            raw.get_datetime("createdAt").unwrap().timestamp_millis(),
            created.timestamp_millis()
        );

        let value = serde_json::to_value(&game).unwrap();
        assert_eq!(value["createdAt"], "2024-03-01T12:00:00Z");
        let parsed: Game = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.created_at, Some(created));
    }
}
