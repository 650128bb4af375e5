use thiserror::Error;

/// Common result type for core operations.
pub type Result<T> = std::result::Result<T, GameVerseError>;

#[derive(Debug, Error)]
pub enum GameVerseError {
    /// 资源不存在，参数为主语（如 "User"、"Game"）
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0} already exists")]
    AlreadyExists(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("email not verified")]
    EmailNotVerified,
    #[error("email already verified")]
    AlreadyVerified,
    #[error("rate limited, retry after {retry_after}s")]
    RateLimited { retry_after: u64 },
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),
    #[error("bson error: {0}")]
    Bson(String),
    #[error("mail error: {0}")]
    Mail(String),
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("other error: {0}")]
    Other(String),
}

impl From<mongodb::bson::ser::Error> for GameVerseError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        GameVerseError::Bson(err.to_string())
    }
}

impl From<mongodb::bson::de::Error> for GameVerseError {
    fn from(err: mongodb::bson::de::Error) -> Self {
        GameVerseError::Bson(err.to_string())
    }
}
