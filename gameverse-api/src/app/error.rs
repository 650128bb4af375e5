use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{SecondsFormat, Utc};
use gameverse_core::GameVerseError;
use serde_json::{json, Map, Value};

/// 500 响应携带的原始错误信息；仅开发环境的中间件会把它写回响应体
#[derive(Debug, Clone)]
pub struct InternalErrorDetail(pub String);

#[derive(Debug)]
pub struct ApiError {
    code: &'static str,
    message: String,
    status: StatusCode,
    /// 合并进响应体的附加字段（如 emailNotVerified、retryAfter）
    extra: Map<String, Value>,
}

impl ApiError {
    pub fn new(code: &'static str, status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            status,
            message: message.into(),
            extra: Map::new(),
        }
    }

    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }

    pub fn unauthorized() -> Self {
        Self::new("Unauthorized", StatusCode::UNAUTHORIZED, "Unauthorized")
    }

    pub fn unauthorized_with_message(message: impl Into<String>) -> Self {
        Self::new("Unauthorized", StatusCode::UNAUTHORIZED, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BadRequest", StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NotFound", StatusCode::NOT_FOUND, message)
    }

    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Self::new(
            "TooManyRequests",
            StatusCode::TOO_MANY_REQUESTS,
            message,
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("Error", StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<GameVerseError> for ApiError {
    fn from(err: GameVerseError) -> Self {
        match err {
            GameVerseError::NotFound(subject) => {
                ApiError::not_found(format!("{subject} not found"))
            }
            GameVerseError::AlreadyExists(subject) => ApiError::new(
                "AlreadyExists",
                StatusCode::CONFLICT,
                format!("{subject} already exists"),
            ),
            GameVerseError::InvalidInput(msg) => ApiError::bad_request(msg),
            GameVerseError::Unauthorized(msg) => ApiError::unauthorized_with_message(msg),
            GameVerseError::EmailNotVerified => ApiError::new(
                "EmailNotVerified",
                StatusCode::FORBIDDEN,
                "Please verify your email before logging in. Check your inbox.",
            )
            .with_field("emailNotVerified", true),
            GameVerseError::AlreadyVerified => {
                ApiError::new("AlreadyVerified", StatusCode::BAD_REQUEST, "Email already verified")
            }
            GameVerseError::RateLimited { retry_after } => ApiError::too_many_requests(
                "Please wait 1 minute before requesting another verification email",
            )
            .with_field("retryAfter", retry_after),
            GameVerseError::Database(e) => {
                ApiError::new("DatabaseError", StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            GameVerseError::Bson(msg) => {
                ApiError::new("DatabaseError", StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
            GameVerseError::Mail(msg) => {
                ApiError::new("MailError", StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
            GameVerseError::Token(e) => {
                ApiError::new("TokenError", StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            GameVerseError::Io(e) => ApiError::internal(e.to_string()),
            GameVerseError::Serde(e) => ApiError::internal(e.to_string()),
            GameVerseError::Other(msg) => ApiError::internal(msg),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(code = self.code, error = %self.message, "request failed");
            let body = Json(json!({
                "message": "Internal Server Error",
                "status": self.status.as_u16(),
                "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            }));
            let mut response = (self.status, body).into_response();
            response
                .extensions_mut()
                .insert(InternalErrorDetail(self.message));
            return response;
        }

        let mut body = Map::new();
        body.insert("code".into(), Value::from(self.code));
        body.insert("message".into(), Value::from(self.message));
        body.extend(self.extra);
        (self.status, Json(Value::Object(body))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_statuses() {
        let cases = [
            (GameVerseError::NotFound("User".into()), StatusCode::NOT_FOUND),
            (GameVerseError::AlreadyExists("User".into()), StatusCode::CONFLICT),
            (GameVerseError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (GameVerseError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (GameVerseError::EmailNotVerified, StatusCode::FORBIDDEN),
            (GameVerseError::AlreadyVerified, StatusCode::BAD_REQUEST),
            (
                GameVerseError::RateLimited { retry_after: 60 },
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (GameVerseError::Other("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn internal_errors_hide_message_but_keep_detail() {
        let response = ApiError::internal("connection reset").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let detail = response.extensions().get::<InternalErrorDetail>().unwrap();
        assert_eq!(detail.0, "connection reset");
    }
}
