use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use crate::error::GuildError;

/// A failed request, rendered as `{ "message": ... }`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

/// Store failures are logged with their full cause chain and answered with a
/// generic 500 "internal error"; the backend's message is never echoed to the
/// client. Every other variant carries its message through verbatim.
impl From<GuildError> for ApiError {
    fn from(err: GuildError) -> Self {
        match err {
            GuildError::Unauthenticated => Self::new(StatusCode::UNAUTHORIZED, err.to_string()),
            GuildError::Forbidden(message) => Self::new(StatusCode::FORBIDDEN, message),
            GuildError::BadRequest(message) => Self::bad_request(message),
            GuildError::NotFound(message) => Self::new(StatusCode::NOT_FOUND, message),
            GuildError::Store(e) => {
                error!(error = %format!("{e:#}"), "store request failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "message": self.message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guild_errors_map_to_statuses() {
        let cases = [
            (GuildError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (GuildError::forbidden("no"), StatusCode::FORBIDDEN),
            (GuildError::bad_request("bad"), StatusCode::BAD_REQUEST),
            (GuildError::not_found("gone"), StatusCode::NOT_FOUND),
            (
                GuildError::Store(anyhow::anyhow!("connection reset")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn store_errors_hide_details() {
        let api = ApiError::from(GuildError::Store(anyhow::anyhow!("password=hunter2")));
        assert_eq!(api.message, "internal error");
    }

    #[test]
    fn caller_messages_pass_through() {
        let api = ApiError::from(GuildError::forbidden("only admins can post quests"));
        assert_eq!(api.message, "only admins can post quests");
        assert_eq!(ApiError::from(GuildError::Unauthenticated).message, "unauthenticated");
    }
}
