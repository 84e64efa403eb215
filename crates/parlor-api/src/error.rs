use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{error, warn};

use parlor_types::api::ErrorResponse;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// Every violated constraint, reported together.
    #[error("invalid input: {}", .0.join("; "))]
    InvalidInput(Vec<String>),

    /// Duplicate name, or a message from someone who is not registered.
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    /// Storage busy, locked, unreachable or too slow. Safe to retry.
    #[error("storage unavailable: {0}")]
    TransientStorage(String),

    #[error(transparent)]
    Unexpected(anyhow::Error),
}

impl ChatError {
    /// Classify an error coming out of the storage layer.
    pub fn storage(err: anyhow::Error) -> Self {
        if parlor_db::is_transient(&err) {
            Self::TransientStorage(format!("{:#}", err))
        } else {
            Self::Unexpected(err)
        }
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        match self {
            Self::InvalidInput(messages) => {
                (StatusCode::UNPROCESSABLE_ENTITY, Json(messages)).into_response()
            }
            Self::Conflict(error) => {
                (StatusCode::CONFLICT, Json(ErrorResponse { error })).into_response()
            }
            Self::NotFound(error) => {
                (StatusCode::NOT_FOUND, Json(ErrorResponse { error })).into_response()
            }
            Self::TransientStorage(error) => {
                warn!("Transient storage failure: {}", error);
                (StatusCode::SERVICE_UNAVAILABLE, Json(ErrorResponse { error })).into_response()
            }
            Self::Unexpected(e) => {
                error!("Unexpected error: {:#}", e);
                let body = ErrorResponse {
                    error: "internal server error".into(),
                };
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        let cases = [
            (ChatError::InvalidInput(vec!["bad".into()]), StatusCode::UNPROCESSABLE_ENTITY),
            (ChatError::Conflict("taken".into()), StatusCode::CONFLICT),
            (ChatError::NotFound("gone".into()), StatusCode::NOT_FOUND),
            (ChatError::TransientStorage("busy".into()), StatusCode::SERVICE_UNAVAILABLE),
            (ChatError::Unexpected(anyhow::anyhow!("boom")), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn non_sqlite_storage_errors_are_unexpected() {
        let err = ChatError::storage(anyhow::anyhow!("DB lock poisoned"));
        assert!(matches!(err, ChatError::Unexpected(_)));
    }
}
