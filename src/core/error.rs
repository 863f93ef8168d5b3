use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    response::IntoResponse,
    Json,
};

use super::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum HelpdeskError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Integrity error: {0}")]
    Integrity(String),
    #[error("Fatal store error: {0}")]
    Fatal(String),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type HelpdeskResult<T> = Result<T, HelpdeskError>;

impl HelpdeskError {
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<StoreError> for HelpdeskError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(msg) => Self::Conflict(msg),
            StoreError::HistoryAppend(msg) => Self::Integrity(format!(
                "history append failed, mutation rolled back: {msg}"
            )),
            StoreError::RollbackFailed(msg) => Self::Fatal(msg),
            StoreError::MissingRow(msg) => Self::NotFound(msg),
            StoreError::Database(msg) | StoreError::Corrupt(msg) => Self::Database(msg),
        }
    }
}

impl From<tokio::task::JoinError> for HelpdeskError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<JsonRejection> for HelpdeskError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<PathRejection> for HelpdeskError {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation(format!("Invalid path parameter: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for HelpdeskError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(format!("Invalid query string: {}", rejection.body_text()))
    }
}

impl IntoResponse for HelpdeskError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;
        let (status, message) = match &self {
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            // Store and driver details stay in the log.
            Self::Integrity(_) => {
                log::error!("Request failed: {self}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "The change was not saved because its audit record could not be written"
                        .to_string(),
                )
            }
            Self::Fatal(_) | Self::Database(_) | Self::Internal(_) => {
                log::error!("Request failed: {self}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
