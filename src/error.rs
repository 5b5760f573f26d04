use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use sqlx::error::ErrorKind;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    /// The storage collaborator failed a read or write. Never retried here.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[source] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A household must always keep at least one member
    #[error("Membership constraint violated: {0}")]
    MembershipConstraint(String),

    /// The write collides with an existing record
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for AppError {
    /// Constraint violations are the caller's fault and keep their meaning. Everything
    /// else is an outage.
    fn from(err: sqlx::Error) -> Self {
        let classified = err
            .as_database_error()
            .and_then(|db| constraint_error(db.kind(), db.message()));

        classified.unwrap_or(AppError::StorageUnavailable(err))
    }
}

fn constraint_error(kind: ErrorKind, message: &str) -> Option<AppError> {
    match kind {
        ErrorKind::ForeignKeyViolation => Some(AppError::NotFound(format!(
            "referenced record does not exist ({})",
            message
        ))),
        ErrorKind::UniqueViolation => Some(AppError::Conflict(message.to_string())),
        ErrorKind::CheckViolation | ErrorKind::NotNullViolation => {
            Some(AppError::InvalidInput(message.to_string()))
        }
        _ => None,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::MembershipConstraint(msg) | AppError::Conflict(msg) => {
                (StatusCode::CONFLICT, msg)
            }
            AppError::StorageUnavailable(ref e) => {
                tracing::error!(error = %e, "Storage request failed");
                (StatusCode::SERVICE_UNAVAILABLE, self.to_string())
            }
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
