use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::users::services::SaveError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{message}")]
    Validation { field: &'static str, message: String },
    #[error("{field} is already taken")]
    Conflict { field: &'static str },
    #[error("User not found")]
    NotFound,
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<SaveError> for AppError {
    fn from(e: SaveError) -> Self {
        match e {
            SaveError::Validation(v) => AppError::Validation {
                field: v.field,
                message: v.message,
            },
            SaveError::Conflict(c) => AppError::Conflict { field: c.field },
            SaveError::NotFound => AppError::NotFound,
            SaveError::Credential(e) => AppError::Internal(e.to_string()),
            SaveError::Database(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, body) = match &self {
            AppError::Validation { field, .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "error": message, "field": field }),
            ),
            AppError::Conflict { field } => (
                StatusCode::CONFLICT,
                json!({ "error": message, "field": field }),
            ),
            AppError::NotFound => (StatusCode::NOT_FOUND, json!({ "error": message })),
            AppError::Internal(msg) => {
                error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::{repo::ConflictError, validation::ValidationError};

    #[test]
    fn save_errors_map_to_statuses() {
        let cases = [
            (
                AppError::from(SaveError::Validation(ValidationError::new("email", "bad"))),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                AppError::from(SaveError::Conflict(ConflictError { field: "username" })),
                StatusCode::CONFLICT,
            ),
            (AppError::from(SaveError::NotFound), StatusCode::NOT_FOUND),
            (
                AppError::from(SaveError::Database(sqlx::Error::PoolTimedOut)),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
