use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::models::job::JobStatus;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("job not found")]
    JobNotFound,

    #[error("order not found")]
    OrderNotFound,

    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },

    #[error("invalid order transition: {0}")]
    InvalidOrderTransition(String),

    #[error("job already accepted")]
    JobAlreadyAccepted,

    #[error("actor is not allowed to perform this transition")]
    UnauthorizedActor,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("job references no resolvable order")]
    DataIntegrity,

    #[error("dependency failure: {0}")]
    Dependency(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Dependency(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::JobNotFound | AppError::OrderNotFound => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            AppError::InvalidTransition { .. } | AppError::InvalidOrderTransition(_) => {
                (StatusCode::CONFLICT, self.to_string())
            }
            AppError::JobAlreadyAccepted => (StatusCode::CONFLICT, self.to_string()),
            AppError::UnauthorizedActor => (StatusCode::FORBIDDEN, self.to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::DataIntegrity | AppError::Dependency(_) => {
                tracing::error!(error = %self, "request failed on internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
