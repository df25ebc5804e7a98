use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::scheduler::{ErrorKind, SchedulerError};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("{0}")]
    BadRequest(String),

    #[error("server busy, try again")]
    Overloaded,

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Overloaded => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Scheduler(e) => match e.kind() {
                ErrorKind::Validation => StatusCode::BAD_REQUEST,
                ErrorKind::Conflict => StatusCode::CONFLICT,
                ErrorKind::Forbidden => StatusCode::FORBIDDEN,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Store => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Store details are logged where they happen, not sent to clients.
        let message = match &self {
            ApiError::Scheduler(e) if e.kind() == ErrorKind::Store => "internal error".to_string(),
            other => other.to_string(),
        };

        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}
