use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::crawler::FetchError;
use crate::summarizer::StructureError;

#[derive(Serialize)]
struct ErrorBody {
    detail: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    message: String,
    source: &'static str,
}

/// Request-level error: every stage failure is converted into one of these at
/// the stage boundary and carries the stage that produced it.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Structure(#[from] StructureError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Fetch(FetchError::InvalidUrl(_) | FetchError::EmptyContent(_)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Fetch(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Structure(StructureError::NotConfigured) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Structure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Which pipeline stage failed, as reported in the error body.
    pub fn source(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation",
            ApiError::Fetch(_) => "crawler",
            ApiError::Structure(_) => "summarizer",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(ErrorBody {
            detail: ErrorDetail {
                message: self.to_string(),
                source: self.source(),
            },
        });

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
