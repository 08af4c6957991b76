//! Handler-level error type.
//!
//! Every failure a handler can hit is converted into a JSON body of the form
//! `{"message": ..., "error": ...}` so nothing reaches the client as a bare
//! status code or a panic.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::multipart::MultipartRejection;
use serde::Serialize;
use thiserror::Error;

use crate::{
    models::{product::PriceTierError, ProductIdError},
    repository::RepositoryError,
    utils::barcode::BarcodeError,
};

#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed multipart body or too many files.
    #[error("file upload error: {0}")]
    Upload(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    PriceTier(#[from] PriceTierError),

    #[error(transparent)]
    ProductId(#[from] ProductIdError),

    #[error(transparent)]
    Barcode(#[from] BarcodeError),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::Upload(rejection.body_text())
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Upload(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Repository(RepositoryError::Duplicate(_)) => StatusCode::CONFLICT,
            // Parse and validation failures are reported as server errors,
            // the same as every other failure after the upload stage.
            Self::Validation(_)
            | Self::PriceTier(_)
            | Self::ProductId(_)
            | Self::Barcode(_)
            | Self::Repository(_)
            | Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorBody {
        match self {
            Self::NotFound(what) => ErrorBody {
                message: format!("{what} not found"),
                error: None,
            },
            Self::Upload(detail) => ErrorBody {
                message: "File upload error".to_string(),
                error: Some(detail.clone()),
            },
            Self::Conflict(detail) => ErrorBody {
                message: "Conflict".to_string(),
                error: Some(detail.clone()),
            },
            Self::Repository(RepositoryError::Duplicate(detail)) => ErrorBody {
                message: "Conflict".to_string(),
                error: Some(detail.clone()),
            },
            other => ErrorBody {
                message: "Internal Server Error".to_string(),
                error: Some(other.to_string()),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("request failed: {}", self);
        } else {
            log::debug!("request rejected ({}): {}", status, self);
        }
        (status, Json(self.body())).into_response()
    }
}
