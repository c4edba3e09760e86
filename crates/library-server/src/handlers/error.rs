//! Error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use library_core::LibraryError;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] LibraryError),

    #[error("{0:#}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Domain(e) => match e {
                LibraryError::NotFound(_) => StatusCode::NOT_FOUND,
                LibraryError::AlreadyExists(_) => StatusCode::CONFLICT,
                LibraryError::InvalidCredential => StatusCode::UNAUTHORIZED,
                LibraryError::InvalidIdentifier(_) | LibraryError::Validation(_) => {
                    StatusCode::BAD_REQUEST
                }
                LibraryError::EmptyCollection(_) => StatusCode::OK,
                LibraryError::Timeout(_)
                | LibraryError::Persistence(_)
                | LibraryError::CredentialCodec(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Domain(e) => e.code(),
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // An empty table is a normal listing, not a fault
        if let ApiError::Domain(LibraryError::EmptyCollection(entity)) = &self {
            debug!("No {} records", entity);
            return Json(json!({ "result": [] })).into_response();
        }

        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            debug!("Request rejected ({}): {}", status, self);
        }

        let body = Json(json!({
            "error": self.to_string(),
            "code": self.code()
        }));
        (status, body).into_response()
    }
}
