//! Error responses.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use cchub_license::{ActivationDenied, LicenseError};
use serde::{Deserialize, Serialize};
use tokio::task::JoinError;
use tracing::{debug, error};

const INTERNAL: &str = "Something went wrong while processing your request.";

/// Body of every non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
}

/// A failed request, ready to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    message: String,
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

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.status.as_u16(),
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<ActivationDenied> for ApiError {
    fn from(denied: ActivationDenied) -> Self {
        match denied {
            ActivationDenied::NotFound => {
                Self::new(StatusCode::NOT_FOUND, "License not found or invalid.")
            }
            ActivationDenied::NotActive => {
                Self::new(StatusCode::FORBIDDEN, "This license is not active.")
            }
            ActivationDenied::LimitReached => {
                Self::new(StatusCode::FORBIDDEN, "Activation limit reached.")
            }
        }
    }
}

impl From<LicenseError> for ApiError {
    fn from(err: LicenseError) -> Self {
        match err {
            LicenseError::InvalidRequest(message) => Self::bad_request(message),
            other => {
                error!(error = %other, "request failed");
                Self::internal()
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        debug!(error = %rejection.body_text(), "rejected request body");
        Self::bad_request("Invalid request body")
    }
}

impl From<JoinError> for ApiError {
    fn from(err: JoinError) -> Self {
        error!(error = %err, "request worker failed");
        Self::internal()
    }
}
