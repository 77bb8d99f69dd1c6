//! Central response mapping for handler failures

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use channeld_core::{ChannelError, ErrorKind};
use thiserror::Error;
use tracing::{debug, error};

use crate::types::ErrorResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed request input, raised before any service call
    #[error("{message}")]
    BadRequest {
        message: String,
        details: Option<String>,
    },

    #[error("{0}")]
    Unauthorized(String),

    /// Body exceeded the configured request limit
    #[error("{message}")]
    PayloadTooLarge { message: String, details: String },

    /// Whatever the channel service returned, unchanged
    #[error(transparent)]
    Service(#[from] ChannelError),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            message: message.into(),
            details: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::BadRequest { .. } => ErrorKind::BadRequest,
            ApiError::Unauthorized(_) => ErrorKind::Unauthorized,
            ApiError::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            ApiError::Service(e) => e.kind(),
        }
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if self.kind().is_server_error() {
            error!(status = status.as_u16(), "Request failed: {}", self);
        } else {
            debug!(status = status.as_u16(), "Request rejected: {}", self);
        }

        let details = match &self {
            ApiError::BadRequest { details, .. } => details.clone(),
            ApiError::PayloadTooLarge { details, .. } => Some(details.clone()),
            _ => None,
        };
        let body = ErrorResponse {
            error: self.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
