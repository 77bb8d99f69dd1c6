//! Request checks applied before the channel handlers run
//!
//! Both extractors reject with [`ApiError`], so malformed input gets the same
//! JSON error body as a failed identifier check inside a handler.

use axum::{
    async_trait,
    extract::{
        path::ErrorKind as PathErrorKind, rejection::PathRejection, FromRequest,
        FromRequestParts, Path, Request,
    },
    http::{request::Parts, StatusCode},
    Json,
};
use channeld_core::ChannelDocument;
use serde_json::Value;

use crate::error::ApiError;
use crate::handlers::{INVALID_CHANNEL_ID, UNKNOWN_IDENTITY_ID};
use crate::types::ChannelPathParams;

const INVALID_PAYLOAD: &str = "Invalid channel payload";
const PAYLOAD_TOO_LARGE: &str = "Channel payload too large";

/// A JSON object body, handed to the service as-is
#[derive(Debug, Clone)]
pub struct ChannelPayload(pub ChannelDocument);

#[async_trait]
impl<S> FromRequest<S> for ChannelPayload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|rejection| {
                if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                    ApiError::PayloadTooLarge {
                        message: PAYLOAD_TOO_LARGE.to_string(),
                        details: rejection.body_text(),
                    }
                } else {
                    ApiError::BadRequest {
                        message: INVALID_PAYLOAD.to_string(),
                        details: Some(rejection.body_text()),
                    }
                }
            })?;

        ChannelDocument::from_value(value)
            .map(ChannelPayload)
            .map_err(|e| ApiError::BadRequest {
                message: INVALID_PAYLOAD.to_string(),
                details: Some(e.to_string()),
            })
    }
}

/// `channelId` / `identityId` path segments
///
/// A segment that cannot be decoded is reported with the same message the
/// handler would use for a bad value of that parameter.
#[derive(Debug, Clone, Default)]
pub struct ChannelPath(pub ChannelPathParams);

#[async_trait]
impl<S> FromRequestParts<S> for ChannelPath
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<ChannelPathParams>::from_request_parts(parts, state).await {
            Ok(Path(params)) => Ok(ChannelPath(params)),
            // No parameters matched at all: let the handler report them as missing
            Err(PathRejection::MissingPathParams(_)) => Ok(ChannelPath::default()),
            Err(rejection) => Err(path_rejection(rejection)),
        }
    }
}

fn path_rejection(rejection: PathRejection) -> ApiError {
    let details = rejection.body_text();
    let message = match &rejection {
        PathRejection::FailedToDeserializePathParams(inner) => match inner.kind() {
            PathErrorKind::InvalidUtf8InPathParam { key } if key == "identityId" => {
                UNKNOWN_IDENTITY_ID
            }
            _ => INVALID_CHANNEL_ID,
        },
        _ => INVALID_CHANNEL_ID,
    };

    ApiError::BadRequest {
        message: message.to_string(),
        details: Some(details),
    }
}
