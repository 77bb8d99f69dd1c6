//! Channel route handlers
//!
//! Every handler validates its identifiers first, then awaits exactly one
//! service call. Service errors are returned untouched; `ApiError`'s
//! `IntoResponse` turns them into the final status.

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use channeld_core::{Channel, IdentityId, IdentityRecord, ObjectId};
use tracing::debug;

use crate::check_channel::{ChannelPath, ChannelPayload};
use crate::error::{ApiError, ApiResult};
use crate::identity::AuthenticatedIdentity;
use crate::state::AppState;
use crate::types::ChannelCreatedResponse;

pub const UNKNOWN_CHANNEL_ID: &str = "Unknown provided channel identifier";
pub const INVALID_CHANNEL_ID: &str = "Invalid channel object identifier format";
pub const UNKNOWN_IDENTITY_ID: &str = "Unknown provided identity identifier";

/// Presence, then format. An empty segment counts as absent.
pub fn require_channel_id(raw: Option<&str>) -> ApiResult<ObjectId> {
    let raw = raw
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request(UNKNOWN_CHANNEL_ID))?;

    ObjectId::parse(raw).map_err(|_| ApiError::bad_request(INVALID_CHANNEL_ID))
}

/// Presence only; identity identifiers have no fixed format
pub fn require_identity_id(raw: Option<&str>) -> ApiResult<IdentityId> {
    raw.filter(|s| !s.is_empty())
        .map(IdentityId::new)
        .ok_or_else(|| ApiError::bad_request(UNKNOWN_IDENTITY_ID))
}

/// GET /api/channel
pub async fn get_channel(
    State(state): State<AppState>,
    AuthenticatedIdentity(identity): AuthenticatedIdentity,
) -> ApiResult<Json<Vec<Channel>>> {
    let channels = state.channels.channels_for_identity(&identity).await?;
    Ok(Json(channels))
}

/// POST /api/channel
pub async fn create_channel(
    State(state): State<AppState>,
    ChannelPayload(document): ChannelPayload,
) -> ApiResult<(StatusCode, Json<ChannelCreatedResponse>)> {
    let created = state.channels.create_channel(document).await?;
    debug!(channel_id = %created.id, "Channel created");

    Ok((
        StatusCode::CREATED,
        Json(ChannelCreatedResponse {
            id: created.id.to_string(),
        }),
    ))
}

/// DELETE /api/channel/:channelId
pub async fn delete_channel(
    State(state): State<AppState>,
    ChannelPath(params): ChannelPath,
) -> ApiResult<StatusCode> {
    let channel_id = require_channel_id(params.channel_id.as_deref())?;

    state.channels.delete_channel(&channel_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/channel/:channelId
pub async fn update_channel(
    State(state): State<AppState>,
    ChannelPath(params): ChannelPath,
    ChannelPayload(document): ChannelPayload,
) -> ApiResult<StatusCode> {
    let channel_id = require_channel_id(params.channel_id.as_deref())?;

    state.channels.update_channel(&channel_id, document).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/channel/:channelId/identities
pub async fn get_channel_identities(
    State(state): State<AppState>,
    ChannelPath(params): ChannelPath,
) -> ApiResult<Json<Vec<IdentityRecord>>> {
    let channel_id = require_channel_id(params.channel_id.as_deref())?;

    let identities = state.channels.list_identities(&channel_id).await?;
    Ok(Json(identities.into_iter().map(IdentityRecord::from).collect()))
}

/// DELETE /api/channel/:channelId/identities/:identityId
pub async fn delete_identity_from_channel(
    State(state): State<AppState>,
    ChannelPath(params): ChannelPath,
) -> ApiResult<StatusCode> {
    let channel_id = require_channel_id(params.channel_id.as_deref())?;
    let identity_id = require_identity_id(params.identity_id.as_deref())?;

    state
        .channels
        .remove_identity(&channel_id, &identity_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
