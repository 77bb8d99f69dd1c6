//! Request and response shapes for the channel routes

use serde::{Deserialize, Serialize};

/// Path parameters shared by the `/api/channel/:channelId...` routes
///
/// Both fields are optional so absence is reported by the handler as a
/// bad request instead of an extractor rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelPathParams {
    #[serde(rename = "channelId")]
    pub channel_id: Option<String>,

    #[serde(rename = "identityId")]
    pub identity_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelCreatedResponse {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}
