//! The data-access contract the HTTP layer delegates to

use super::errors::ChannelResult;
use super::model::{Channel, ChannelDocument, IdentityId};
use super::object_id::ObjectId;
use async_trait::async_trait;

/// Persistence and membership operations on channels
///
/// Implementations own all state. Callers hand over identifiers that have
/// already passed format validation.
#[async_trait]
pub trait ChannelService: Send + Sync {
    /// Channels the identity belongs to, oldest first
    async fn channels_for_identity(&self, identity: &IdentityId) -> ChannelResult<Vec<Channel>>;

    /// Create a channel from an opaque document
    async fn create_channel(&self, document: ChannelDocument) -> ChannelResult<Channel>;

    async fn delete_channel(&self, channel_id: &ObjectId) -> ChannelResult<()>;

    /// Merge the document into an existing channel
    async fn update_channel(
        &self,
        channel_id: &ObjectId,
        document: ChannelDocument,
    ) -> ChannelResult<()>;

    /// Members of a channel in insertion order
    async fn list_identities(&self, channel_id: &ObjectId) -> ChannelResult<Vec<IdentityId>>;

    async fn add_identity(&self, channel_id: &ObjectId, identity: IdentityId)
        -> ChannelResult<()>;

    async fn remove_identity(
        &self,
        channel_id: &ObjectId,
        identity: &IdentityId,
    ) -> ChannelResult<()>;
}
