//! Process-local channel store

use super::errors::{ChannelError, ChannelResult};
use super::model::{Channel, ChannelDocument, IdentityId};
use super::object_id::ObjectId;
use super::service::ChannelService;
use crate::metrics::record_store_op;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Channel store backed by a `HashMap`
///
/// Writes are serialized by the lock; nothing survives a restart.
#[derive(Default)]
pub struct MemoryChannelStore {
    channels: RwLock<HashMap<ObjectId, Channel>>,
}

impl MemoryChannelStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored channels
    pub async fn len(&self) -> usize {
        self.channels.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.channels.read().await.is_empty()
    }
}

#[async_trait]
impl ChannelService for MemoryChannelStore {
    async fn channels_for_identity(&self, identity: &IdentityId) -> ChannelResult<Vec<Channel>> {
        record_store_op("channels_for_identity");
        let channels = self.channels.read().await;

        let mut found: Vec<Channel> = channels
            .values()
            .filter(|c| c.has_identity(identity))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        Ok(found)
    }

    async fn create_channel(&self, document: ChannelDocument) -> ChannelResult<Channel> {
        record_store_op("create_channel");
        let channel = Channel::new(document)?;

        self.channels.write().await.insert(channel.id, channel.clone());
        debug!(channel_id = %channel.id, "Created channel");

        Ok(channel)
    }

    async fn delete_channel(&self, channel_id: &ObjectId) -> ChannelResult<()> {
        record_store_op("delete_channel");
        self.channels
            .write()
            .await
            .remove(channel_id)
            .map(|_| ())
            .ok_or(ChannelError::NotFound(*channel_id))
    }

    async fn update_channel(
        &self,
        channel_id: &ObjectId,
        document: ChannelDocument,
    ) -> ChannelResult<()> {
        record_store_op("update_channel");
        let mut channels = self.channels.write().await;
        let channel = channels
            .get_mut(channel_id)
            .ok_or(ChannelError::NotFound(*channel_id))?;

        channel.apply_update(document)
    }

    async fn list_identities(&self, channel_id: &ObjectId) -> ChannelResult<Vec<IdentityId>> {
        record_store_op("list_identities");
        self.channels
            .read()
            .await
            .get(channel_id)
            .map(|c| c.identities.clone())
            .ok_or(ChannelError::NotFound(*channel_id))
    }

    async fn add_identity(
        &self,
        channel_id: &ObjectId,
        identity: IdentityId,
    ) -> ChannelResult<()> {
        record_store_op("add_identity");
        let mut channels = self.channels.write().await;
        channels
            .get_mut(channel_id)
            .ok_or(ChannelError::NotFound(*channel_id))?
            .add_identity(identity)
    }

    async fn remove_identity(
        &self,
        channel_id: &ObjectId,
        identity: &IdentityId,
    ) -> ChannelResult<()> {
        record_store_op("remove_identity");
        let mut channels = self.channels.write().await;
        channels
            .get_mut(channel_id)
            .ok_or(ChannelError::NotFound(*channel_id))?
            .remove_identity(identity)
    }
}
