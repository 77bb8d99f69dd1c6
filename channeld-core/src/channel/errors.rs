//! Errors produced by channel services

use super::model::IdentityId;
use super::object_id::ObjectId;
use crate::error::ErrorKind;
use thiserror::Error;

/// Result type for channel service operations
pub type ChannelResult<T> = Result<T, ChannelError>;

#[derive(Debug, Error)]
pub enum ChannelError {
    /// No channel with this identifier
    #[error("Channel not found: {0}")]
    NotFound(ObjectId),

    /// Identity is not a member of the channel
    #[error("Identity {identity} is not a member of channel {channel}")]
    IdentityNotFound { channel: ObjectId, identity: IdentityId },

    /// Identity is already a member of the channel
    #[error("Identity {identity} is already a member of channel {channel}")]
    IdentityExists { channel: ObjectId, identity: IdentityId },

    /// Document could not be interpreted as channel fields
    #[error("Invalid channel document: {0}")]
    InvalidDocument(String),

    /// Backing store failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Stored document could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ChannelError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ChannelError::NotFound(_) | ChannelError::IdentityNotFound { .. } => {
                ErrorKind::NotFound
            }
            ChannelError::IdentityExists { .. } => ErrorKind::Conflict,
            ChannelError::InvalidDocument(_) => ErrorKind::BadRequest,
            ChannelError::Storage(_) | ChannelError::Serialization(_) => ErrorKind::Internal,
        }
    }
}

impl From<serde_json::Error> for ChannelError {
    fn from(e: serde_json::Error) -> Self {
        ChannelError::Serialization(e.to_string())
    }
}

impl From<rusqlite::Error> for ChannelError {
    fn from(e: rusqlite::Error) -> Self {
        ChannelError::Storage(e.to_string())
    }
}

impl From<r2d2::Error> for ChannelError {
    fn from(e: r2d2::Error) -> Self {
        ChannelError::Storage(format!("Failed to get connection: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        let id = ObjectId::generate();
        assert_eq!(ChannelError::NotFound(id).kind(), ErrorKind::NotFound);
        assert_eq!(
            ChannelError::IdentityNotFound {
                channel: id,
                identity: IdentityId::from("alice"),
            }
            .kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            ChannelError::IdentityExists {
                channel: id,
                identity: IdentityId::from("alice"),
            }
            .kind(),
            ErrorKind::Conflict
        );
        assert_eq!(ChannelError::InvalidDocument("x".into()).kind(), ErrorKind::BadRequest);
        assert_eq!(ChannelError::Storage("disk".into()).kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_messages() {
        let id = ObjectId::parse("60f1a2b3c4d5e6f7a8b9c0d1").unwrap();
        assert_eq!(
            ChannelError::NotFound(id).to_string(),
            "Channel not found: 60f1a2b3c4d5e6f7a8b9c0d1"
        );
        assert_eq!(
            ChannelError::IdentityNotFound {
                channel: id,
                identity: IdentityId::from("bob"),
            }
            .to_string(),
            "Identity bob is not a member of channel 60f1a2b3c4d5e6f7a8b9c0d1"
        );
    }
}
