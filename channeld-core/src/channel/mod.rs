//! Channels, their identity memberships, and the services that store them

pub mod errors;
pub mod memory_store;
pub mod model;
pub mod object_id;
pub mod service;
pub mod storage;

pub use errors::{ChannelError, ChannelResult};
pub use memory_store::MemoryChannelStore;
pub use model::{Channel, ChannelDocument, IdentityId, IdentityRecord};
pub use object_id::{ObjectId, ObjectIdError};
pub use service::ChannelService;
pub use storage::SqliteChannelStore;
