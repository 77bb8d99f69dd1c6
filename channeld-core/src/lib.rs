pub mod channel;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;

pub use channel::{
    Channel, ChannelDocument, ChannelError, ChannelResult, ChannelService, IdentityId,
    IdentityRecord, MemoryChannelStore, ObjectId, SqliteChannelStore,
};
pub use config::Config;
pub use error::ErrorKind;
pub use logging::{init_logging, LogLevel};
