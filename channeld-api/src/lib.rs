//! HTTP surface for channel CRUD and membership
//!
//! Six routes under `/api/channel`, each a thin shell over a
//! [`channeld_core::ChannelService`].

pub mod api;
pub mod check_channel;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod request_metrics;
pub mod server;
pub mod state;
pub mod types;

pub use api::{build_app, build_router};
pub use error::{ApiError, ApiResult};
pub use server::{open_store, ChannelServer};
pub use state::AppState;
