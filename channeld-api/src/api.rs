//! Route table

use super::handlers;
use super::identity::authenticate;
use super::request_metrics::track_requests;
use super::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get},
    Router,
};
use tower_http::trace::TraceLayer;

/// Channel routes with identity resolution
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/channel",
            get(handlers::get_channel).post(handlers::create_channel),
        )
        .route(
            "/api/channel/:channelId",
            delete(handlers::delete_channel).put(handlers::update_channel),
        )
        .route(
            "/api/channel/:channelId/identities",
            get(handlers::get_channel_identities),
        )
        .route(
            "/api/channel/:channelId/identities/:identityId",
            delete(handlers::delete_identity_from_channel),
        )
        .layer(middleware::from_fn(authenticate))
        .with_state(state)
}

/// Routes plus the serving stack: body limit, metrics, request tracing
pub fn build_app(state: AppState, max_body_bytes: usize) -> Router {
    build_router(state)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(middleware::from_fn(track_requests))
        .layer(TraceLayer::new_for_http())
}
