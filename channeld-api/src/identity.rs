//! Caller identity, resolved by middleware before the handlers run

use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use channeld_core::IdentityId;

use crate::error::ApiError;

/// Header carrying the caller's identity, set by the fronting gateway
pub const IDENTITY_HEADER: &str = "x-identity-id";

/// Identity of the caller making the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedIdentity(pub IdentityId);

/// Copy the identity header into the request extensions
pub async fn authenticate(mut req: Request, next: Next) -> Response {
    let identity = req
        .headers()
        .get(IDENTITY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(IdentityId::new);

    if let Some(identity) = identity {
        req.extensions_mut().insert(AuthenticatedIdentity(identity));
    }

    next.run(req).await
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedIdentity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedIdentity>()
            .cloned()
            .ok_or_else(|| ApiError::Unauthorized("Missing authenticated identity".to_string()))
    }
}
