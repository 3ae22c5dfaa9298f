//! Client metadata recorded on sessions.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{Extensions, HeaderMap, Request, header, request::Parts},
};

use super::state::HasAuthBackend;

/// Trait for types that provide access to HTTP headers and extensions.
/// Implemented for both `Parts` and `Request` so the gate and the handlers
/// can share the extraction code.
pub trait HasHeadersAndExtensions {
    fn headers(&self) -> &HeaderMap;
    fn extensions(&self) -> &Extensions;
}

impl HasHeadersAndExtensions for Parts {
    fn headers(&self) -> &HeaderMap {
        &self.headers
    }
    fn extensions(&self) -> &Extensions {
        &self.extensions
    }
}

impl<B> HasHeadersAndExtensions for Request<B> {
    fn headers(&self) -> &HeaderMap {
        Request::<B>::headers(self)
    }
    fn extensions(&self) -> &Extensions {
        Request::<B>::extensions(self)
    }
}

/// Origin of a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    /// Read the client IP and user agent.
    ///
    /// With `trust_forwarded_for`, the first address of `X-Forwarded-For`
    /// wins; otherwise (or when the header is absent) the socket address
    /// from `ConnectInfo` is used.
    pub fn extract<T: HasHeadersAndExtensions>(source: &T, trust_forwarded_for: bool) -> Self {
        let headers = source.headers();

        let forwarded = trust_forwarded_for
            .then(|| headers.get("x-forwarded-for")?.to_str().ok())
            .flatten()
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .map(str::to_string);

        let ip = forwarded.or_else(|| {
            source
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ci| ci.0.ip().to_string())
        });

        let user_agent = headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Self { ip, user_agent }
    }
}

impl<S: HasAuthBackend> FromRequestParts<S> for ClientInfo {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::extract(&*parts, state.trust_forwarded_for()))
    }
}
