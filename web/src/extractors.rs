//! Custom Axum extractors.
//!
//! - `CorrelationId`: the id the correlation layer assigned, or a header/new one
//! - `ClientIp`: client address from proxy headers or the connection
//! - `RequesterId`: who is asking, for idempotency scoping
//! - `IdempotencyToken`: optional client-supplied `Idempotency-Key`
//!
//! None of them reject a request.
//!
//! # Examples
//!
//! ```ignore
//! use rideshare_web::extractors::{IdempotencyToken, RequesterId};
//!
//! async fn create(
//!     requester: RequesterId,
//!     token: IdempotencyToken,
//!     Json(payload): Json<RideRequestPayload>,
//! ) -> Result<Response, AppError> {
//!     tracing::info!(requester = %requester.0, "Creating ride");
//!     // ...
//! }
//! ```

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use uuid::Uuid;

use crate::middleware::CORRELATION_ID_HEADER;

/// Header carrying an explicit requester identity.
pub const REQUESTER_ID_HEADER: &str = "X-Requester-ID";

/// Header carrying a client-chosen idempotency token.
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Longest header value accepted as a requester id or idempotency token.
const MAX_TOKEN_LEN: usize = 256;

/// Correlation ID for request tracing.
///
/// Prefers the id stored by [`correlation_id_layer`](crate::correlation_id_layer)
/// so handler logs and the response header agree. Without the layer, reads
/// `X-Correlation-ID` or generates a UUID v4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(id) = parts.extensions.get::<Self>() {
            return Ok(*id);
        }

        let correlation_id = parts
            .headers
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        Ok(Self(correlation_id))
    }
}

/// Client IP address.
///
/// # Priority
///
/// 1. `X-Forwarded-For` (first IP in the list)
/// 2. `X-Real-IP`
/// 3. Connection address, when served with `ConnectInfo`
/// 4. `127.0.0.1`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub IpAddr);

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let connect_info = parts.extensions.get::<ConnectInfo<SocketAddr>>();
        Ok(Self(extract_client_ip(&parts.headers, connect_info)))
    }
}

fn extract_client_ip(headers: &HeaderMap, connect_info: Option<&ConnectInfo<SocketAddr>>) -> IpAddr {
    let forwarded = headers
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|first| first.trim().parse::<IpAddr>().ok());
    if let Some(ip) = forwarded {
        return ip;
    }

    let real_ip = headers
        .get("X-Real-IP")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<IpAddr>().ok());
    if let Some(ip) = real_ip {
        return ip;
    }

    connect_info.map_or(IpAddr::V4(Ipv4Addr::LOCALHOST), |info| info.0.ip())
}

fn header_token(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty() && v.len() <= MAX_TOKEN_LEN)
        .map(str::to_string)
}

/// Requester identity.
///
/// The `X-Requester-ID` header when present and non-empty, otherwise the
/// client IP. Two requests from the same requester with the same logical
/// content share an idempotency key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequesterId(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for RequesterId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(id) = header_token(&parts.headers, REQUESTER_ID_HEADER) {
            return Ok(Self(id));
        }

        let ClientIp(ip) = ClientIp::from_request_parts(parts, state).await?;
        Ok(Self(ip.to_string()))
    }
}

/// Optional `Idempotency-Key` header value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdempotencyToken(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for IdempotencyToken
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(header_token(&parts.headers, IDEMPOTENCY_KEY_HEADER)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder();
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn test_correlation_id_from_header() {
        let uuid = Uuid::new_v4();
        let mut parts = parts(&[(CORRELATION_ID_HEADER, &uuid.to_string())]);

        let correlation_id = CorrelationId::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(correlation_id.0, uuid);
    }

    #[tokio::test]
    async fn test_correlation_id_prefers_extension() {
        let assigned = Uuid::new_v4();
        let mut parts = parts(&[(CORRELATION_ID_HEADER, &Uuid::new_v4().to_string())]);
        parts.extensions.insert(CorrelationId(assigned));

        let correlation_id = CorrelationId::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(correlation_id.0, assigned);
    }

    #[tokio::test]
    async fn test_client_ip_from_x_forwarded_for() {
        let mut parts = parts(&[("X-Forwarded-For", "203.0.113.1, 198.51.100.1")]);

        let client_ip = ClientIp::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(client_ip.0.to_string(), "203.0.113.1");
    }

    #[tokio::test]
    async fn test_client_ip_from_connect_info() {
        let mut parts = parts(&[]);
        let addr: SocketAddr = "192.0.2.7:5123".parse().unwrap();
        parts.extensions.insert(ConnectInfo(addr));

        let client_ip = ClientIp::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(client_ip.0.to_string(), "192.0.2.7");
    }

    #[tokio::test]
    async fn test_client_ip_fallback() {
        let mut parts = parts(&[]);

        let client_ip = ClientIp::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(client_ip.0.to_string(), "127.0.0.1");
    }

    #[tokio::test]
    async fn test_requester_id_header_wins() {
        let mut parts = parts(&[(REQUESTER_ID_HEADER, " rider-42 "), ("X-Real-IP", "198.51.100.42")]);

        let requester = RequesterId::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(requester.0, "rider-42");
    }

    #[tokio::test]
    async fn test_requester_id_falls_back_to_ip() {
        let mut parts = parts(&[(REQUESTER_ID_HEADER, "   "), ("X-Real-IP", "198.51.100.42")]);

        let requester = RequesterId::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(requester.0, "198.51.100.42");
    }

    #[tokio::test]
    async fn test_idempotency_token() {
        let mut present = parts(&[(IDEMPOTENCY_KEY_HEADER, "abc-123")]);
        let mut absent = parts(&[]);

        let token = IdempotencyToken::from_request_parts(&mut present, &()).await.unwrap();
        assert_eq!(token.0.as_deref(), Some("abc-123"));

        let token = IdempotencyToken::from_request_parts(&mut absent, &()).await.unwrap();
        assert_eq!(token.0, None);
    }
}
