//! Request tracking middleware.
//!
//! Every request gets a [`CorrelationId`] (taken from `X-Correlation-ID`
//! when it parses as a UUID, generated otherwise). The handler runs inside an
//! `http_request` span carrying that id and the caller's `X-Requester-ID`,
//! and the id is echoed on the response so clients can quote it.
//!
//! ```ignore
//! let app = ride_router(service).layer(rideshare_web::correlation_id_layer());
//! ```

use axum::{extract::Request, http::HeaderValue, response::Response};
use futures::future::BoxFuture;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::Instrument;
use uuid::Uuid;

use crate::extractors::{CorrelationId, REQUESTER_ID_HEADER};

/// Header carrying the correlation id in both directions.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// Layer installing [`CorrelationIdMiddleware`].
#[must_use]
pub const fn correlation_id_layer() -> CorrelationIdLayer {
    CorrelationIdLayer
}

/// See [`correlation_id_layer`].
#[derive(Clone, Copy, Debug)]
pub struct CorrelationIdLayer;

impl<S> Layer<S> for CorrelationIdLayer {
    type Service = CorrelationIdMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CorrelationIdMiddleware { inner }
    }
}

/// Wraps a service with correlation tracking.
#[derive(Clone, Debug)]
pub struct CorrelationIdMiddleware<S> {
    inner: S,
}

fn incoming_id(req: &Request) -> Uuid {
    req.headers()
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s.trim()).ok())
        .unwrap_or_else(Uuid::new_v4)
}

impl<S> Service<Request> for CorrelationIdMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let id = incoming_id(&req);
        let requester = req
            .headers()
            .get(REQUESTER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-")
            .to_string();

        let span = tracing::info_span!(
            "http_request",
            correlation_id = %id,
            requester = %requester,
            method = %req.method(),
            path = %req.uri().path(),
        );
        req.extensions_mut().insert(CorrelationId(id));

        let pending = self.inner.call(req);
        Box::pin(
            async move {
                let mut response = pending.await?;
                tracing::debug!(status = response.status().as_u16(), "Request finished");

                // Hyphenated UUIDs are always valid header values.
                if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
                    response.headers_mut().insert(CORRELATION_ID_HEADER, value);
                }
                Ok(response)
            }
            .instrument(span),
        )
    }
}
