//! Health check endpoints.
//!
//! Used by load balancers and orchestrators:
//!
//! - `GET /health` - liveness, never touches dependencies
//! - `GET /health/ready` - readiness, asks a [`ReadinessProbe`]

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;

/// Dependency check behind the readiness endpoint.
pub trait ReadinessProbe: Send + Sync {
    /// `Err(reason)` when a dependency the service needs is unreachable.
    fn check(&self) -> impl std::future::Future<Output = Result<(), String>> + Send;
}

/// Readiness response body.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Readiness {
    /// `ready` or `unavailable`.
    pub status: &'static str,
    /// Why the service is not ready.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Liveness endpoint.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// Readiness endpoint.
///
/// # Status Codes
///
/// - 200 OK: every dependency answered
/// - 503 Service Unavailable: the probe failed
pub async fn readiness_check<P>(State(probe): State<Arc<P>>) -> (StatusCode, Json<Readiness>)
where
    P: ReadinessProbe + 'static,
{
    match probe.check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(Readiness {
                status: "ready",
                reason: None,
            }),
        ),
        Err(reason) => {
            tracing::warn!(reason = %reason, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(Readiness {
                    status: "unavailable",
                    reason: Some(reason),
                }),
            )
        }
    }
}

/// Router serving both health endpoints.
pub fn health_router<P>(probe: Arc<P>) -> Router
where
    P: ReadinessProbe + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .route("/health/ready", get(readiness_check::<P>))
        .with_state(probe)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    struct FixedProbe(Result<(), String>);

    impl ReadinessProbe for FixedProbe {
        async fn check(&self) -> Result<(), String> {
            self.0.clone()
        }
    }

    #[tokio::test]
    async fn test_simple_health_check() {
        let (status, body) = health_check().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn test_ready_when_probe_passes() {
        let (status, Json(body)) = readiness_check(State(Arc::new(FixedProbe(Ok(()))))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "ready");
    }

    #[tokio::test]
    async fn test_unavailable_when_probe_fails() {
        let app = health_router(Arc::new(FixedProbe(Err("redis: connection refused".into()))));
        let request = Request::builder()
            .uri("/health/ready")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
