//! Rideshare dispatch server.
//!
//! This binary:
//! - Connects to Redis (locks, status cache, creation queue, trip records)
//! - Optionally stores trip records in `PostgreSQL` (feature `postgres`)
//! - Registers the Uber adapter
//! - Serves the ride API and health endpoints
//! - Runs a pool of creation workers for queued rides
//!
//! # Usage
//!
//! ```bash
//! docker run -d -p 6379:6379 redis:7-alpine
//! UBER_ACCESS_TOKEN=... cargo run --bin rideshare-server
//! ```

mod config;
mod readiness;
mod telemetry;

use config::{Config, UberSettings};
use readiness::RedisProbe;
use redis::aio::ConnectionManager;
use rideshare_dispatch::providers::{TripStore, UberConfig, UberRideProvider};
use rideshare_dispatch::stores::{RedisLockService, RedisRideQueue, RedisStatusCache};
use rideshare_dispatch::{
    ride_router, CreationWorker, ProviderRegistry, RideEnvironment, RideService, SystemClock,
};
use rideshare_web::{correlation_id_layer, health_router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();

    let config = Config::from_env();
    info!(
        bind = %config.bind_addr(),
        redis = %config.redis.url,
        uber = %config.uber.base_url,
        workers = config.worker.concurrency,
        "Configuration loaded"
    );

    telemetry::install_metrics(config.server.metrics_addr)?;

    let client = redis::Client::open(config.redis.url.as_str())?;
    let redis = ConnectionManager::new(client).await?;
    info!("Connected to Redis");

    #[cfg(feature = "postgres")]
    let trips = {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.postgres.max_connections)
            .connect(&config.postgres.url)
            .await?;
        let store = rideshare_dispatch::stores::PostgresTripStore::new(pool);
        store.migrate().await?;
        info!("PostgreSQL trip store ready");
        store
    };
    #[cfg(not(feature = "postgres"))]
    let trips = rideshare_dispatch::stores::RedisTripStore::from_manager(redis.clone());

    serve(config, redis, trips).await
}

async fn serve<S>(config: Config, redis: ConnectionManager, trips: S) -> anyhow::Result<()>
where
    S: TripStore + Clone + 'static,
{
    let registry = Arc::new(build_registry(&config.uber));

    if config.worker.visibility_timeout <= config.dispatch.provider_timeout {
        warn!(
            visibility_secs = config.worker.visibility_timeout.as_secs(),
            provider_timeout_secs = config.dispatch.provider_timeout.as_secs(),
            "Queue visibility timeout does not exceed the provider timeout; jobs may run twice"
        );
    }
    let queue = RedisRideQueue::from_manager(redis.clone())
        .with_visibility_timeout(config.worker.visibility_timeout);
    let reclaimed = queue.reclaim_expired().await?;
    if reclaimed > 0 {
        info!(count = reclaimed, "Returned abandoned creation jobs to the queue");
    }

    let env = RideEnvironment::new(
        trips.clone(),
        RedisStatusCache::from_manager(redis.clone()),
        queue.clone(),
        RedisLockService::from_manager(redis.clone()),
    );
    let service = Arc::new(RideService::new(Arc::clone(&registry), env, &config.dispatch));

    // Creation workers
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let workers: Vec<_> = (0..config.worker.concurrency)
        .map(|_| {
            let worker = CreationWorker::new(
                queue.clone(),
                trips.clone(),
                Arc::clone(&registry),
                Arc::new(SystemClock),
                config.worker.worker.clone(),
                config.dispatch.provider_timeout,
            );
            tokio::spawn(worker.run(shutdown_rx.clone()))
        })
        .collect();
    info!(count = workers.len(), "Creation workers started");

    let app = ride_router(service)
        .merge(health_router(Arc::new(RedisProbe::new(redis))))
        .layer(correlation_id_layer())
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    info!(address = %config.bind_addr(), "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // In-flight jobs finish before the workers observe the signal.
    let _ = shutdown_tx.send(true);
    match tokio::time::timeout(
        config.server.shutdown_timeout,
        futures::future::join_all(workers),
    )
    .await
    {
        Ok(results) => {
            for result in results {
                if let Err(e) = result {
                    error!(error = %e, "Creation worker task failed");
                }
            }
        }
        Err(_) => warn!(
            timeout_secs = config.server.shutdown_timeout.as_secs(),
            "Creation workers did not stop in time"
        ),
    }

    info!("Server stopped");
    Ok(())
}

fn build_registry(uber: &UberSettings) -> ProviderRegistry {
    if uber.access_token.is_empty() {
        warn!("UBER_ACCESS_TOKEN is not set; Uber calls will be rejected");
    }

    let config = UberConfig::new(uber.access_token.clone()).with_base_url(uber.base_url.as_str());
    ProviderRegistry::new().with_provider(Arc::new(UberRideProvider::new(config)))
}

/// Waits for Ctrl+C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
