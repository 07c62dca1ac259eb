//! Tracing and Prometheus initialisation.
//!
//! # Exported Metrics
//!
//! - `rideshare_create_dispatched{path}` - submissions by path (`sync`, `async`)
//! - `rideshare_create_duplicate` - submissions rejected by a held lease
//! - `rideshare_status_cache{outcome}` - status reads (`record`, `hit`, `miss`)
//! - `rideshare_cancel_outcome{outcome}` - cancel attempts
//! - `rideshare_worker_jobs{outcome}` - creation worker results

use metrics::describe_counter;
use metrics_exporter_prometheus::PrometheusBuilder;
use rideshare_dispatch::constants::metrics::{
    CANCEL_OUTCOME, CREATE_DISPATCHED, CREATE_DUPLICATE, STATUS_CACHE, WORKER_JOBS,
};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "rideshare_server=info,rideshare_dispatch=info,tower_http=debug";

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Install the Prometheus recorder with a scrape listener on `addr`.
///
/// # Errors
///
/// Returns an error if the recorder is already installed or the listener
/// cannot be bound.
pub fn install_metrics(addr: SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    register_metrics();

    tracing::info!(address = %addr, "Prometheus exporter listening");
    Ok(())
}

fn register_metrics() {
    describe_counter!(CREATE_DISPATCHED, "Ride submissions by dispatch path (sync, async)");
    describe_counter!(CREATE_DUPLICATE, "Ride submissions rejected while an identical one was in flight");
    describe_counter!(STATUS_CACHE, "Status reads by outcome (record, hit, miss)");
    describe_counter!(CANCEL_OUTCOME, "Cancel attempts by outcome");
    describe_counter!(WORKER_JOBS, "Creation worker deliveries by outcome");
}
