//! The control center API.
//!
//! Serves the dashboard's JSON endpoints on the main listener and liveness
//! and readiness probes on the admin listener. Endpoints backed by public
//! upstreams (Radio-Browser, provider status feeds, Wikipedia) go through
//! [`fetcher::Orchestrator`], so each of them answers with live data from
//! the first healthy mirror or with a static fallback.

pub mod api;
pub mod config;
pub mod errors;
pub mod handler;
pub mod metrics_defs;
pub mod router;
pub mod service;

use crate::errors::PortalError;
use fetcher::Orchestrator;
use service::PortalService;
use shared::admin_service::AdminService;
use shared::http::{run_http_service, serve_listener};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::net::TcpListener;

/// Publishes descriptions for the fetcher and portal metrics.
pub fn describe_metrics() {
    shared::metrics_defs::describe(fetcher::metrics_defs::ALL_METRICS);
    shared::metrics_defs::describe(metrics_defs::ALL_METRICS);
}

pub async fn run(config: config::Config) -> Result<(), PortalError> {
    let client = reqwest::Client::builder().build()?;
    let router = api::build_router(&config.upstreams, Orchestrator::with_client(client))?;

    // Not ready until the public listener is bound
    let ready = Arc::new(AtomicBool::new(false));
    let is_ready = ready.clone();
    let admin_task = run_http_service(
        &config.admin_listener.host,
        config.admin_listener.port,
        AdminService::<_, PortalError>::new(move || is_ready.load(Ordering::Relaxed)),
    );

    let portal_task = async {
        let (host, port) = (&config.listener.host, config.listener.port);
        let listener = TcpListener::bind(format!("{host}:{port}")).await?;
        tracing::info!(host, port, "Portal listening");
        ready.store(true, Ordering::Relaxed);
        serve_listener(listener, PortalService::new(router)).await
    };

    tokio::try_join!(portal_task, admin_task)?;
    Ok(())
}
