//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every backend's health endpoint
//! - Flip backend health flags based on probe outcomes
//! - Evict backends whose sustained failure exceeds the eviction threshold
//!
//! # Design Decisions
//! - Runs independently of request traffic, never on the forwarding path
//! - Probe set is re-derived from pool membership each cycle; probes for
//!   backends removed mid-cycle are abandoned
//! - One probe success restores health immediately, condemnation needs
//!   `failure_threshold` consecutive failures

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::Request;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tokio::time;

use crate::config::HealthCheckConfig;
use crate::observability::metrics;
use crate::pool::backend::Backend;
use crate::pool::BackendPool;

pub struct HealthChecker {
    pool: Arc<BackendPool>,
    config: HealthCheckConfig,
    client: Client<HttpConnector, Body>,
}

impl HealthChecker {
    pub fn new(pool: Arc<BackendPool>, config: HealthCheckConfig) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            pool,
            config,
            client,
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Active health checks disabled");
            return;
        }

        tracing::info!(
            interval = self.config.interval_secs,
            path = %self.config.path,
            failure_threshold = self.config.failure_threshold,
            "Health checker starting"
        );

        let mut ticker = time::interval(Duration::from_secs(self.config.interval_secs));

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_all().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health checker received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Probe every backend currently in the pool, concurrently.
    async fn check_all(&self) {
        let mut probes = JoinSet::new();

        for (service, backend) in self.pool.all_backends() {
            let client = self.client.clone();
            let path = self.config.path.clone();
            let timeout = Duration::from_secs(self.config.timeout_secs);
            probes.spawn(async move {
                let ok = probe(&client, &backend, &path, timeout).await;
                (service, backend, ok)
            });
        }

        while let Some(joined) = probes.join_next().await {
            let Ok((service, backend, ok)) = joined else {
                continue;
            };

            // Membership may have changed while the probe was in flight.
            if !self.pool.contains(&service, backend.id) {
                tracing::debug!(service, addr = %backend.addr, "Probe abandoned, backend gone");
                continue;
            }

            if ok {
                if backend.record_probe_success(Instant::now()) {
                    tracing::info!(service, addr = %backend.addr, "Backend healthy");
                }
            } else {
                let failures = backend.record_probe_failure(Instant::now(), self.config.failure_threshold);
                if failures == self.config.failure_threshold {
                    tracing::warn!(
                        service,
                        addr = %backend.addr,
                        failures,
                        "Backend marked unhealthy"
                    );
                }
                if let Some(eviction) = self.config.eviction_threshold {
                    if failures >= eviction && self.pool.remove_by_id(&service, backend.id) {
                        tracing::warn!(
                            service,
                            addr = %backend.addr,
                            failures,
                            "Backend evicted after sustained failure"
                        );
                        continue;
                    }
                }
            }

            metrics::record_backend_health(&service, &backend.addr.to_string(), backend.is_healthy());
        }
    }
}

/// One bounded-timeout probe. Anything but a 2xx inside the timeout is a
/// failed probe.
async fn probe(
    client: &Client<HttpConnector, Body>,
    backend: &Backend,
    path: &str,
    timeout: Duration,
) -> bool {
    let uri = match backend.base_url.join(path) {
        Ok(url) => url.to_string(),
        Err(e) => {
            tracing::error!(addr = %backend.addr, path, error = %e, "Invalid probe path");
            return false;
        }
    };
    let request = match Request::builder()
        .method("GET")
        .uri(uri)
        .header("user-agent", "shunt-health-check")
        .body(Body::empty())
    {
        Ok(req) => req,
        Err(e) => {
            tracing::error!(addr = %backend.addr, error = %e, "Failed to build probe request");
            return false;
        }
    };

    match time::timeout(timeout, client.request(request)).await {
        Ok(Ok(response)) => {
            let ok = response.status().is_success();
            if !ok {
                tracing::debug!(addr = %backend.addr, status = %response.status(), "Probe failed: non-success status");
            }
            ok
        }
        Ok(Err(e)) => {
            tracing::debug!(addr = %backend.addr, error = %e, "Probe failed: connection error");
            false
        }
        Err(_) => {
            tracing::debug!(addr = %backend.addr, "Probe failed: timeout");
            false
        }
    }
}
