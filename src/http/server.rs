//! HTTP server setup and the forwarding path.
//!
//! # Responsibilities
//! - Create the Axum router and wire middleware (tracing, request ID)
//! - Dispatch requests through the route table to a logical service
//! - Select a backend, forward with a per-attempt timeout, retry on failure
//! - Feed attempt outcomes back into circuit breakers
//!
//! # Design Decisions
//! - One attempt never reuses a backend this request already tried; when the
//!   tried set exhausts the eligible set, the request fails rather than
//!   hammering a backend that just failed
//! - Request bodies are buffered up to a fixed cap so retries can replay
//!   them; larger bodies are refused up front
//! - Attempt outcomes are reported through the pool, which discards them if
//!   the backend has been removed mid-flight

use std::collections::HashSet;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::uri::{Authority, Scheme},
    http::{header, HeaderValue, Request, Uri},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::balancer::WeightedRoundRobin;
use crate::config::{ForwardingConfig, ProxyConfig};
use crate::health::HealthChecker;
use crate::http::error::ProxyError;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::pool::backend::Backend;
use crate::pool::{BackendPool, PoolSettings};
use crate::resilience::backoff::calculate_backoff;
use crate::routing::RouteTable;

/// Bodies beyond this are refused rather than forwarded unreplayably.
const MAX_BUFFERED_BODY: usize = 1024 * 1024;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<RouteTable>,
    pub pool: Arc<BackendPool>,
    pub client: Client<HttpConnector, Body>,
    pub forwarding: ForwardingConfig,
}

/// The proxy server: route table, backend pool and listener loop.
pub struct ProxyServer {
    router: Router,
    config: ProxyConfig,
    pool: Arc<BackendPool>,
}

impl ProxyServer {
    pub fn new(config: ProxyConfig) -> Self {
        let routes = Arc::new(RouteTable::from_config(config.routes.clone()));
        if routes.is_empty() {
            tracing::warn!("No routes configured, every request will 404");
        }

        let settings = PoolSettings {
            circuit_failure_threshold: config.circuit_breaker.failure_threshold,
            circuit_open_timeout: config.circuit_breaker.open_timeout(),
            default_weight: config.default_weight.max(1),
            // Without probing, nothing would ever mark a backend healthy.
            assume_healthy: !config.health_check.enabled,
        };
        let pool = Arc::new(BackendPool::new(
            settings,
            Arc::new(WeightedRoundRobin::new()),
        ));
        Self::seed_pool(&pool, &config);

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let state = AppState {
            routes,
            pool: pool.clone(),
            client,
            forwarding: config.forwarding.clone(),
        };

        let router = Self::build_router(state);
        Self {
            router,
            config,
            pool,
        }
    }

    /// Seed the pool from statically configured services. Addresses were
    /// validated at load time; anything unparseable here is skipped loudly.
    fn seed_pool(pool: &BackendPool, config: &ProxyConfig) {
        for service in &config.services {
            for seed in &service.backends {
                match seed.address.parse::<SocketAddr>() {
                    Ok(addr) => {
                        pool.upsert(&service.name, addr, seed.weight);
                    }
                    Err(e) => {
                        tracing::error!(
                            service = %service.name,
                            address = %seed.address,
                            error = %e,
                            "Skipping unparseable backend address"
                        );
                    }
                }
            }
        }
        tracing::info!(backends = pool.backend_count(), "Backend pool seeded");
    }

    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
    }

    /// The shared pool, for wiring the discovery applier.
    pub fn pool(&self) -> Arc<BackendPool> {
        self.pool.clone()
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Run the server until shutdown is signalled.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        if self.config.health_check.enabled {
            let checker = HealthChecker::new(self.pool.clone(), self.config.health_check.clone());
            let rx = shutdown.subscribe();
            tokio::spawn(async move {
                checker.run(rx).await;
            });
        }

        let mut rx = shutdown.subscribe();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = rx.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main proxy handler: route, select, forward, retry.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();

    let Some((route, service)) = state.routes.resolve(&request) else {
        tracing::debug!(path = request.uri().path(), "No route matched");
        metrics::record_request(&method, 404, "none", start);
        return ProxyError::NoRouteMatched.into_response();
    };
    let route = route.to_string();
    let service = service.to_string();

    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let (parts, body) = request.into_parts();
    let body_bytes = match axum::body::to_bytes(body, MAX_BUFFERED_BODY).await {
        Ok(bytes) => bytes,
        Err(_) => {
            metrics::record_request(&method, 413, &route, start);
            return ProxyError::BodyTooLarge.into_response();
        }
    };

    let max_attempts = 1 + state.forwarding.max_retries;
    let mut tried: HashSet<uuid::Uuid> = HashSet::new();

    loop {
        let Some(backend) = state.pool.select(&service, &tried) else {
            // Nothing eligible: either the service is bare or this request
            // already burned every eligible backend.
            let error = if tried.is_empty() {
                ProxyError::NoBackendAvailable {
                    service: service.clone(),
                }
            } else {
                ProxyError::RetriesExhausted {
                    service: service.clone(),
                    attempts: tried.len() as u32,
                }
            };
            tracing::warn!(
                request_id = %request_id,
                service = %service,
                attempts = tried.len(),
                "Request failed: {error}"
            );
            metrics::record_request(&method, error.status().as_u16(), &route, start);
            return error.into_response();
        };
        tried.insert(backend.id);
        let attempt = tried.len() as u32;

        match forward(&state, &parts, &body_bytes, &backend, &request_id).await {
            AttemptOutcome::Success(response) => {
                state.pool.report_success(&service, &backend);
                metrics::record_attempt(&service, &backend.addr.to_string(), "ok");
                metrics::record_request(&method, response.status().as_u16(), &route, start);
                return response;
            }
            AttemptOutcome::Failure(reason) => {
                state.pool.report_failure(&service, &backend);
                metrics::record_attempt(&service, &backend.addr.to_string(), reason);
                metrics::record_circuit_state(
                    &service,
                    &backend.addr.to_string(),
                    backend.circuit_state(),
                );

                if attempt >= max_attempts {
                    tracing::warn!(
                        request_id = %request_id,
                        service = %service,
                        attempts = attempt,
                        "Retries exhausted"
                    );
                    metrics::record_request(&method, 502, &route, start);
                    return ProxyError::RetriesExhausted {
                        service,
                        attempts: attempt,
                    }
                    .into_response();
                }

                let delay = calculate_backoff(
                    attempt,
                    state.forwarding.retry_base_delay_ms,
                    state.forwarding.retry_max_delay_ms,
                );
                tracing::info!(
                    request_id = %request_id,
                    service = %service,
                    addr = %backend.addr,
                    attempt,
                    reason,
                    delay_ms = delay.as_millis() as u64,
                    "Attempt failed, retrying on another backend"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// One forwarding attempt: success carries the upstream response through
/// unchanged, failure names why for logs and metrics.
enum AttemptOutcome {
    Success(Response),
    Failure(&'static str),
}

async fn forward(
    state: &AppState,
    parts: &axum::http::request::Parts,
    body: &axum::body::Bytes,
    backend: &Backend,
    request_id: &str,
) -> AttemptOutcome {
    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.scheme = Some(Scheme::HTTP);
    uri_parts.authority = match Authority::from_str(&backend.addr.to_string()) {
        Ok(authority) => Some(authority),
        Err(e) => {
            tracing::error!(addr = %backend.addr, error = %e, "Invalid backend authority");
            return AttemptOutcome::Failure("error");
        }
    };
    let Ok(uri) = Uri::from_parts(uri_parts) else {
        return AttemptOutcome::Failure("error");
    };

    let mut builder = Request::builder()
        .method(parts.method.clone())
        .uri(uri)
        .version(parts.version);
    if let Some(headers) = builder.headers_mut() {
        for (name, value) in parts.headers.iter() {
            if name != header::HOST {
                headers.insert(name.clone(), value.clone());
            }
        }
        if let Ok(id) = HeaderValue::from_str(request_id) {
            headers.insert("x-request-id", id);
        }
    }
    let request = match builder.body(Body::from(body.clone())) {
        Ok(request) => request,
        Err(e) => {
            tracing::error!(addr = %backend.addr, error = %e, "Failed to build upstream request");
            return AttemptOutcome::Failure("error");
        }
    };

    let timeout = state.forwarding.request_timeout();
    match tokio::time::timeout(timeout, state.client.request(request)).await {
        Ok(Ok(response)) => {
            let status = response.status().as_u16();
            if state.forwarding.retryable_statuses.contains(&status) {
                tracing::debug!(addr = %backend.addr, status, "Retryable upstream status");
                return AttemptOutcome::Failure("retryable_status");
            }
            let (parts, body) = response.into_parts();
            AttemptOutcome::Success(Response::from_parts(parts, Body::new(body)))
        }
        Ok(Err(e)) => {
            tracing::debug!(addr = %backend.addr, error = %e, "Upstream connection error");
            AttemptOutcome::Failure("error")
        }
        Err(_) => {
            tracing::debug!(addr = %backend.addr, timeout = ?timeout, "Upstream attempt timed out");
            AttemptOutcome::Failure("timeout")
        }
    }
}
