//! End-to-end proxy behavior: routing, selection, and live membership.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use shunt::config::{BackendSeed, ProxyConfig, RouteConfig, ServiceConfig};
use shunt::{discovery, DiscoveryEvent, DiscoveryOp, ProxyServer, Shutdown};

mod common;

fn base_config(proxy_addr: SocketAddr) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = proxy_addr.to_string();
    config.health_check.enabled = false;
    config.routes.push(RouteConfig {
        name: "all".into(),
        host: None,
        path_prefix: Some("/".into()),
        service: "web".into(),
        priority: 0,
    });
    config.services.push(ServiceConfig {
        name: "web".into(),
        backends: Vec::new(),
    });
    config
}

fn seed(config: &mut ProxyConfig, addr: SocketAddr, weight: Option<u32>) {
    config.services[0].backends.push(BackendSeed {
        address: addr.to_string(),
        weight,
    });
}

async fn spawn_proxy(config: ProxyConfig, proxy_addr: SocketAddr) -> (ProxyHandle, Shutdown) {
    let shutdown = Shutdown::new();
    let server = ProxyServer::new(config);
    let pool = server.pool();
    let listener = tokio::net::TcpListener::bind(proxy_addr).await.unwrap();
    let server_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });
    tokio::time::sleep(Duration::from_millis(200)).await;
    (ProxyHandle { pool }, shutdown)
}

struct ProxyHandle {
    pool: std::sync::Arc<shunt::BackendPool>,
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_service_with_no_backends_fails_fast_with_503() {
    let proxy_addr: SocketAddr = "127.0.0.1:29101".parse().unwrap();
    let (_handle, shutdown) = spawn_proxy(base_config(proxy_addr), proxy_addr).await;

    let started = Instant::now();
    let res = client()
        .get(format!("http://{proxy_addr}/"))
        .send()
        .await
        .expect("Proxy unreachable");

    assert_eq!(res.status(), 503);
    assert_eq!(res.text().await.unwrap(), "service unavailable");
    assert!(
        started.elapsed() < Duration::from_secs(1),
        "empty service must fail fast, not time out"
    );

    shutdown.trigger();
}

#[tokio::test]
async fn test_unmatched_request_is_404() {
    let proxy_addr: SocketAddr = "127.0.0.1:29111".parse().unwrap();
    let mut config = base_config(proxy_addr);
    config.routes[0].path_prefix = Some("/api".into());

    let (_handle, shutdown) = spawn_proxy(config, proxy_addr).await;

    let res = client()
        .get(format!("http://{proxy_addr}/other"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);

    shutdown.trigger();
}

#[tokio::test]
async fn test_forwards_to_configured_backend() {
    let backend_addr: SocketAddr = "127.0.0.1:29121".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:29122".parse().unwrap();

    common::start_mock_backend(backend_addr, "hello from b1").await;

    let mut config = base_config(proxy_addr);
    seed(&mut config, backend_addr, None);
    let (_handle, shutdown) = spawn_proxy(config, proxy_addr).await;

    let res = client()
        .get(format!("http://{proxy_addr}/anything"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "hello from b1");

    shutdown.trigger();
}

#[tokio::test]
async fn test_weighted_round_robin_distribution() {
    let b1_addr: SocketAddr = "127.0.0.1:29131".parse().unwrap();
    let b2_addr: SocketAddr = "127.0.0.1:29132".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:29133".parse().unwrap();

    common::start_mock_backend(b1_addr, "b1").await;
    common::start_mock_backend(b2_addr, "b2").await;

    let mut config = base_config(proxy_addr);
    seed(&mut config, b1_addr, Some(3));
    seed(&mut config, b2_addr, Some(1));
    let (_handle, shutdown) = spawn_proxy(config, proxy_addr).await;

    let client = client();
    let mut b1_hits = 0;
    let mut b2_hits = 0;
    for _ in 0..8 {
        let body = client
            .get(format!("http://{proxy_addr}/"))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        match body.as_str() {
            "b1" => b1_hits += 1,
            "b2" => b2_hits += 1,
            other => panic!("unexpected body {other}"),
        }
    }

    // Weights 3:1 over two full cycles.
    assert_eq!(b1_hits, 6);
    assert_eq!(b2_hits, 2);

    shutdown.trigger();
}

#[tokio::test]
async fn test_discovery_events_change_membership_live() {
    let backend_addr: SocketAddr = "127.0.0.1:29141".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:29142".parse().unwrap();

    common::start_mock_backend(backend_addr, "discovered").await;

    let (handle, shutdown) = spawn_proxy(base_config(proxy_addr), proxy_addr).await;

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    discovery::spawn_applier(handle.pool.clone(), events_rx, shutdown.subscribe());

    let client = client();

    // Empty service: 503.
    let res = client.get(format!("http://{proxy_addr}/")).send().await.unwrap();
    assert_eq!(res.status(), 503);

    events_tx
        .send(DiscoveryEvent {
            op: DiscoveryOp::Add,
            service: "web".into(),
            addr: backend_addr,
            weight: None,
        })
        .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let res = client.get(format!("http://{proxy_addr}/")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "discovered");

    events_tx
        .send(DiscoveryEvent {
            op: DiscoveryOp::Remove,
            service: "web".into(),
            addr: backend_addr,
            weight: None,
        })
        .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let res = client.get(format!("http://{proxy_addr}/")).send().await.unwrap();
    assert_eq!(res.status(), 503);

    shutdown.trigger();
}
