//! Discovery event application.
//!
//! # Responsibilities
//! - Consume backend add/remove/update events from a discovery source
//! - Apply them to the backend pool in arrival order
//!
//! # Design Decisions
//! - The discovery source itself (DNS, Consul, Kubernetes endpoints) is an
//!   external collaborator; this module only consumes its event stream
//! - A single applier task preserves per-service arrival order; each event
//!   is a short, non-blocking critical section on the pool
//! - Events are idempotent by construction: duplicate adds collapse into a
//!   weight refresh, removes of unknown addresses are no-ops

use std::net::SocketAddr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::pool::BackendPool;

/// Discovery operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryOp {
    Add,
    Remove,
    Update,
}

/// One membership change for a logical service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiscoveryEvent {
    pub op: DiscoveryOp,
    pub service: String,
    pub addr: SocketAddr,
    /// Absent weight keeps the current one (or the configured default for
    /// a new backend).
    #[serde(default)]
    pub weight: Option<u32>,
}

/// Apply a single event to the pool.
pub fn apply(pool: &BackendPool, event: &DiscoveryEvent) {
    match event.op {
        DiscoveryOp::Add | DiscoveryOp::Update => {
            pool.upsert(&event.service, event.addr, event.weight);
        }
        DiscoveryOp::Remove => {
            pool.remove(&event.service, event.addr);
        }
    }
}

/// Spawn the long-lived applier task. Exits when the event stream closes or
/// shutdown is signalled.
pub fn spawn_applier(
    pool: Arc<BackendPool>,
    mut events: mpsc::UnboundedReceiver<DiscoveryEvent>,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                event = events.recv() => {
                    match event {
                        Some(event) => {
                            tracing::debug!(
                                op = ?event.op,
                                service = %event.service,
                                addr = %event.addr,
                                "Applying discovery event"
                            );
                            apply(&pool, &event);
                        }
                        None => {
                            tracing::info!("Discovery stream closed, applier exiting");
                            break;
                        }
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Discovery applier received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    })
}
