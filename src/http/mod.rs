//! HTTP layer: inbound server, forwarding path, error surface.

pub mod error;
pub mod server;

pub use error::ProxyError;
pub use server::ProxyServer;
