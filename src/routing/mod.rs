//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → router.rs (priority-ordered route table)
//!     → matcher.rs (host / path-prefix conditions)
//!     → logical service name, or explicit no-match
//! ```

pub mod matcher;
pub mod router;

pub use router::RouteTable;
