//! Route lookup: inbound request → logical service name.
//!
//! # Design Decisions
//! - Immutable after construction, shared via `Arc` without locks
//! - Routes are checked highest priority first; ties keep config order
//! - Explicit `None` on no match rather than a silent default service

use axum::body::Body;
use axum::http::Request;

use crate::config::RouteConfig;
use crate::routing::matcher::{AndMatcher, HostMatcher, Matcher, PathPrefixMatcher};

/// A compiled route: match conditions plus the target service.
#[derive(Debug)]
struct CompiledRoute {
    name: String,
    service: String,
    matcher: AndMatcher,
    priority: u32,
}

/// Ordered route table resolving requests to logical service names.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<CompiledRoute>,
}

impl RouteTable {
    pub fn from_config(configs: Vec<RouteConfig>) -> Self {
        let mut routes: Vec<CompiledRoute> = configs
            .into_iter()
            .map(|config| {
                let mut matchers: Vec<Box<dyn Matcher>> = Vec::new();
                if let Some(host) = &config.host {
                    matchers.push(Box::new(HostMatcher::new(host.clone())));
                }
                if let Some(prefix) = &config.path_prefix {
                    matchers.push(Box::new(PathPrefixMatcher::new(prefix.clone())));
                }
                CompiledRoute {
                    name: config.name,
                    service: config.service,
                    matcher: AndMatcher::new(matchers),
                    priority: config.priority,
                }
            })
            .collect();

        // Stable sort keeps config order within equal priorities.
        routes.sort_by(|a, b| b.priority.cmp(&a.priority));
        Self { routes }
    }

    /// Resolve a request to `(route name, service name)`.
    pub fn resolve(&self, req: &Request<Body>) -> Option<(&str, &str)> {
        self.routes
            .iter()
            .find(|r| r.matcher.matches(req))
            .map(|r| (r.name.as_str(), r.service.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
