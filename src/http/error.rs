//! Errors produced on the forwarding path.
//!
//! # Design Decisions
//! - Clients get stable, low-detail bodies; backend addresses and attempt
//!   traces go to logs, not over the wire
//! - "No backend at all" and "all backends failed" are distinct statuses
//!   (503 vs 502) so operators can tell capacity loss from upstream faults

use axum::body::Body;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// A request the proxy could not complete.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("no route matched the request")]
    NoRouteMatched,

    #[error("no backend available for service '{service}'")]
    NoBackendAvailable { service: String },

    #[error("retries exhausted for service '{service}' after {attempts} attempts")]
    RetriesExhausted { service: String, attempts: u32 },

    #[error("request body exceeds the retry buffer limit")]
    BodyTooLarge,
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::NoRouteMatched => StatusCode::NOT_FOUND,
            ProxyError::NoBackendAvailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ProxyError::RetriesExhausted { .. } => StatusCode::BAD_GATEWAY,
            ProxyError::BodyTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    fn client_message(&self) -> &'static str {
        match self {
            ProxyError::NoRouteMatched => "no matching route",
            ProxyError::NoBackendAvailable { .. } => "service unavailable",
            ProxyError::RetriesExhausted { .. } => "upstream unavailable",
            ProxyError::BodyTooLarge => "request body too large",
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::debug!(error = %self, status = %status, "Request failed");
        Response::builder()
            .status(status)
            .body(Body::from(self.client_message()))
            .unwrap_or_else(|_| status.into_response())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ProxyError::NoRouteMatched.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ProxyError::NoBackendAvailable {
                service: "web".into()
            }
            .status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ProxyError::RetriesExhausted {
                service: "web".into(),
                attempts: 3
            }
            .status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_bodies_do_not_leak_backend_detail() {
        let err = ProxyError::RetriesExhausted {
            service: "internal-billing".into(),
            attempts: 3,
        };
        assert_eq!(err.client_message(), "upstream unavailable");
    }
}
