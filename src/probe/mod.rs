//! Probe strategies for network health checks.
//!
//! One strategy per protocol family: HTTP/S, TCP connect, and ICMP ping.
//! LDAP and SMTP checks reuse the TCP strategy against the protocol's
//! conventional port; they verify port reachability only, no protocol
//! handshake is attempted.

mod http;
mod ping;
mod tcp;

pub use http::*;
pub use ping::*;
pub use tcp::*;

use std::time::Duration;
use thiserror::Error;

use crate::config::{CheckKind, Endpoint};

/// Probe failure classes. Every variant is converted into a probe result at
/// the checker boundary; none of them abort the batch.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),
    #[error("connection refused: {0}")]
    Refused(String),
    #[error("DNS resolution failed: {0}")]
    Dns(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("command failed: {0}")]
    Command(String),
    #[error("invalid endpoint configuration: {0}")]
    Config(String),
}

/// Raw outcome of a successful probe, before health classification.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Http { code: u16, elapsed_ms: f64 },
    Tcp { port: u16, elapsed_ms: f64 },
    /// `avg_ms` is `None` when the host replied but timing could not be
    /// extracted from the underlying mechanism.
    Ping { avg_ms: Option<f64> },
}

/// Run the strategy matching the endpoint's check kind.
///
/// Unknown kinds are handled by the checker before dispatch; reaching here
/// with one is a configuration error.
pub async fn run_probe(endpoint: &Endpoint) -> Result<Outcome, ProbeError> {
    let timeout = endpoint.timeout();

    match &endpoint.kind {
        CheckKind::Http | CheckKind::Https => {
            let url = endpoint
                .url
                .as_deref()
                .ok_or_else(|| ProbeError::Config("http check has no url".to_string()))?;
            run_http_probe(url, timeout).await
        }
        CheckKind::Tcp | CheckKind::Ldap | CheckKind::Smtp => {
            let host = endpoint
                .host
                .as_deref()
                .ok_or_else(|| ProbeError::Config("tcp check has no host".to_string()))?;
            let port = endpoint
                .port()
                .ok_or_else(|| ProbeError::Config("tcp check has no port".to_string()))?;
            run_tcp_probe(host, port, timeout).await
        }
        CheckKind::Ping => {
            let host = endpoint
                .host
                .as_deref()
                .ok_or_else(|| ProbeError::Config("ping check has no host".to_string()))?;
            let avg_ms = run_ping_probe(host, timeout).await?;
            Ok(Outcome::Ping { avg_ms })
        }
        CheckKind::Unknown(kind) => {
            Err(ProbeError::Config(format!("unknown check type: {}", kind)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CheckKind;

    fn endpoint(kind: CheckKind) -> Endpoint {
        Endpoint {
            name: "t".to_string(),
            kind,
            url: None,
            host: None,
            port: None,
            timeout_seconds: Some(1.0),
            critical: false,
        }
    }

    #[tokio::test]
    async fn test_http_without_url_is_config_error() {
        let err = run_probe(&endpoint(CheckKind::Http)).await.unwrap_err();
        assert!(matches!(err, ProbeError::Config(_)));
    }

    #[tokio::test]
    async fn test_tcp_without_host_is_config_error() {
        let err = run_probe(&endpoint(CheckKind::Tcp)).await.unwrap_err();
        assert!(matches!(err, ProbeError::Config(_)));
    }

    #[tokio::test]
    async fn test_ldap_port_defaulted_before_dispatch() {
        // Host set but no port: the ldap default (389) must apply, so the
        // failure is a network one, not a missing-port config error.
        let mut ep = endpoint(CheckKind::Ldap);
        ep.host = Some("127.0.0.1".to_string());
        let err = run_probe(&ep).await.unwrap_err();
        assert!(!matches!(err, ProbeError::Config(_)));
    }
}
