//! TCP connect probe implementation.

use std::time::{Duration, Instant};

use tokio::net::TcpStream;

use super::{Outcome, ProbeError};

/// Open a TCP connection to host:port within the timeout and measure how
/// long the connect took. The connection is closed immediately on success.
pub async fn run_tcp_probe(host: &str, port: u16, timeout: Duration) -> Result<Outcome, ProbeError> {
    let start = Instant::now();

    let connect = async {
        // Resolve explicitly so DNS failures classify separately from
        // refused or filtered ports.
        let addr = tokio::net::lookup_host((host, port))
            .await
            .map_err(|e| ProbeError::Dns(e.to_string()))?
            .next()
            .ok_or_else(|| ProbeError::Dns(format!("no addresses found for {}", host)))?;

        let stream = TcpStream::connect(addr).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::ConnectionRefused {
                ProbeError::Refused(e.to_string())
            } else {
                ProbeError::Network(e.to_string())
            }
        })?;
        drop(stream);

        Ok(start.elapsed().as_secs_f64() * 1000.0)
    };

    match tokio::time::timeout(timeout, connect).await {
        Ok(Ok(elapsed_ms)) => Ok(Outcome::Tcp { port, elapsed_ms }),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(ProbeError::Timeout(timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_tcp_probe_open_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let outcome = run_tcp_probe("127.0.0.1", addr.port(), Duration::from_secs(1))
            .await
            .unwrap();
        match outcome {
            Outcome::Tcp { port, elapsed_ms } => {
                assert_eq!(port, addr.port());
                assert!(elapsed_ms < 1000.0);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_tcp_probe_closed_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = run_tcp_probe("127.0.0.1", addr.port(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::Refused(_)));
    }

    #[tokio::test]
    async fn test_tcp_probe_dns_failure() {
        let err = run_tcp_probe(
            "no-such-host.invalid",
            80,
            Duration::from_secs(2),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ProbeError::Dns(_)));
    }
}
