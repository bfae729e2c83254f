//! HTTP/HTTPS probe implementation.

use std::time::{Duration, Instant};

use super::{Outcome, ProbeError};

/// Issue a GET against the given URL, following redirects, and measure
/// wall-clock latency from send to full response body.
pub async fn run_http_probe(url: &str, timeout: Duration) -> Result<Outcome, ProbeError> {
    let url = if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("http://{}", url)
    };

    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProbeError::Network(e.to_string()))?;

    let start = Instant::now();

    let response = client.get(&url).send().await.map_err(|e| {
        if e.is_timeout() {
            ProbeError::Timeout(timeout)
        } else if e.is_connect() {
            ProbeError::Refused(e.to_string())
        } else {
            ProbeError::Network(e.to_string())
        }
    })?;

    let code = response.status().as_u16();

    // Read the full body to measure complete transfer time
    let _body = response.bytes().await.map_err(|e| {
        if e.is_timeout() {
            ProbeError::Timeout(timeout)
        } else {
            ProbeError::Network(e.to_string())
        }
    })?;

    Ok(Outcome::Http {
        code,
        elapsed_ms: start.elapsed().as_secs_f64() * 1000.0,
    })
}
