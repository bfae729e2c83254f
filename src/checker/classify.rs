//! Health classification of raw probe outcomes.
//!
//! The latency thresholds here are the single source of truth for every
//! strategy that reports a measurement.

use chrono::Utc;

use crate::config::{CheckKind, Endpoint};
use crate::model::{HealthState, ProbeResult};
use crate::probe::{Outcome, ProbeError};

/// Latency above this is a warning (milliseconds).
pub const RESPONSE_TIME_WARN_MS: f64 = 1000.0;
/// Latency above this is critical (milliseconds).
pub const RESPONSE_TIME_CRITICAL_MS: f64 = 3000.0;

/// Diagnostic detail strings are truncated to this many characters.
const DETAIL_MAX_LEN: usize = 80;

/// Grade a measured latency. Boundary values grade to the less severe tier.
pub fn grade_latency(elapsed_ms: f64) -> HealthState {
    if elapsed_ms > RESPONSE_TIME_CRITICAL_MS {
        HealthState::Critical
    } else if elapsed_ms > RESPONSE_TIME_WARN_MS {
        HealthState::Warning
    } else {
        HealthState::Healthy
    }
}

/// Bound a diagnostic string, respecting char boundaries.
pub fn truncate_detail(detail: &str) -> String {
    if detail.chars().count() <= DETAIL_MAX_LEN {
        detail.to_string()
    } else {
        detail.chars().take(DETAIL_MAX_LEN).collect()
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Convert a raw probe outcome (or failure) into a classified result for the
/// given endpoint. Never fails; every error class maps to a result.
pub fn classify(endpoint: &Endpoint, outcome: Result<Outcome, ProbeError>) -> ProbeResult {
    let (status, available, response_time_ms, detail) = match outcome {
        Ok(Outcome::Http { code, elapsed_ms }) => {
            let status = if code >= 500 {
                HealthState::Critical
            } else if code >= 400 {
                HealthState::Warning
            } else {
                grade_latency(elapsed_ms)
            };
            (
                status,
                true,
                Some(round2(elapsed_ms)),
                format!("HTTP {}", code),
            )
        }
        Ok(Outcome::Tcp { port, elapsed_ms }) => (
            grade_latency(elapsed_ms),
            true,
            Some(round2(elapsed_ms)),
            format!("Port {} open", port),
        ),
        Ok(Outcome::Ping { avg_ms }) => {
            // Unmeasured but reachable grades as if instantaneous
            let avg = avg_ms.unwrap_or(0.0);
            (
                grade_latency(avg),
                true,
                Some(round2(avg)),
                format!("Avg RTT: {:.2}ms", avg),
            )
        }
        Err(e) => classify_error(endpoint, e),
    };

    ProbeResult {
        name: endpoint.name.clone(),
        kind: endpoint.kind.clone(),
        status,
        available,
        response_time_ms,
        detail: truncate_detail(&detail),
        timestamp: Utc::now(),
        critical: endpoint.critical,
    }
}

/// Map a probe failure to (state, available, latency, detail) for the
/// endpoint's protocol family.
fn classify_error(
    endpoint: &Endpoint,
    error: ProbeError,
) -> (HealthState, bool, Option<f64>, String) {
    match &endpoint.kind {
        CheckKind::Http | CheckKind::Https => match error {
            // A timed-out HTTP check reports the full timeout as latency
            ProbeError::Timeout(t) => (
                HealthState::Critical,
                false,
                Some(t.as_secs_f64() * 1000.0),
                "Connection timeout".to_string(),
            ),
            ProbeError::Refused(msg) => (
                HealthState::Critical,
                false,
                None,
                format!("Connection refused: {}", msg),
            ),
            e => (HealthState::Critical, false, None, format!("Error: {}", e)),
        },
        CheckKind::Tcp | CheckKind::Ldap | CheckKind::Smtp => match error {
            ProbeError::Dns(_) => (
                HealthState::Critical,
                false,
                None,
                "DNS resolution failed".to_string(),
            ),
            ProbeError::Refused(_) | ProbeError::Timeout(_) => (
                HealthState::Critical,
                false,
                None,
                format!(
                    "Port {} closed or filtered",
                    endpoint.port().unwrap_or_default()
                ),
            ),
            e => (HealthState::Critical, false, None, format!("Error: {}", e)),
        },
        CheckKind::Ping => match error {
            ProbeError::Timeout(_) => (
                HealthState::Critical,
                false,
                None,
                "Ping timeout".to_string(),
            ),
            ProbeError::Network(_) | ProbeError::Command(_) => (
                HealthState::Critical,
                false,
                None,
                "Host unreachable".to_string(),
            ),
            e => (HealthState::Critical, false, None, format!("Error: {}", e)),
        },
        CheckKind::Unknown(_) => (
            HealthState::Unknown,
            false,
            None,
            "Unknown check type".to_string(),
        ),
    }
}
