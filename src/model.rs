//! Result and summary model types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::CheckKind;

/// Health classification of a single probe outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Healthy,
    Warning,
    Critical,
    Unknown,
}

/// System-wide severity derived from all results in a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Healthy,
    Warning,
    Critical,
}

impl OverallStatus {
    /// Process exit code contract: 0 healthy, 1 warning, 2 critical.
    pub fn exit_code(self) -> u8 {
        match self {
            OverallStatus::Healthy => 0,
            OverallStatus::Warning => 1,
            OverallStatus::Critical => 2,
        }
    }
}

/// Outcome of one probe execution against one endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: CheckKind,
    pub status: HealthState,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<f64>,
    #[serde(rename = "details")]
    pub detail: String,
    pub timestamp: DateTime<Utc>,
    pub critical: bool,
}

/// Per-cycle rollup of all probe results.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub total_endpoints: usize,
    pub healthy: usize,
    pub warnings: usize,
    pub unknown: usize,
    /// Results in the critical state, flagged or not.
    pub critical_total: usize,
    /// Results that are critical AND flagged business-critical. Drives
    /// escalation to OverallStatus::Critical.
    pub critical: usize,
    pub down: usize,
    #[serde(skip)]
    pub overall: OverallStatus,
    #[serde(skip)]
    pub health_score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_mapping() {
        assert_eq!(OverallStatus::Healthy.exit_code(), 0);
        assert_eq!(OverallStatus::Warning.exit_code(), 1);
        assert_eq!(OverallStatus::Critical.exit_code(), 2);
    }

    #[test]
    fn test_probe_result_json_uses_details_key() {
        let result = ProbeResult {
            name: "web".to_string(),
            kind: CheckKind::Http,
            status: HealthState::Healthy,
            available: true,
            response_time_ms: Some(42.0),
            detail: "HTTP 200".to_string(),
            timestamp: chrono::Utc::now(),
            critical: false,
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["details"], "HTTP 200");
        assert!(value.get("detail").is_none());
    }

    #[test]
    fn test_health_state_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&HealthState::Healthy).unwrap(),
            "\"healthy\""
        );
        assert_eq!(
            serde_json::to_string(&HealthState::Unknown).unwrap(),
            "\"unknown\""
        );
    }
}
