//! Summary aggregation: a pure fold over a cycle's probe results.

use crate::model::{HealthState, OverallStatus, ProbeResult, Summary};

/// Reduce the results of one check cycle to a summary and overall status.
///
/// Escalation to critical is gated on the endpoint's business-critical flag:
/// only results that are both critical-state and flagged critical count.
/// Unknown results are treated as at least warning-severe for the overall
/// status, but never escalate to critical.
pub fn summarize(results: &[ProbeResult]) -> Summary {
    let total = results.len();
    let mut healthy = 0usize;
    let mut warnings = 0usize;
    let mut unknown = 0usize;
    let mut critical_total = 0usize;
    let mut critical_down = 0usize;
    let mut down = 0usize;

    for result in results {
        match result.status {
            HealthState::Healthy => healthy += 1,
            HealthState::Warning => warnings += 1,
            HealthState::Unknown => unknown += 1,
            HealthState::Critical => {
                critical_total += 1;
                if result.critical {
                    critical_down += 1;
                }
            }
        }
        if !result.available {
            down += 1;
        }
    }

    let overall = if critical_down > 0 {
        OverallStatus::Critical
    } else if warnings > 0 || unknown > 0 {
        OverallStatus::Warning
    } else {
        OverallStatus::Healthy
    };

    let health_score = if total == 0 {
        100.0
    } else {
        healthy as f64 / total as f64 * 100.0
    };

    Summary {
        total_endpoints: total,
        healthy,
        warnings,
        unknown,
        critical_total,
        critical: critical_down,
        down,
        overall,
        health_score,
    }
}
