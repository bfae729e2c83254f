//! Report renderers: JSON dashboard document and console report.
//!
//! These consume the engine's output; the engine itself never writes files
//! or prints.

use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{HealthState, OverallStatus, ProbeResult, Summary};

/// Top-level JSON document consumed by the dashboard.
#[derive(Debug, Serialize)]
struct HealthDocument<'a> {
    generated: DateTime<Utc>,
    overall_status: OverallStatus,
    summary: &'a Summary,
    endpoints: &'a [ProbeResult],
    metadata: Metadata,
}

#[derive(Debug, Serialize)]
struct Metadata {
    version: &'static str,
}

/// Write the dashboard JSON document to the given path.
pub fn write_json(
    path: &Path,
    results: &[ProbeResult],
    summary: &Summary,
) -> std::io::Result<()> {
    let doc = HealthDocument {
        generated: Utc::now(),
        overall_status: summary.overall,
        summary,
        endpoints: results,
        metadata: Metadata {
            version: env!("CARGO_PKG_VERSION"),
        },
    };

    let mut file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(&mut file, &doc)?;
    file.write_all(b"\n")?;
    Ok(())
}

/// Render the human-readable console report.
pub fn render_console(results: &[ProbeResult], summary: &Summary) -> String {
    let mut out = String::new();
    let rule = "=".repeat(80);

    out.push('\n');
    out.push_str(&rule);
    out.push_str("\nNETWORK HEALTH MONITORING REPORT\n");
    out.push_str(&rule);
    out.push('\n');
    out.push_str(&format!(
        "Generated: {}\n",
        Utc::now().format("%Y-%m-%d %H:%M:%S")
    ));
    out.push_str(&format!("Total Endpoints: {}\n\n", summary.total_endpoints));

    let healthy: Vec<_> = results
        .iter()
        .filter(|r| r.status == HealthState::Healthy)
        .collect();
    let warnings: Vec<_> = results
        .iter()
        .filter(|r| matches!(r.status, HealthState::Warning | HealthState::Unknown))
        .collect();
    let critical: Vec<_> = results
        .iter()
        .filter(|r| r.status == HealthState::Critical)
        .collect();

    if !healthy.is_empty() {
        out.push_str("HEALTHY SERVICES:\n");
        for r in &healthy {
            let rt = r.response_time_ms.unwrap_or(0.0);
            out.push_str(&format!("  + {:30} - {:6.2}ms\n", r.name, rt));
        }
        out.push('\n');
    }

    if !warnings.is_empty() {
        out.push_str("WARNINGS:\n");
        for r in &warnings {
            out.push_str(&format!("  ! {:30} - {}\n", r.name, r.detail));
        }
        out.push('\n');
    }

    if !critical.is_empty() {
        out.push_str("CRITICAL/DOWN:\n");
        for r in &critical {
            let flag = if r.critical { " [CRITICAL]" } else { "" };
            out.push_str(&format!("  x {:30} - {}{}\n", r.name, r.detail, flag));
        }
        out.push('\n');
    }

    out.push_str(&"-".repeat(80));
    out.push_str(&format!(
        "\nOVERALL HEALTH SCORE: {:.1}%\n",
        summary.health_score
    ));
    out.push_str(match summary.overall {
        OverallStatus::Healthy => "Status: ALL SYSTEMS OPERATIONAL\n",
        OverallStatus::Warning => "Status: DEGRADED PERFORMANCE\n",
        OverallStatus::Critical => "Status: CRITICAL ISSUES DETECTED\n",
    });
    out.push_str(&rule);
    out.push('\n');

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::summarize;
    use crate::config::CheckKind;

    fn result(name: &str, status: HealthState, available: bool, critical: bool) -> ProbeResult {
        ProbeResult {
            name: name.to_string(),
            kind: CheckKind::Http,
            status,
            available,
            response_time_ms: if available { Some(42.0) } else { None },
            detail: if available {
                "HTTP 200".to_string()
            } else {
                "Connection timeout".to_string()
            },
            timestamp: Utc::now(),
            critical,
        }
    }

    #[test]
    fn test_write_json_document_shape() {
        let results = vec![
            result("web", HealthState::Healthy, true, false),
            result("db", HealthState::Critical, false, true),
        ];
        let summary = summarize(&results);

        let file = tempfile::NamedTempFile::new().unwrap();
        write_json(file.path(), &results, &summary).unwrap();

        let raw = std::fs::read_to_string(file.path()).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();

        assert_eq!(doc["overall_status"], "critical");
        assert_eq!(doc["summary"]["total_endpoints"], 2);
        assert_eq!(doc["summary"]["healthy"], 1);
        assert_eq!(doc["summary"]["critical"], 1);
        assert_eq!(doc["summary"]["critical_total"], 1);
        assert_eq!(doc["summary"]["unknown"], 0);
        assert_eq!(doc["summary"]["down"], 1);
        assert_eq!(doc["endpoints"].as_array().unwrap().len(), 2);
        assert_eq!(doc["endpoints"][0]["name"], "web");
        assert_eq!(doc["endpoints"][0]["status"], "healthy");
        assert_eq!(doc["endpoints"][0]["type"], "http");
        assert_eq!(doc["endpoints"][0]["details"], "HTTP 200");
        // Unmeasured latency is omitted, not null
        assert!(doc["endpoints"][1].get("response_time_ms").is_none());
        assert!(doc["metadata"]["version"].is_string());
    }

    #[test]
    fn test_console_report_groups_by_state() {
        let results = vec![
            result("web", HealthState::Healthy, true, false),
            result("kb", HealthState::Warning, true, false),
            result("db", HealthState::Critical, false, true),
        ];
        let summary = summarize(&results);
        let report = render_console(&results, &summary);

        assert!(report.contains("HEALTHY SERVICES:"));
        assert!(report.contains("WARNINGS:"));
        assert!(report.contains("CRITICAL/DOWN:"));
        assert!(report.contains("db"));
        assert!(report.contains("[CRITICAL]"));
        assert!(report.contains("OVERALL HEALTH SCORE: 33.3%"));
        assert!(report.contains("CRITICAL ISSUES DETECTED"));
    }

    #[test]
    fn test_console_report_all_healthy() {
        let results = vec![result("web", HealthState::Healthy, true, false)];
        let summary = summarize(&results);
        let report = render_console(&results, &summary);

        assert!(report.contains("ALL SYSTEMS OPERATIONAL"));
        assert!(!report.contains("WARNINGS:"));
        assert!(!report.contains("CRITICAL/DOWN:"));
    }
}
