//! Endpoint configuration: descriptor model, JSON loading, built-in defaults.
//!
//! File parsing lives here; the checker engine only ever sees a list of
//! already-validated [`Endpoint`] values.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Check protocol family. Unknown type strings are preserved verbatim so the
/// engine can report them instead of rejecting the whole config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CheckKind {
    Http,
    Https,
    Tcp,
    Ping,
    Ldap,
    Smtp,
    Unknown(String),
}

impl From<String> for CheckKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "http" => CheckKind::Http,
            "https" => CheckKind::Https,
            "tcp" => CheckKind::Tcp,
            "ping" => CheckKind::Ping,
            "ldap" => CheckKind::Ldap,
            "smtp" => CheckKind::Smtp,
            _ => CheckKind::Unknown(s),
        }
    }
}

impl From<CheckKind> for String {
    fn from(kind: CheckKind) -> Self {
        match kind {
            CheckKind::Http => "http".to_string(),
            CheckKind::Https => "https".to_string(),
            CheckKind::Tcp => "tcp".to_string(),
            CheckKind::Ping => "ping".to_string(),
            CheckKind::Ldap => "ldap".to_string(),
            CheckKind::Smtp => "smtp".to_string(),
            CheckKind::Unknown(s) => s,
        }
    }
}

impl std::fmt::Display for CheckKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&String::from(self.clone()))
    }
}

fn default_kind() -> CheckKind {
    CheckKind::Tcp
}

/// One monitored target. Immutable after load; every probe cycle produces a
/// fresh result rather than mutating the descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    pub name: String,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: CheckKind,
    /// Target URL for http/https checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Target host for tcp/ping/ldap/smtp checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Probe timeout in seconds; non-positive or missing falls back to the
    /// per-kind default.
    #[serde(default, rename = "timeout")]
    pub timeout_seconds: Option<f64>,
    /// Business-critical flag: a critical-state failure of this endpoint
    /// escalates the overall status.
    #[serde(default)]
    pub critical: bool,
}

impl Endpoint {
    /// Effective probe timeout, applying the per-kind default when the
    /// configured value is absent or non-positive.
    pub fn timeout(&self) -> Duration {
        let default_secs = match self.kind {
            CheckKind::Http | CheckKind::Https | CheckKind::Smtp => 5.0,
            CheckKind::Tcp | CheckKind::Ldap => 3.0,
            CheckKind::Ping => 2.0,
            CheckKind::Unknown(_) => 3.0,
        };
        match self.timeout_seconds {
            Some(t) if t > 0.0 => Duration::from_secs_f64(t),
            _ => Duration::from_secs_f64(default_secs),
        }
    }

    /// Effective target port, applying protocol-conventional defaults.
    pub fn port(&self) -> Option<u16> {
        self.port.or(match self.kind {
            CheckKind::Ldap => Some(389),
            CheckKind::Smtp => Some(25),
            _ => None,
        })
    }
}

/// Load endpoints from a JSON config file (an array of endpoint objects).
pub fn load_endpoints(path: &Path) -> Result<Vec<Endpoint>, ConfigError> {
    let raw = std::fs::read_to_string(path)?;
    let endpoints: Vec<Endpoint> = serde_json::from_str(&raw)?;
    Ok(endpoints)
}

/// Built-in endpoint set used when no config file is given.
pub fn default_endpoints() -> Vec<Endpoint> {
    let entries = [
        ("ITSM Portal", "http", Some("https://itsm.corp.internal"), None, None, 5.0, true),
        ("Knowledge Base", "http", Some("https://kb.corp.internal"), None, None, 5.0, false),
        ("Ops Dashboard", "http", Some("https://dashboard.corp.internal"), None, None, 5.0, false),
        ("Active Directory", "ldap", None, Some("dc1.corp.internal"), Some(389), 3.0, true),
        ("Mail Relay", "smtp", None, Some("mail.corp.internal"), Some(25), 5.0, true),
        ("VPN Gateway", "ping", None, Some("vpn.corp.internal"), None, 2.0, true),
        ("Primary Database", "tcp", None, Some("db1.corp.internal"), Some(5432), 3.0, true),
        ("Backup Server", "tcp", None, Some("backup.corp.internal"), Some(22), 3.0, false),
    ];

    entries
        .into_iter()
        .map(|(name, kind, url, host, port, timeout, critical)| Endpoint {
            name: name.to_string(),
            kind: CheckKind::from(kind.to_string()),
            url: url.map(str::to_string),
            host: host.map(str::to_string),
            port,
            timeout_seconds: Some(timeout),
            critical,
        })
        .collect()
}
