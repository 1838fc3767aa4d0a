use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::defaults;
use crate::error::ConfigError;
use crate::utils::sanitize;

/// One authorized assessment, as described by an engagement YAML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Engagement {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub client: String,
    #[serde(default)]
    pub scope: Scope,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub report: Report,
    #[serde(default)]
    pub notes: Notes,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scope {
    #[serde(default)]
    pub targets: Vec<String>,
    #[serde(default)]
    pub include_ports: Vec<u16>,
    /// Keep only this many hosts (those with the most open ports). 0 = no cap.
    #[serde(default)]
    pub max_hosts: usize,
    #[serde(default)]
    pub allow_intrusive: bool,
    #[serde(default)]
    pub time_window: TimeWindow,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeWindow {
    #[serde(default, deserialize_with = "rfc3339_or_empty")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "rfc3339_or_empty")]
    pub end: Option<DateTime<Utc>>,
}

impl TimeWindow {
    pub fn is_set(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }

    /// An unset window contains every instant.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        match (self.start, self.end) {
            (Some(start), Some(end)) => start <= at && at < end,
            _ => true,
        }
    }
}

/// Throughput ceilings for the enumeration engine. Frozen once validated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    /// Requests per second per host. 0 disables the rate cap.
    #[serde(default)]
    pub rps_per_host: u32,
    /// Hard ceiling of requests per host for one run, retries included.
    #[serde(default)]
    pub total_requests_per_host: u32,
    /// Maximum in-flight requests across all hosts.
    #[serde(default)]
    pub concurrency: u32,
    #[serde(default)]
    pub connect_timeout_s: u64,
    #[serde(default)]
    pub request_timeout_s: u64,
    #[serde(default)]
    pub retries: u32,
    /// Base delay before a retry; 0 retries immediately.
    #[serde(default)]
    pub retry_backoff_ms: u64,
}

impl Limits {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_s)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_s)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::NotPositive { field: "concurrency" });
        }
        if self.connect_timeout_s == 0 {
            return Err(ConfigError::NotPositive { field: "connect_timeout_s" });
        }
        if self.request_timeout_s == 0 {
            return Err(ConfigError::NotPositive { field: "request_timeout_s" });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Deliverable {
    PdfExec,
    HtmlTech,
    JsonFindings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Report {
    #[serde(default)]
    pub deliverables: Vec<Deliverable>,
    #[serde(default)]
    pub redactions: bool,
    #[serde(default)]
    pub cvss: String,
    #[serde(default)]
    pub include_screenshots: bool,
    #[serde(default)]
    pub out_dir: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Notes {
    #[serde(default)]
    pub stack_hints: Vec<String>,
    #[serde(default)]
    pub contacts: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Engagement {
    /// Read, default and validate an engagement file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        let mut engagement: Engagement = serde_yaml::from_str(raw)?;
        engagement.apply_defaults();
        engagement.validate()?;
        Ok(engagement)
    }

    pub fn apply_defaults(&mut self) {
        let limits = &mut self.limits;
        if limits.rps_per_host == 0 {
            limits.rps_per_host = 2;
        }
        if limits.total_requests_per_host == 0 {
            limits.total_requests_per_host = 1000;
        }
        if limits.concurrency == 0 {
            limits.concurrency = 10;
        }
        if limits.connect_timeout_s == 0 {
            limits.connect_timeout_s = 5;
        }
        if limits.request_timeout_s == 0 {
            limits.request_timeout_s = 10;
        }

        if self.report.cvss.is_empty() {
            self.report.cvss = "v3.1".to_string();
        }
        if self.scope.include_ports.is_empty() {
            self.scope.include_ports = defaults::ports();
        }
        if self.report.deliverables.is_empty() {
            self.report.deliverables = vec![Deliverable::HtmlTech, Deliverable::JsonFindings];
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::MissingField("name"));
        }
        if self.client.trim().is_empty() {
            return Err(ConfigError::MissingField("client"));
        }
        if self.scope.targets.is_empty() {
            return Err(ConfigError::MissingField("scope.targets"));
        }
        if let Some(port) = self.scope.include_ports.iter().find(|p| **p == 0) {
            return Err(ConfigError::InvalidPort(*port));
        }

        let window = &self.scope.time_window;
        match (window.start, window.end) {
            (None, None) => {}
            (Some(start), Some(end)) => {
                if end <= start {
                    return Err(ConfigError::InvertedTimeWindow);
                }
            }
            _ => return Err(ConfigError::IncompleteTimeWindow),
        }

        self.limits.validate()?;

        if self.report.cvss != "v3.1" {
            return Err(ConfigError::UnsupportedCvss(self.report.cvss.clone()));
        }
        Ok(())
    }

    /// Where artifacts go; defaults to `./artifacts/<client>/<name>`.
    pub fn out_dir(&self) -> PathBuf {
        if !self.report.out_dir.is_empty() {
            return PathBuf::from(&self.report.out_dir);
        }
        PathBuf::from(".")
            .join("artifacts")
            .join(sanitize(&self.client))
            .join(sanitize(&self.name))
    }
}

/// Comma-joined port list, e.g. `80,443,8080`.
pub fn format_ports(ports: &[u16]) -> String {
    ports.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(",")
}

fn rfc3339_or_empty<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map(|t| Some(t.with_timezone(&Utc)))
            .map_err(|e| serde::de::Error::custom(format!("invalid RFC3339 time {:?}: {}", s, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
name: q3-external
client: Acme
scope:
  targets: ["app.acme.test"]
"#;

    #[test]
    fn defaults_are_applied() {
        let e = Engagement::from_yaml(MINIMAL).unwrap();
        assert_eq!(e.limits.rps_per_host, 2);
        assert_eq!(e.limits.total_requests_per_host, 1000);
        assert_eq!(e.limits.concurrency, 10);
        assert_eq!(e.limits.connect_timeout_s, 5);
        assert_eq!(e.limits.request_timeout_s, 10);
        assert_eq!(e.limits.retries, 0);
        assert_eq!(e.report.cvss, "v3.1");
        assert_eq!(e.report.deliverables, vec![Deliverable::HtmlTech, Deliverable::JsonFindings]);
        assert_eq!(e.scope.include_ports, defaults::ports());
    }

    #[test]
    fn explicit_limits_survive_defaults() {
        let raw = format!("{MINIMAL}limits:\n  rps_per_host: 7\n  retries: 3\n");
        let e = Engagement::from_yaml(&raw).unwrap();
        assert_eq!(e.limits.rps_per_host, 7);
        assert_eq!(e.limits.retries, 3);
    }

    #[test]
    fn missing_fields_are_rejected() {
        let err = Engagement::from_yaml("client: Acme\nscope:\n  targets: [a]\n").unwrap_err();
        assert!(matches!(err, ConfigError::MissingField("name")));

        let err = Engagement::from_yaml("name: x\nclient: Acme\n").unwrap_err();
        assert!(matches!(err, ConfigError::MissingField("scope.targets")));
    }

    #[test]
    fn zero_port_is_rejected() {
        let raw = format!("{MINIMAL}  include_ports: [80, 0]\n");
        let err = Engagement::from_yaml(&raw).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPort(0)));
    }

    #[test]
    fn unknown_deliverable_fails_to_parse() {
        let raw = format!("{MINIMAL}report:\n  deliverables: [slides]\n");
        assert!(matches!(Engagement::from_yaml(&raw), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn unsupported_cvss_is_rejected() {
        let raw = format!("{MINIMAL}report:\n  cvss: v4.0\n");
        assert!(matches!(Engagement::from_yaml(&raw), Err(ConfigError::UnsupportedCvss(_))));
    }

    #[test]
    fn time_window_rules() {
        let empty = format!("{MINIMAL}  time_window:\n    start: \"\"\n    end: \"\"\n");
        let e = Engagement::from_yaml(&empty).unwrap();
        assert!(!e.scope.time_window.is_set());

        let half = format!("{MINIMAL}  time_window:\n    start: \"2025-09-01T19:00:00Z\"\n");
        assert!(matches!(Engagement::from_yaml(&half), Err(ConfigError::IncompleteTimeWindow)));

        let inverted = format!(
            "{MINIMAL}  time_window:\n    start: \"2025-09-02T06:00:00Z\"\n    end: \"2025-09-01T19:00:00Z\"\n"
        );
        assert!(matches!(Engagement::from_yaml(&inverted), Err(ConfigError::InvertedTimeWindow)));

        let bad = format!("{MINIMAL}  time_window:\n    start: \"tonight\"\n    end: \"\"\n");
        assert!(matches!(Engagement::from_yaml(&bad), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn window_membership() {
        let raw = format!(
            "{MINIMAL}  time_window:\n    start: \"2025-09-01T19:00:00Z\"\n    end: \"2025-09-02T06:00:00Z\"\n"
        );
        let window = Engagement::from_yaml(&raw).unwrap().scope.time_window;
        let inside = DateTime::parse_from_rfc3339("2025-09-01T23:00:00Z").unwrap().with_timezone(&Utc);
        let after = DateTime::parse_from_rfc3339("2025-09-02T06:00:00Z").unwrap().with_timezone(&Utc);
        assert!(window.contains(inside));
        assert!(!window.contains(after));
    }

    #[test]
    fn limits_require_positive_concurrency_and_timeouts() {
        let limits = Limits { concurrency: 0, connect_timeout_s: 1, request_timeout_s: 1, ..Default::default() };
        assert!(matches!(limits.validate(), Err(ConfigError::NotPositive { field: "concurrency" })));
    }

    #[test]
    fn out_dir_defaults_to_sanitized_artifacts_path() {
        let mut e = Engagement::from_yaml(MINIMAL).unwrap();
        e.client = "Acme Corp/EU".into();
        assert_eq!(e.out_dir(), PathBuf::from("./artifacts/Acme_Corp_EU/q3-external"));
        e.report.out_dir = "/tmp/out".into();
        assert_eq!(e.out_dir(), PathBuf::from("/tmp/out"));
    }

    #[test]
    fn format_ports_joins_with_commas() {
        assert_eq!(format_ports(&[]), "");
        assert_eq!(format_ports(&[80]), "80");
        assert_eq!(format_ports(&[80, 443, 8080]), "80,443,8080");
    }
}
