use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::EnumerationError;

/// Terminal state of one probe request after retries are resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutcomeKind {
    /// The server answered; any status, including 4xx/5xx.
    Response { status: u16 },
    /// Connection refused/reset, DNS failure, TLS failure.
    NetworkFailure { reason: String },
    /// Connect or response deadline exceeded.
    Timeout,
    /// The host's request budget was spent before anything was sent.
    SkippedCapReached,
    /// The run was cancelled while this request was waiting or in flight.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    pub endpoint: String,
    pub host: String,
    #[serde(flatten)]
    pub kind: OutcomeKind,
    pub elapsed_ms: u64,
    /// Attempts actually sent, first try included. 0 when skipped.
    pub attempts: u32,
}

impl ProbeOutcome {
    pub fn status(&self) -> Option<u16> {
        match self.kind {
            OutcomeKind::Response { status } => Some(status),
            _ => None,
        }
    }

    pub fn retries_used(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }

    /// Outcomes describing work that was never (fully) attempted.
    pub fn is_audit(&self) -> bool {
        matches!(self.kind, OutcomeKind::SkippedCapReached | OutcomeKind::Cancelled)
    }
}

/// One (target, candidate path) pair. Lives only as long as its probe.
#[derive(Debug, Clone)]
pub struct ProbeRequest {
    /// Throttle key: `host:port` of the target.
    pub host: String,
    pub url: String,
}

impl ProbeRequest {
    pub fn new(base: &Target, path: &str) -> Self {
        let url = format!(
            "{}/{}",
            base.base.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Self { host: base.host.clone(), url }
    }
}

/// A validated enumeration target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub base: Url,
    pub host: String,
}

impl Target {
    /// Accepts a hostname, an IP or a base URL; bare names get `http://`.
    pub fn parse(raw: &str) -> Result<Self, EnumerationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(EnumerationError::InvalidInput("empty target".into()));
        }
        let with_scheme = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("http://{}", trimmed)
        };
        let base = Url::parse(&with_scheme)
            .map_err(|e| EnumerationError::InvalidInput(format!("target {:?}: {}", raw, e)))?;
        let host = match (base.host_str(), base.port_or_known_default()) {
            (Some(h), Some(p)) => format!("{}:{}", h, p),
            (Some(h), None) => h.to_string(),
            (None, _) => {
                return Err(EnumerationError::InvalidInput(format!("target {:?} has no host", raw)))
            }
        };
        Ok(Self { base, host })
    }
}
