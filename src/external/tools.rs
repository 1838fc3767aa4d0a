use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use tokio_util::sync::CancellationToken;
use which::which;

use crate::external::runner;
use crate::probe::outcome::ProbeOutcome;
use crate::utils::sanitize;

/// Third-party scanners used for intrusive checks.
pub const INTRUSIVE_TOOLS: &[&str] = &["xsstrike", "sqlmap"];

pub fn ensure_tools(binaries: &[&str]) -> Result<()> {
    for b in binaries {
        if which(b).is_err() {
            bail!("{} not installed or not in $PATH", b);
        }
    }
    Ok(())
}

/// Run XSStrike and sqlmap once per endpoint, one log file per tool and endpoint.
///
/// The caller decides whether intrusive scanning is allowed at all. Once
/// `cancel` fires no further tool is started and the running one is killed;
/// the logs written so far are returned.
pub async fn run_intrusive(
    endpoints: &[ProbeOutcome],
    out_dir: &Path,
    cancel: &CancellationToken,
) -> Result<Vec<PathBuf>> {
    let mut logs = Vec::new();
    if cancel.is_cancelled() {
        return Ok(logs);
    }
    ensure_tools(INTRUSIVE_TOOLS)?;
    let log_dir = out_dir.join("intrusive");
    crate::utils::ensure_dir(&log_dir)?;

    for endpoint in endpoints {
        let url = endpoint.endpoint.as_str();
        let stem = sanitize(url);
        let jobs = [
            ("xsstrike", vec!["-u", url], log_dir.join(format!("xsstrike_{}.log", stem))),
            ("sqlmap", vec!["-u", url, "--batch"], log_dir.join(format!("sqlmap_{}.log", stem))),
        ];
        for (tool, args, log) in jobs {
            match runner::run_to_log_until(tool, &args, &log, cancel).await {
                None => {
                    tracing::warn!(url, tool, "intrusive scans cancelled");
                    return Ok(logs);
                }
                Some(Ok(code)) => tracing::info!(url, tool, code, "tool finished"),
                Some(Err(e)) => tracing::warn!(url, tool, error = %e, "tool failed"),
            }
            logs.push(log);
        }
    }
    Ok(logs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_tool_is_reported_by_name() {
        let err = ensure_tools(&["razor-no-such-tool"]).unwrap_err();
        assert!(err.to_string().contains("razor-no-such-tool"));
    }

    #[test]
    fn no_tools_is_ok() {
        assert!(ensure_tools(&[]).is_ok());
    }

    #[tokio::test]
    async fn cancelled_run_starts_no_tool() {
        let dir = tempfile::tempdir().unwrap();
        let endpoint = ProbeOutcome {
            endpoint: "http://h1/admin".into(),
            host: "h1:80".into(),
            kind: crate::probe::OutcomeKind::Response { status: 200 },
            elapsed_ms: 5,
            attempts: 1,
        };
        let cancel = CancellationToken::new();
        cancel.cancel();

        let logs = run_intrusive(&[endpoint], dir.path(), &cancel).await.unwrap();
        assert!(logs.is_empty());
        assert!(!dir.path().join("intrusive").exists());
    }
}
