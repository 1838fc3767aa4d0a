use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Run a command to completion, appending its stdout and stderr to `log_path`.
/// Returns the exit code (or -1 when killed by a signal).
pub async fn run_to_log(cmd: &str, args: &[&str], log_path: &Path) -> Result<i32> {
    let mut child = Command::new(cmd)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("failed to spawn {}", cmd))?;

    let mut log = File::create(log_path)
        .await
        .with_context(|| format!("failed to create {}", log_path.display()))?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    // stderr is drained on its own task so a chatty tool cannot stall on a full pipe
    let stderr_task = tokio::spawn(async move {
        let mut collected = Vec::new();
        if let Some(stderr) = stderr {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                collected.push(line);
            }
        }
        collected
    });

    if let Some(stdout) = stdout {
        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines.next_line().await? {
            log.write_all(line.as_bytes()).await?;
            log.write_all(b"\n").await?;
        }
    }

    let status = child.wait().await?;
    if let Ok(err_lines) = stderr_task.await {
        for line in err_lines {
            log.write_all(b"[stderr] ").await?;
            log.write_all(line.as_bytes()).await?;
            log.write_all(b"\n").await?;
        }
    }
    log.flush().await?;
    Ok(status.code().unwrap_or(-1))
}

/// Like `run_to_log`, but gives up as soon as `cancel` fires. The child is
/// killed when its future is dropped. `None` means it was cancelled.
pub async fn run_to_log_until(
    cmd: &str,
    args: &[&str],
    log_path: &Path,
    cancel: &CancellationToken,
) -> Option<Result<i32>> {
    if cancel.is_cancelled() {
        return None;
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        res = run_to_log(cmd, args, log_path) => Some(res),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_output_and_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("echo.log");
        let code = run_to_log("sh", &["-c", "echo found; echo oops >&2; exit 3"], &log).await.unwrap();
        assert_eq!(code, 3);
        let text = std::fs::read_to_string(&log).unwrap();
        assert!(text.contains("found"));
        assert!(text.contains("[stderr] oops"));
    }

    #[tokio::test]
    async fn cancel_stops_a_running_tool() {
        let dir = tempfile::tempdir().unwrap();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let res = run_to_log_until("sh", &["-c", "sleep 10"], &dir.path().join("s.log"), &cancel).await;
        assert!(res.is_none());
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
    }

    #[tokio::test]
    async fn cancelled_token_spawns_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("never.log");
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(run_to_log_until("sh", &["-c", "echo hi"], &log, &cancel).await.is_none());
        assert!(!log.exists());
    }

    #[tokio::test]
    async fn missing_binary_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let res = run_to_log("razor-no-such-tool", &[], &dir.path().join("x.log")).await;
        assert!(res.is_err());
    }
}
