use std::time::Duration;

use rand::Rng;
use reqwest::Client;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::Limits;
use crate::probe::outcome::{OutcomeKind, ProbeOutcome, ProbeRequest};
use crate::probe::throttle::{Admission, HostThrottle};

const MAX_BACKOFF: Duration = Duration::from_secs(5);

/// Everything a worker needs to run one probe request.
pub struct ProbeContext {
    pub client: Client,
    pub throttle: HostThrottle,
    pub limits: Limits,
}

/// What a single HTTP attempt produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt {
    Response(u16),
    Network(String),
    Timeout,
}

impl Attempt {
    /// Network failures, timeouts and 5xx are worth another try; every other
    /// answer is final.
    pub fn is_retryable(&self) -> bool {
        match self {
            Attempt::Response(status) => *status >= 500,
            Attempt::Network(_) | Attempt::Timeout => true,
        }
    }
}

impl From<Attempt> for OutcomeKind {
    fn from(a: Attempt) -> Self {
        match a {
            Attempt::Response(status) => OutcomeKind::Response { status },
            Attempt::Network(reason) => OutcomeKind::NetworkFailure { reason },
            Attempt::Timeout => OutcomeKind::Timeout,
        }
    }
}

/// One GET, bounded by `request_timeout` on top of the client's own limits.
pub async fn probe_once(client: &Client, url: &str, request_timeout: Duration) -> Attempt {
    match tokio::time::timeout(request_timeout, client.get(url).send()).await {
        Err(_) => Attempt::Timeout,
        Ok(Ok(resp)) => Attempt::Response(resp.status().as_u16()),
        Ok(Err(e)) if e.is_timeout() => Attempt::Timeout,
        Ok(Err(e)) => Attempt::Network(describe(&e)),
    }
}

fn describe(e: &reqwest::Error) -> String {
    let mut source: &dyn std::error::Error = e;
    while let Some(inner) = source.source() {
        source = inner;
    }
    if e.is_connect() {
        format!("connect: {}", source)
    } else {
        source.to_string()
    }
}

/// Jittered exponential delay before retry number `retry` (1-based).
pub fn backoff_delay(base_ms: u64, retry: u32) -> Duration {
    if base_ms == 0 {
        return Duration::ZERO;
    }
    let ceiling = base_ms
        .saturating_mul(1u64 << retry.saturating_sub(1).min(16))
        .min(MAX_BACKOFF.as_millis() as u64);
    Duration::from_millis(rand::thread_rng().gen_range(0..=ceiling))
}

/// Run one probe request to completion: throttle, send, retry.
///
/// Every attempt goes through the host throttle, so retries consume rate
/// tokens and request budget like first attempts do. Only the last attempt
/// is reported.
pub async fn probe_with_retries(
    ctx: &ProbeContext,
    request: &ProbeRequest,
    cancel: &CancellationToken,
) -> ProbeOutcome {
    let started = Instant::now();
    let max_attempts = ctx.limits.retries.saturating_add(1);
    let mut attempts = 0u32;
    let mut last: Option<Attempt> = None;

    let finish = |kind: OutcomeKind, attempts: u32| ProbeOutcome {
        endpoint: request.url.clone(),
        host: request.host.clone(),
        kind,
        elapsed_ms: started.elapsed().as_millis() as u64,
        attempts,
    };

    while attempts < max_attempts {
        if attempts > 0 {
            let wait = backoff_delay(ctx.limits.retry_backoff_ms, attempts);
            if !wait.is_zero() {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return finish(OutcomeKind::Cancelled, attempts),
                    _ = tokio::time::sleep(wait) => {}
                }
            }
        }

        let admission = tokio::select! {
            biased;
            _ = cancel.cancelled() => return finish(OutcomeKind::Cancelled, attempts),
            a = ctx.throttle.acquire(&request.host) => a,
        };
        if admission == Admission::CapReached {
            tracing::debug!(url = %request.url, attempts, "request budget exhausted for host");
            break;
        }

        attempts += 1;
        let attempt = tokio::select! {
            biased;
            _ = cancel.cancelled() => return finish(OutcomeKind::Cancelled, attempts),
            a = probe_once(&ctx.client, &request.url, ctx.limits.request_timeout()) => a,
        };
        let retry = attempt.is_retryable();
        if retry && attempts < max_attempts {
            tracing::debug!(url = %request.url, attempt = attempts, result = ?attempt, "retrying");
        }
        last = Some(attempt);
        if !retry {
            break;
        }
    }

    match last {
        Some(attempt) => finish(attempt.into(), attempts),
        None => finish(OutcomeKind::SkippedCapReached, 0),
    }
}
