use std::sync::Arc;

use futures::stream::{self, StreamExt};
use reqwest::Client;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::Limits;
use crate::error::EnumerationError;
use crate::http_client::build_probe_client;
use crate::probe::http_probe::{probe_with_retries, ProbeContext};
use crate::probe::outcome::{OutcomeKind, ProbeOutcome, ProbeRequest, Target};
use crate::probe::throttle::{HostThrottle, RateLimiter};

/// Scoped, rate-limited sweep of candidate paths over a set of web targets.
///
/// The limits are frozen at construction. The per-host rate state is shared
/// by every `enumerate` call on the same instance; the per-host request
/// budget starts fresh with each call.
pub struct Enumerator {
    client: Client,
    limits: Limits,
    rate: Arc<RateLimiter>,
}

impl Enumerator {
    pub fn new(limits: Limits) -> Result<Self, EnumerationError> {
        check_limits(&limits)?;
        let client = build_probe_client(&limits)?;
        Self::with_client(client, limits)
    }

    /// Use a caller-supplied client. The request timeout is still applied per attempt.
    pub fn with_client(client: Client, limits: Limits) -> Result<Self, EnumerationError> {
        check_limits(&limits)?;
        let rate = Arc::new(RateLimiter::new(limits.rps_per_host));
        Ok(Self { client, limits, rate })
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Probe every `target × path` pair and return the outcomes in completion order.
    ///
    /// Only structurally invalid input fails the call. Cancelling `cancel`
    /// stops dispatch, aborts in-flight attempts (recorded as `Cancelled`)
    /// and returns whatever completed.
    pub async fn enumerate<T, P>(
        &self,
        targets: &[T],
        paths: &[P],
        cancel: &CancellationToken,
    ) -> Result<Vec<ProbeOutcome>, EnumerationError>
    where
        T: AsRef<str>,
        P: AsRef<str>,
    {
        if targets.is_empty() {
            return Err(EnumerationError::InvalidInput("at least one target is required".into()));
        }
        let mut bases: Vec<Target> = Vec::with_capacity(targets.len());
        for raw in targets {
            let target = Target::parse(raw.as_ref())?;
            if !bases.contains(&target) {
                bases.push(target);
            }
        }
        let paths: Vec<String> = paths.iter().map(|p| p.as_ref().to_string()).collect();
        let total = bases.len() * paths.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        tracing::info!(
            targets = bases.len(),
            candidates = paths.len(),
            concurrency = self.limits.concurrency,
            rps_per_host = self.limits.rps_per_host,
            total_per_host = self.limits.total_requests_per_host,
            "Starting endpoint enumeration"
        );
        let started = Instant::now();

        let ctx = Arc::new(ProbeContext {
            client: self.client.clone(),
            throttle: HostThrottle::new(self.rate.clone(), self.limits.total_requests_per_host),
            limits: self.limits.clone(),
        });

        // Path-major order: workers parked on one host's throttle never starve
        // the other hosts of slots.
        let requests = paths
            .iter()
            .flat_map(|path| bases.iter().map(move |base| ProbeRequest::new(base, path)));

        let mut in_flight = Box::pin(
            stream::iter(requests)
                .take_until(cancel.cancelled())
                .map(|request| {
                    let ctx = ctx.clone();
                    let cancel = cancel.clone();
                    tokio::spawn(async move { probe_with_retries(&ctx, &request, &cancel).await })
                })
                .buffer_unordered(self.limits.concurrency as usize),
        );

        let mut outcomes = Vec::with_capacity(total);
        while let Some(joined) = in_flight.next().await {
            match joined {
                Ok(outcome) => {
                    tracing::debug!(
                        "[{}/{}] {} -> {:?} ({} attempts, {}ms)",
                        outcomes.len() + 1,
                        total,
                        outcome.endpoint,
                        outcome.kind,
                        outcome.attempts,
                        outcome.elapsed_ms
                    );
                    outcomes.push(outcome);
                }
                Err(e) => tracing::error!(error = %e, "probe worker failed"),
            }
        }

        let skipped = outcomes.iter().filter(|o| o.kind == OutcomeKind::SkippedCapReached).count();
        let cancelled = outcomes.iter().filter(|o| o.kind == OutcomeKind::Cancelled).count();
        if cancel.is_cancelled() {
            tracing::warn!(
                completed = outcomes.len(),
                total,
                "Enumeration cancelled, returning partial results"
            );
        }
        tracing::info!(
            outcomes = outcomes.len(),
            skipped,
            cancelled,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Enumeration finished"
        );
        Ok(outcomes)
    }
}

fn check_limits(limits: &Limits) -> Result<(), EnumerationError> {
    limits
        .validate()
        .map_err(|e| EnumerationError::InvalidInput(e.to_string()))
}

/// Child of `parent` that also cancels itself at `deadline`.
pub fn deadline_token(parent: &CancellationToken, deadline: Instant) -> CancellationToken {
    let token = parent.child_token();
    let timer = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => timer.cancel(),
            _ = timer.cancelled() => {}
        }
    });
    token
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> Limits {
        Limits {
            rps_per_host: 10,
            total_requests_per_host: 10,
            concurrency: 2,
            connect_timeout_s: 1,
            request_timeout_s: 1,
            retries: 0,
            retry_backoff_ms: 0,
        }
    }

    #[test]
    fn zero_concurrency_is_invalid() {
        let bad = Limits { concurrency: 0, ..limits() };
        assert!(matches!(Enumerator::new(bad), Err(EnumerationError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn empty_targets_are_invalid() {
        let e = Enumerator::new(limits()).unwrap();
        let targets: Vec<String> = Vec::new();
        let res = e.enumerate(&targets, &["/admin"], &CancellationToken::new()).await;
        assert!(matches!(res, Err(EnumerationError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn empty_catalog_yields_nothing() {
        let e = Enumerator::new(limits()).unwrap();
        let paths: Vec<&str> = Vec::new();
        let out = e.enumerate(&["http://h1"], &paths, &CancellationToken::new()).await.unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn unreachable_hosts_still_report_every_pair() {
        let e = Enumerator::new(Limits { rps_per_host: 0, retries: 0, ..limits() }).unwrap();
        let out = e
            .enumerate(&["http://127.0.0.1:1", "http://127.0.0.1:2"], &["/a", "/b"], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(out.len(), 4);
        assert!(out.iter().all(|o| matches!(o.kind, OutcomeKind::NetworkFailure { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_token_fires() {
        let parent = CancellationToken::new();
        let token = deadline_token(&parent, Instant::now() + std::time::Duration::from_secs(3));
        token.cancelled().await;
        assert!(!parent.is_cancelled());
    }
}
