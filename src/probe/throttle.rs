use std::collections::VecDeque;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::time::{sleep_until, Duration, Instant};

const WINDOW: Duration = Duration::from_secs(1);

/// Result of asking the throttle for permission to send one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Granted,
    CapReached,
}

/// Per-host token bucket.
///
/// Each host holds `rps` tokens; a spent token returns to its bucket exactly
/// one second after it was taken. That gives a one-second burst, a sustained
/// rate of `rps`, and no rolling one-second window with more than `rps`
/// grants. `rps == 0` disables rate limiting.
///
/// Buckets outlive a single run so that back-to-back enumerations against the
/// same hosts stay polite.
pub struct RateLimiter {
    rps: u32,
    buckets: DashMap<String, Arc<Mutex<VecDeque<Instant>>>>,
}

impl RateLimiter {
    pub fn new(rps: u32) -> Self {
        Self { rps, buckets: DashMap::new() }
    }

    pub fn rps(&self) -> u32 {
        self.rps
    }

    fn bucket(&self, host: &str) -> Arc<Mutex<VecDeque<Instant>>> {
        if let Some(b) = self.buckets.get(host) {
            return b.value().clone();
        }
        self.buckets.entry(host.to_string()).or_default().value().clone()
    }

    /// Wait for a token for `host`. Only the calling task is suspended.
    pub async fn acquire(&self, host: &str) {
        if self.rps == 0 {
            return;
        }
        let bucket = self.bucket(host);
        loop {
            let wake_at = {
                let mut spent = bucket.lock();
                let now = Instant::now();
                while spent.front().is_some_and(|t| now.duration_since(*t) >= WINDOW) {
                    spent.pop_front();
                }
                if spent.len() < self.rps as usize {
                    spent.push_back(now);
                    return;
                }
                match spent.front() {
                    Some(oldest) => *oldest + WINDOW,
                    None => now,
                }
            };
            sleep_until(wake_at).await;
        }
    }
}

/// Per-run ceiling on requests sent to each host, retries included.
pub struct RequestBudget {
    cap: u32,
    issued: DashMap<String, u32>,
}

impl RequestBudget {
    pub fn new(cap: u32) -> Self {
        Self { cap, issued: DashMap::new() }
    }

    /// Check and increment under the same shard lock, so two workers can
    /// never both take the last slot.
    pub fn try_reserve(&self, host: &str) -> bool {
        let mut issued = self.issued.entry(host.to_string()).or_insert(0);
        if *issued >= self.cap {
            return false;
        }
        *issued += 1;
        true
    }

    pub fn issued(&self, host: &str) -> u32 {
        self.issued.get(host).map(|n| *n).unwrap_or(0)
    }
}

/// Rate limiter plus request budget, consulted before every attempt.
pub struct HostThrottle {
    rate: Arc<RateLimiter>,
    budget: RequestBudget,
}

impl HostThrottle {
    pub fn new(rate: Arc<RateLimiter>, total_per_host: u32) -> Self {
        Self { rate, budget: RequestBudget::new(total_per_host) }
    }

    /// Reserve budget first, then wait for a rate token. A host whose budget
    /// is spent returns `CapReached` immediately, without waiting.
    pub async fn acquire(&self, host: &str) -> Admission {
        if !self.budget.try_reserve(host) {
            return Admission::CapReached;
        }
        self.rate.acquire(host).await;
        Admission::Granted
    }

    pub fn issued(&self, host: &str) -> u32 {
        self.budget.issued(host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn sustained_rate_is_capped() {
        let limiter = RateLimiter::new(2);
        let start = Instant::now();
        for _ in 0..5 {
            limiter.acquire("h1:80").await;
        }
        // grants at 0s, 0s, 1s, 1s, 2s
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(2));
        assert!(elapsed < Duration::from_millis(2100));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_rps_never_waits() {
        let limiter = RateLimiter::new(0);
        let start = Instant::now();
        for _ in 0..100 {
            limiter.acquire("h1:80").await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_host_does_not_block_others() {
        let limiter = RateLimiter::new(1);
        limiter.acquire("h1:80").await;
        let start = Instant::now();
        limiter.acquire("h2:80").await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn no_window_exceeds_rate_under_contention() {
        let limiter = Arc::new(RateLimiter::new(3));
        let grants = Arc::new(Mutex::new(Vec::new()));
        let mut handles = Vec::new();
        for _ in 0..10 {
            let limiter = limiter.clone();
            let grants = grants.clone();
            handles.push(tokio::spawn(async move {
                limiter.acquire("h1:80").await;
                grants.lock().push(Instant::now());
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        let mut times = grants.lock().clone();
        times.sort();
        assert_eq!(times.len(), 10);
        for pair in times.windows(4) {
            assert!(pair[3].duration_since(pair[0]) >= WINDOW);
        }
    }

    #[test]
    fn budget_stops_at_cap() {
        let budget = RequestBudget::new(3);
        let granted = (0..5).filter(|_| budget.try_reserve("h1:80")).count();
        assert_eq!(granted, 3);
        assert_eq!(budget.issued("h1:80"), 3);
        assert_eq!(budget.issued("h2:80"), 0);
    }

    #[test]
    fn zero_budget_admits_nothing() {
        let budget = RequestBudget::new(0);
        assert!(!budget.try_reserve("h1:80"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn budget_holds_under_concurrent_reservations() {
        let throttle = Arc::new(HostThrottle::new(Arc::new(RateLimiter::new(0)), 10));
        let mut handles = Vec::new();
        for _ in 0..64 {
            let throttle = throttle.clone();
            handles.push(tokio::spawn(async move { throttle.acquire("h1:80").await }));
        }
        let mut granted = 0;
        for h in handles {
            if h.await.unwrap() == Admission::Granted {
                granted += 1;
            }
        }
        assert_eq!(granted, 10);
        assert_eq!(throttle.issued("h1:80"), 10);
    }
}
