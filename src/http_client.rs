use reqwest::{Client, ClientBuilder};
use std::time::Duration;

use crate::config::Limits;

pub const USER_AGENT: &str = concat!("razor/", env!("CARGO_PKG_VERSION"));

/// HTTP client for endpoint enumeration, bounded by the engagement timeouts.
pub fn build_probe_client(limits: &Limits) -> reqwest::Result<Client> {
    ClientBuilder::new()
        // Connection pooling
        .pool_max_idle_per_host(limits.concurrency as usize)
        .pool_idle_timeout(Some(Duration::from_secs(90)))
        .tcp_nodelay(true)

        // Timeouts
        .connect_timeout(limits.connect_timeout())
        .timeout(limits.request_timeout())

        // TLS
        .use_rustls_tls()
        .https_only(false)

        // 3xx answers are findings in their own right
        .redirect(reqwest::redirect::Policy::none())

        .user_agent(USER_AGENT)

        // Assessment targets routinely run self-signed certificates
        .danger_accept_invalid_certs(true)

        .build()
}
