//! Port discovery and the policy that turns open ports into web targets.

pub mod tcp_connect;

use std::net::IpAddr;

use serde::Serialize;

use crate::defaults::{is_web_port, TLS_PORTS};

pub use tcp_connect::TcpConnectScanner;

/// A target that answered on at least one port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostReport {
    /// The target exactly as written in the engagement scope.
    pub target: String,
    pub address: IpAddr,
    pub open_ports: Vec<u16>,
}

impl HostReport {
    pub fn has_web_port(&self) -> bool {
        self.open_ports.iter().any(|p| is_web_port(*p))
    }
}

#[async_trait::async_trait]
pub trait PortScanner: Send + Sync {
    /// Scan every target; hosts without an open port are left out.
    async fn scan(&self, targets: &[String]) -> anyhow::Result<Vec<HostReport>>;
}

/// Base URLs worth enumerating.
///
/// A target written as a URL is kept verbatim when its own port is open.
/// Bare hosts yield one base URL per open web port. With `max_hosts > 0`,
/// only the hosts with the most open ports are kept.
pub fn web_targets(reports: &[HostReport], max_hosts: usize) -> Vec<String> {
    let mut ranked: Vec<&HostReport> = reports.iter().filter(|r| !r.open_ports.is_empty()).collect();
    if max_hosts > 0 {
        ranked.sort_by(|a, b| b.open_ports.len().cmp(&a.open_ports.len()));
        ranked.truncate(max_hosts);
    }

    let mut out = Vec::new();
    for report in ranked {
        if report.target.contains("://") {
            let own_port = url::Url::parse(&report.target).ok().and_then(|u| u.port_or_known_default());
            if own_port.is_some_and(|p| report.open_ports.contains(&p)) {
                out.push(report.target.clone());
            }
            continue;
        }
        let host = match report.target.parse::<IpAddr>() {
            Ok(IpAddr::V6(v6)) => format!("[{}]", v6),
            _ => report.target.clone(),
        };
        for port in report.open_ports.iter().copied().filter(|p| is_web_port(*p)) {
            let scheme = if TLS_PORTS.contains(&port) { "https" } else { "http" };
            let url = match (scheme, port) {
                ("http", 80) | ("https", 443) => format!("{}://{}", scheme, host),
                _ => format!("{}://{}:{}", scheme, host, port),
            };
            out.push(url);
        }
    }
    out
}
