use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use super::{HostReport, PortScanner};

/// Full TCP handshake against each port. Needs no privileges.
pub struct TcpConnectScanner {
    ports: Vec<u16>,
    connect_timeout: Duration,
    concurrency: usize,
}

impl TcpConnectScanner {
    pub fn new(ports: Vec<u16>, connect_timeout: Duration, concurrency: usize) -> Self {
        Self { ports, connect_timeout, concurrency: concurrency.max(1) }
    }

    async fn resolve(host: &str) -> Option<IpAddr> {
        if let Ok(ip) = host.trim_start_matches('[').trim_end_matches(']').parse::<IpAddr>() {
            return Some(ip);
        }
        match tokio::net::lookup_host((host, 0)).await {
            Ok(mut addrs) => addrs.next().map(|a| a.ip()),
            Err(e) => {
                tracing::warn!(host, error = %e, "could not resolve target");
                None
            }
        }
    }

    async fn open_ports(&self, address: IpAddr, ports: &[u16]) -> Vec<u16> {
        let mut open: Vec<u16> = stream::iter(ports.iter().copied())
            .map(|port| async move {
                let addr = SocketAddr::new(address, port);
                match timeout(self.connect_timeout, TcpStream::connect(addr)).await {
                    Ok(Ok(_)) => Some(port),
                    _ => None,
                }
            })
            .buffer_unordered(self.concurrency)
            .filter_map(|p| async move { p })
            .collect()
            .await;
        open.sort_unstable();
        open
    }
}

#[async_trait::async_trait]
impl PortScanner for TcpConnectScanner {
    async fn scan(&self, targets: &[String]) -> anyhow::Result<Vec<HostReport>> {
        let mut reports = Vec::new();
        for target in targets {
            // URL targets name one service; only its port is checked.
            let (host, ports) = if target.contains("://") {
                let parsed = url::Url::parse(target)?;
                let host = parsed
                    .host_str()
                    .ok_or_else(|| anyhow::anyhow!("target {} has no host", target))?
                    .to_string();
                let port = parsed
                    .port_or_known_default()
                    .ok_or_else(|| anyhow::anyhow!("target {} has no port", target))?;
                (host, vec![port])
            } else {
                (target.clone(), self.ports.clone())
            };

            let Some(address) = Self::resolve(&host).await else { continue };
            let open_ports = self.open_ports(address, &ports).await;
            tracing::info!(target = %target, %address, open = open_ports.len(), "port scan finished");
            if !open_ports.is_empty() {
                reports.push(HostReport { target: target.clone(), address, open_ports });
            }
        }
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn finds_listening_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let open = listener.local_addr().unwrap().port();
        let closed = {
            let l = TcpListener::bind("127.0.0.1:0").await.unwrap();
            l.local_addr().unwrap().port()
        };

        let scanner = TcpConnectScanner::new(vec![open, closed], Duration::from_millis(500), 4);
        let reports = scanner.scan(&["127.0.0.1".to_string()]).await.unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].open_ports, vec![open]);
    }

    #[tokio::test]
    async fn url_target_checks_only_its_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let target = format!("http://127.0.0.1:{}/app", port);

        let scanner = TcpConnectScanner::new(vec![1], Duration::from_millis(500), 4);
        let reports = scanner.scan(&[target.clone()]).await.unwrap();
        assert_eq!(reports[0].open_ports, vec![port]);
        assert_eq!(super::super::web_targets(&reports, 0), vec![target]);
    }
}
