//! Network Scanner - discovery collaborator
//!
//! Thin async TCP-connect sweep over a target specification: every
//! (address, port) pair is probed with a bounded fan-out, open ports get
//! a short banner-grab read, and results are grouped into
//! `DiscoveredHost` records. The classifier is the sole consumer of the
//! output; no scanning detail leaks past this module.

pub mod target;

use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use indicatif::ProgressBar;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;

use crate::errors::CidScanResult;
use crate::models::DiscoveredHost;

/// Ports probed when the operator does not supply a list.
pub const DEFAULT_PORTS: [u16; 16] = [
    21, 22, 23, 25, 53, 80, 110, 135, 139, 143, 161, 443, 445, 3306, 3389, 8080,
];

const BANNER_MAX_BYTES: usize = 256;

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub ports: Vec<u16>,
    /// Concurrent connect attempts across all hosts
    pub concurrency: usize,
    pub connect_timeout: Duration,
    pub banner_timeout: Duration,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            ports: DEFAULT_PORTS.to_vec(),
            concurrency: num_cpus::get() * 16,
            connect_timeout: Duration::from_millis(800),
            banner_timeout: Duration::from_millis(600),
        }
    }
}

pub struct NetworkScanner {
    options: ScanOptions,
}

impl NetworkScanner {
    pub fn new(options: ScanOptions) -> Self {
        Self { options }
    }

    /// Sweep the target specification and return every host with at
    /// least one open port. The progress bar advances once per address.
    pub async fn sweep(
        &self,
        spec: &str,
        progress: Option<&ProgressBar>,
    ) -> CidScanResult<Vec<DiscoveredHost>> {
        let addresses = target::parse_targets(spec)?;
        log::info!(
            "Sweeping {} addresses on {} ports (concurrency {})",
            addresses.len(),
            self.options.ports.len(),
            self.options.concurrency
        );
        if let Some(bar) = progress {
            bar.set_length(addresses.len() as u64);
        }

        let semaphore = Arc::new(Semaphore::new(self.options.concurrency.max(1)));
        let mut tasks: JoinSet<Option<(IpAddr, u16, Option<String>)>> = JoinSet::new();

        for ip in &addresses {
            for port in &self.options.ports {
                let ip = *ip;
                let port = *port;
                let semaphore = Arc::clone(&semaphore);
                let connect_timeout = self.options.connect_timeout;
                let banner_timeout = self.options.banner_timeout;
                tasks.spawn(async move {
                    // Closed permits only happen on shutdown; treat as a miss.
                    let _permit = semaphore.acquire_owned().await.ok()?;
                    probe_port(ip, port, connect_timeout, banner_timeout).await
                });
            }
        }

        let ports_per_host = self.options.ports.len().max(1);
        let mut open: BTreeMap<IpAddr, Vec<(u16, Option<String>)>> = BTreeMap::new();
        let mut probes_done = 0usize;
        while let Some(joined) = tasks.join_next().await {
            probes_done += 1;
            if let Some(bar) = progress {
                if probes_done % ports_per_host == 0 {
                    bar.inc(1);
                }
            }
            let Ok(result) = joined else {
                log::warn!("Probe task failed to join");
                continue;
            };
            if let Some((ip, port, banner)) = result {
                open.entry(ip).or_default().push((port, banner));
            }
        }
        if let Some(bar) = progress {
            bar.finish_and_clear();
        }

        let hosts: Vec<DiscoveredHost> = open
            .into_iter()
            .map(|(ip, mut findings)| {
                findings.sort_by_key(|(port, _)| *port);
                let mut host = DiscoveredHost::new(ip.to_string());
                for (port, banner) in findings {
                    host.open_ports.push(port);
                    if let Some(banner) = banner {
                        host.banners.insert(port, banner);
                    }
                }
                host
            })
            .collect();

        log::info!("Sweep complete: {} hosts responded", hosts.len());
        Ok(hosts)
    }
}

/// Probe one (address, port) pair. Returns the open port and any banner
/// the service volunteered within the banner timeout.
async fn probe_port(
    ip: IpAddr,
    port: u16,
    connect_timeout: Duration,
    banner_timeout: Duration,
) -> Option<(IpAddr, u16, Option<String>)> {
    let addr = SocketAddr::new(ip, port);
    let mut stream = match timeout(connect_timeout, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => stream,
        _ => return None,
    };
    log::debug!("Open port {addr}");

    let mut buffer = [0u8; BANNER_MAX_BYTES];
    let banner = match timeout(banner_timeout, stream.read(&mut buffer)).await {
        Ok(Ok(n)) if n > 0 => {
            let text = String::from_utf8_lossy(&buffer[..n]);
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        _ => None,
    };

    Some((ip, port, banner))
}
