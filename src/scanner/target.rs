//! Scan target parsing.
//!
//! A target specification is a comma-separated list of elements, each of
//! which is a single IP address, CIDR notation, or a resolvable hostname.

use std::net::{IpAddr, ToSocketAddrs};

use ipnetwork::IpNetwork;

use crate::errors::{CidScanError, CidScanResult};

/// Minimum IPv4 prefix length accepted. A /16 already means 65k hosts.
const MIN_IPV4_PREFIX: u8 = 16;
/// Minimum IPv6 prefix length accepted.
const MIN_IPV6_PREFIX: u8 = 112;

/// Expand a target specification into the addresses to probe.
pub fn parse_targets(spec: &str) -> CidScanResult<Vec<IpAddr>> {
    let spec = spec.trim();
    if spec.is_empty() {
        return Err(CidScanError::target(spec, "empty target specification"));
    }

    let mut addresses = Vec::new();
    for element in spec.split(',') {
        let element = element.trim();
        if element.is_empty() {
            continue;
        }
        if element.contains('/') {
            addresses.extend(parse_cidr(element)?);
        } else if let Ok(ip) = element.parse::<IpAddr>() {
            addresses.push(ip);
        } else {
            addresses.push(resolve_hostname(element)?);
        }
    }

    if addresses.is_empty() {
        return Err(CidScanError::target(spec, "no addresses in specification"));
    }

    addresses.dedup();
    Ok(addresses)
}

fn parse_cidr(element: &str) -> CidScanResult<Vec<IpAddr>> {
    let network: IpNetwork = element
        .parse()
        .map_err(|e| CidScanError::target(element, format!("invalid CIDR: {e}")))?;

    let (min_prefix, family) = match network {
        IpNetwork::V4(_) => (MIN_IPV4_PREFIX, "IPv4"),
        IpNetwork::V6(_) => (MIN_IPV6_PREFIX, "IPv6"),
    };
    if network.prefix() < min_prefix {
        return Err(CidScanError::target(
            element,
            format!(
                "/{} is too large for {family} (minimum prefix: /{min_prefix})",
                network.prefix()
            ),
        ));
    }

    Ok(network.iter().collect())
}

fn resolve_hostname(name: &str) -> CidScanResult<IpAddr> {
    let mut resolved = format!("{name}:0")
        .to_socket_addrs()
        .map_err(|e| CidScanError::target(name, format!("DNS resolution failed: {e}")))?;
    resolved
        .next()
        .map(|addr| addr.ip())
        .ok_or_else(|| CidScanError::target(name, "DNS resolution returned no addresses"))
}
