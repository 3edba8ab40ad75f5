//! Asset Classifier
//!
//! Maps a discovered host (open ports + captured banners) to an asset
//! type, a sensitivity tag, and a human-readable risk note. Rules are
//! priority-ordered and first-match-wins; an empty or unrecognized port
//! profile falls through to the default branch, so classification never
//! fails.

use regex::Regex;

use crate::errors::{CidScanError, CidScanResult};
use crate::models::{AssetType, Classification, DiscoveredHost, Sensitivity};

const RDP_PORT: u16 = 3389;
const SSH_PORT: u16 = 22;
const SNMP_PORT: u16 = 161;
const TELNET_PORT: u16 = 23;

/// Windows desktop service ports (RPC endpoint mapper, NetBIOS, SMB).
const DESKTOP_PORTS: [u16; 3] = [135, 139, 445];

/// Banner substrings that mark an SSH endpoint as a managed server
/// rather than a developer workstation.
const SERVER_BANNER_PATTERN: &str =
    r"(?i)openssh|ubuntu|debian|centos|red\s?hat|fedora|alpine|windows\s?server";

/// Stateless rule-based host classifier.
pub struct Classifier {
    server_banner: Regex,
}

impl Classifier {
    pub fn new() -> CidScanResult<Self> {
        let server_banner = Regex::new(SERVER_BANNER_PATTERN)
            .map_err(|e| CidScanError::regex(e, SERVER_BANNER_PATTERN))?;
        Ok(Self { server_banner })
    }

    /// Classify one discovered host. Deterministic: same input, same output.
    pub fn classify(&self, host: &DiscoveredHost) -> Classification {
        if self.is_server(host) {
            return Classification {
                asset_type: AssetType::Server,
                description: "Server host offering remote administration services".to_string(),
                sensitivity: Sensitivity::Restricted,
                risk_note: "Remote administration exposed".to_string(),
            };
        }

        if self.is_workstation(host) {
            return Classification {
                asset_type: AssetType::Workstation,
                description: "End-user workstation with desktop services".to_string(),
                sensitivity: Sensitivity::Internal,
                risk_note: "Desktop services reachable from the network".to_string(),
            };
        }

        if self.is_network_device(host) {
            return Classification {
                asset_type: AssetType::NetworkDevice,
                description: "Network equipment with a management interface".to_string(),
                sensitivity: Sensitivity::Confidential,
                risk_note: "Management interface exposed".to_string(),
            };
        }

        // Default branch: unmatched or empty port sets land here.
        Classification {
            asset_type: AssetType::Other,
            description: "Host with an unrecognized service profile".to_string(),
            sensitivity: Sensitivity::Internal,
            risk_note: "No classified exposure".to_string(),
        }
    }

    /// Rule 1: RDP open, or SSH open with a server-like banner.
    fn is_server(&self, host: &DiscoveredHost) -> bool {
        if host.has_port(RDP_PORT) {
            return true;
        }
        if host.has_port(SSH_PORT) {
            return host
                .banners
                .get(&SSH_PORT)
                .is_some_and(|banner| self.server_banner.is_match(banner));
        }
        false
    }

    /// Rule 2: desktop service ports without any server-rule match.
    fn is_workstation(&self, host: &DiscoveredHost) -> bool {
        DESKTOP_PORTS.iter().any(|p| host.has_port(*p))
    }

    /// Rule 3: SNMP or Telnet, or a web-admin-only port profile.
    fn is_network_device(&self, host: &DiscoveredHost) -> bool {
        if host.has_port(SNMP_PORT) || host.has_port(TELNET_PORT) {
            return true;
        }
        !host.open_ports.is_empty()
            && host.open_ports.iter().all(|p| *p == 80 || *p == 443)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host_with_ports(ports: &[u16]) -> DiscoveredHost {
        let mut host = DiscoveredHost::new("10.0.0.10");
        host.open_ports = ports.to_vec();
        host
    }

    #[test]
    fn test_rdp_is_server() {
        let classifier = Classifier::new().unwrap();
        let c = classifier.classify(&host_with_ports(&[3389]));
        assert_eq!(c.asset_type, AssetType::Server);
        assert_eq!(c.sensitivity, Sensitivity::Restricted);
        assert_eq!(c.risk_note, "Remote administration exposed");
    }

    #[test]
    fn test_ssh_with_server_banner_is_server() {
        let classifier = Classifier::new().unwrap();
        let mut host = host_with_ports(&[22]);
        host.banners
            .insert(22, "SSH-2.0-OpenSSH_8.9p1 Ubuntu-3ubuntu0.1".to_string());
        let c = classifier.classify(&host);
        assert_eq!(c.asset_type, AssetType::Server);
    }

    #[test]
    fn test_ssh_without_server_banner_is_not_server() {
        let classifier = Classifier::new().unwrap();
        let mut host = host_with_ports(&[22]);
        host.banners.insert(22, "SSH-2.0-dropbear_2022.83".to_string());
        let c = classifier.classify(&host);
        assert_ne!(c.asset_type, AssetType::Server);
    }

    #[test]
    fn test_desktop_ports_are_workstation() {
        let classifier = Classifier::new().unwrap();
        let c = classifier.classify(&host_with_ports(&[135, 139, 445]));
        assert_eq!(c.asset_type, AssetType::Workstation);
        assert_eq!(c.sensitivity, Sensitivity::Internal);
    }

    #[test]
    fn test_server_rule_wins_over_workstation() {
        // RDP plus SMB: rule order decides, first match wins.
        let classifier = Classifier::new().unwrap();
        let c = classifier.classify(&host_with_ports(&[3389, 445]));
        assert_eq!(c.asset_type, AssetType::Server);
    }

    #[test]
    fn test_snmp_is_network_device() {
        let classifier = Classifier::new().unwrap();
        let c = classifier.classify(&host_with_ports(&[161]));
        assert_eq!(c.asset_type, AssetType::NetworkDevice);
        assert_eq!(c.sensitivity, Sensitivity::Confidential);
    }

    #[test]
    fn test_web_admin_only_is_network_device() {
        let classifier = Classifier::new().unwrap();
        let c = classifier.classify(&host_with_ports(&[80, 443]));
        assert_eq!(c.asset_type, AssetType::NetworkDevice);
    }

    #[test]
    fn test_web_plus_other_services_is_not_network_device() {
        let classifier = Classifier::new().unwrap();
        let c = classifier.classify(&host_with_ports(&[80, 443, 8080]));
        assert_eq!(c.asset_type, AssetType::Other);
    }

    #[test]
    fn test_empty_ports_fall_through_to_other() {
        let classifier = Classifier::new().unwrap();
        let c = classifier.classify(&host_with_ports(&[]));
        assert_eq!(c.asset_type, AssetType::Other);
        assert_eq!(c.sensitivity, Sensitivity::Internal);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let classifier = Classifier::new().unwrap();
        let host = host_with_ports(&[22, 80, 445]);
        let first = classifier.classify(&host);
        let second = classifier.classify(&host);
        assert_eq!(first, second);
    }
}
