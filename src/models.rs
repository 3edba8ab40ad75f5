use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::errors::CidScanError;

/// Asset category used as the key into the CID weight table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetType {
    Server,
    Workstation,
    NetworkDevice,
    CloudService,
    Other,
}

impl AssetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::Server => "Server",
            AssetType::Workstation => "Workstation",
            AssetType::NetworkDevice => "NetworkDevice",
            AssetType::CloudService => "CloudService",
            AssetType::Other => "Other",
        }
    }

    /// All types with an entry in the CID weight table.
    pub fn all() -> [AssetType; 5] {
        [
            AssetType::Server,
            AssetType::Workstation,
            AssetType::NetworkDevice,
            AssetType::CloudService,
            AssetType::Other,
        ]
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Type names arrive as free text from the configuration file; a name
/// outside the weight table is rejected here, never silently defaulted.
impl FromStr for AssetType {
    type Err = CidScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Server" => Ok(AssetType::Server),
            "Workstation" => Ok(AssetType::Workstation),
            "NetworkDevice" => Ok(AssetType::NetworkDevice),
            "CloudService" => Ok(AssetType::CloudService),
            "Other" => Ok(AssetType::Other),
            other => Err(CidScanError::UnknownAssetType(other.to_string())),
        }
    }
}

/// Information-sensitivity tag assigned during classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sensitivity {
    Public,
    Internal,
    Confidential,
    Restricted,
}

impl Sensitivity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sensitivity::Public => "Public",
            Sensitivity::Internal => "Internal",
            Sensitivity::Confidential => "Confidential",
            Sensitivity::Restricted => "Restricted",
        }
    }
}

impl fmt::Display for Sensitivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Sensitivity {
    type Err = CidScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Public" => Ok(Sensitivity::Public),
            "Internal" => Ok(Sensitivity::Internal),
            "Confidential" => Ok(Sensitivity::Confidential),
            "Restricted" => Ok(Sensitivity::Restricted),
            other => Err(CidScanError::invalid(format!(
                "unknown sensitivity '{other}'"
            ))),
        }
    }
}

/// Lifecycle state of a risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskState {
    Open,
    InTreatment,
    Verified,
    Closed,
}

impl RiskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskState::Open => "Open",
            RiskState::InTreatment => "InTreatment",
            RiskState::Verified => "Verified",
            RiskState::Closed => "Closed",
        }
    }

    pub fn all() -> [RiskState; 4] {
        [
            RiskState::Open,
            RiskState::InTreatment,
            RiskState::Verified,
            RiskState::Closed,
        ]
    }
}

impl fmt::Display for RiskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RiskState {
    type Err = CidScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Open" => Ok(RiskState::Open),
            "InTreatment" => Ok(RiskState::InTreatment),
            "Verified" => Ok(RiskState::Verified),
            "Closed" => Ok(RiskState::Closed),
            other => Err(CidScanError::invalid(format!(
                "unknown risk state '{other}'"
            ))),
        }
    }
}

/// Treatment strategy for a risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    Mitigate,
    Transfer,
    Accept,
    Avoid,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Mitigate => "Mitigate",
            Strategy::Transfer => "Transfer",
            Strategy::Accept => "Accept",
            Strategy::Avoid => "Avoid",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = CidScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Mitigate" => Ok(Strategy::Mitigate),
            "Transfer" => Ok(Strategy::Transfer),
            "Accept" => Ok(Strategy::Accept),
            "Avoid" => Ok(Strategy::Avoid),
            other => Err(CidScanError::invalid(format!(
                "unknown treatment strategy '{other}'"
            ))),
        }
    }
}

/// Implementation status of a proposed control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlStatus {
    Pending,
    InProgress,
    Done,
}

impl ControlStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlStatus::Pending => "Pending",
            ControlStatus::InProgress => "InProgress",
            ControlStatus::Done => "Done",
        }
    }
}

impl fmt::Display for ControlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ControlStatus {
    type Err = CidScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(ControlStatus::Pending),
            "InProgress" => Ok(ControlStatus::InProgress),
            "Done" => Ok(ControlStatus::Done),
            other => Err(CidScanError::invalid(format!(
                "unknown control status '{other}'"
            ))),
        }
    }
}

/// Qualitative impact label derived from the criticality sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ImpactLabel {
    Low,
    Medium,
    High,
    Critical,
}

impl ImpactLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImpactLabel::Low => "Low",
            ImpactLabel::Medium => "Medium",
            ImpactLabel::High => "High",
            ImpactLabel::Critical => "Critical",
        }
    }
}

impl fmt::Display for ImpactLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A host record produced by the discovery sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredHost {
    /// Network address (the asset uniqueness key)
    pub address: String,
    /// Reverse-resolved name, if any
    pub hostname: Option<String>,
    /// Open TCP ports found during the sweep
    pub open_ports: Vec<u16>,
    /// Service banners captured per port
    pub banners: BTreeMap<u16, String>,
}

impl DiscoveredHost {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            hostname: None,
            open_ports: Vec::new(),
            banners: BTreeMap::new(),
        }
    }

    pub fn has_port(&self, port: u16) -> bool {
        self.open_ports.contains(&port)
    }
}

/// Result of classifying a discovered host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub asset_type: AssetType,
    pub description: String,
    pub sensitivity: Sensitivity,
    /// Human-readable note on the exposure the rule detected
    pub risk_note: String,
}

/// An inventoried asset row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: i64,
    /// Unique key; manual config assets use their declared ID string here
    pub address: String,
    pub hostname: String,
    pub location: String,
    pub asset_type: AssetType,
    pub description: String,
    pub sensitivity: Sensitivity,
    /// Sum of the C/I/A weights, range 3-15
    pub criticality: i64,
    pub created_at: DateTime<Utc>,
}

/// A risk recorded against an asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Risk {
    pub id: i64,
    pub asset_id: i64,
    pub threat: String,
    pub vulnerability: String,
    pub existing_control: String,
    /// Likelihood, 1-5
    pub probability: i64,
    /// Impact, 1-5
    pub impact: i64,
    /// probability * impact, range 1-25
    pub inherent_score: i64,
    pub state: RiskState,
    pub observations: String,
    pub created_at: DateTime<Utc>,
}

/// An append-only treatment event for a risk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Treatment {
    pub id: i64,
    pub risk_id: i64,
    pub strategy: Strategy,
    /// External-standard control reference (e.g. an ISO/IEC 27002 clause)
    pub control_ref: String,
    pub proposed_control: String,
    pub responsible: String,
    pub target_date: String,
    pub control_status: ControlStatus,
    pub created_at: DateTime<Utc>,
}

/// Post-treatment re-assessment; at most one per risk (upsert semantics).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Residual {
    pub risk_id: i64,
    pub probability: i64,
    pub impact: i64,
    pub score: i64,
    pub evaluated_at: String,
}

/// Flat inventory row handed to the report renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryRow {
    pub report_id: String,
    pub location: String,
    pub asset_type: String,
    pub description: String,
    pub owner: String,
    pub security_responsible: String,
    pub registered_at: String,
    pub status: String,
    pub associated_risk: String,
    pub sensitivity: String,
    pub criticality: i64,
}

/// CID calculation row handed to the report renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CidRow {
    pub report_id: String,
    pub confidentiality: u8,
    pub integrity: u8,
    pub availability: u8,
    pub value: i64,
    pub impact: String,
}

/// Risk-register row for the report renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskRow {
    pub risk_id: i64,
    pub asset_id: i64,
    pub threat: String,
    pub vulnerability: String,
    pub existing_control: String,
    pub probability: i64,
    pub impact: i64,
    pub inherent: i64,
    pub state: String,
    pub observations: String,
    pub residual: Option<i64>,
}

/// Treatment row for the report renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreatmentRow {
    pub risk_id: i64,
    pub strategy: String,
    pub control_ref: String,
    pub proposed_control: String,
    pub responsible: String,
    pub target_date: String,
    pub control_status: String,
}

/// Residual-assessment row for the report renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResidualRow {
    pub risk_id: i64,
    pub probability: i64,
    pub impact: i64,
    pub score: i64,
    pub evaluated_at: String,
}

/// Risk counts per lifecycle state for the dashboard.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct StateCounts {
    pub open: i64,
    pub in_treatment: i64,
    pub verified: i64,
    pub closed: i64,
}

impl StateCounts {
    pub fn total(&self) -> i64 {
        self.open + self.in_treatment + self.verified + self.closed
    }
}

/// Top-risk line for the dashboard: inherent vs. residual.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopRisk {
    pub risk_id: i64,
    pub asset_id: i64,
    pub inherent: i64,
    pub residual: Option<i64>,
    pub state: RiskState,
}

/// Everything the report renderer and CSV exporter consume.
#[derive(Debug, Clone, Serialize)]
pub struct ReportBundle {
    pub company: String,
    pub target: String,
    pub generated_at: String,
    pub inventory: Vec<InventoryRow>,
    pub cid: Vec<CidRow>,
    pub risks: Vec<RiskRow>,
    pub treatments: Vec<TreatmentRow>,
    pub residuals: Vec<ResidualRow>,
    pub counts: StateCounts,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_type_roundtrip() {
        for t in AssetType::all() {
            let parsed: AssetType = t.as_str().parse().unwrap();
            assert_eq!(parsed, t);
        }
    }

    #[test]
    fn test_unknown_asset_type_rejected() {
        let err = "Drone".parse::<AssetType>().unwrap_err();
        assert!(matches!(err, CidScanError::UnknownAssetType(ref name) if name == "Drone"));
    }

    #[test]
    fn test_risk_state_roundtrip() {
        for s in RiskState::all() {
            let parsed: RiskState = s.as_str().parse().unwrap();
            assert_eq!(parsed, s);
        }
    }

    #[test]
    fn test_strategy_parse_rejects_unknown() {
        assert!("Ignore".parse::<Strategy>().is_err());
        assert_eq!("Mitigate".parse::<Strategy>().unwrap(), Strategy::Mitigate);
    }

    #[test]
    fn test_impact_label_ordering() {
        assert!(ImpactLabel::Low < ImpactLabel::Medium);
        assert!(ImpactLabel::Medium < ImpactLabel::High);
        assert!(ImpactLabel::High < ImpactLabel::Critical);
    }

    #[test]
    fn test_discovered_host_defaults() {
        let host = DiscoveredHost::new("10.0.0.1");
        assert!(host.open_ports.is_empty());
        assert!(host.hostname.is_none());
        assert!(!host.has_port(22));
    }
}
