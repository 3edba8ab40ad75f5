//! CID Scoring Engine
//!
//! Maps an asset type to fixed Confidentiality/Integrity/Availability
//! weights, combines them into a criticality value, and derives the
//! qualitative impact label used across reports and dashboards.

use crate::errors::{CidScanError, CidScanResult};
use crate::models::{AssetType, ImpactLabel};

/// C/I/A weights for one asset type. Each weight is in [1,5].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CidWeights {
    pub confidentiality: u8,
    pub integrity: u8,
    pub availability: u8,
}

impl CidWeights {
    pub fn as_tuple(&self) -> (u8, u8, u8) {
        (self.confidentiality, self.integrity, self.availability)
    }
}

/// Fixed weight table keyed by asset type.
///
/// Unknown type names never reach this function: they are rejected when
/// parsed into `AssetType` (see `models`), so the lookup itself is total.
pub fn cid_for(asset_type: AssetType) -> CidWeights {
    let (confidentiality, integrity, availability) = match asset_type {
        AssetType::Server => (5, 4, 4),
        AssetType::Workstation => (3, 2, 2),
        AssetType::NetworkDevice => (3, 4, 5),
        AssetType::CloudService => (5, 4, 3),
        AssetType::Other => (2, 2, 2),
    };
    CidWeights {
        confidentiality,
        integrity,
        availability,
    }
}

/// Criticality is the plain sum of the three weights, range [3,15].
pub fn criticality(weights: CidWeights) -> i64 {
    i64::from(weights.confidentiality)
        + i64::from(weights.integrity)
        + i64::from(weights.availability)
}

/// Validate explicitly supplied weights and return their criticality.
///
/// Used by the administrative re-valuation path, where the three values
/// arrive as operator input rather than from the table.
pub fn revalue(confidentiality: i64, integrity: i64, availability: i64) -> CidScanResult<i64> {
    for (name, value) in [
        ("confidentiality", confidentiality),
        ("integrity", integrity),
        ("availability", availability),
    ] {
        if !(1..=5).contains(&value) {
            return Err(CidScanError::invalid(format!(
                "{name} weight {value} outside [1,5]"
            )));
        }
    }
    Ok(confidentiality + integrity + availability)
}

/// Map a criticality value to its impact label.
///
/// Boundaries are inclusive and fixed: Low 3-6, Medium 7-10, High 11-13,
/// Critical 14-15. Values outside [3,15] are invalid input.
pub fn impact_label(value: i64) -> CidScanResult<ImpactLabel> {
    match value {
        3..=6 => Ok(ImpactLabel::Low),
        7..=10 => Ok(ImpactLabel::Medium),
        11..=13 => Ok(ImpactLabel::High),
        14..=15 => Ok(ImpactLabel::Critical),
        other => Err(CidScanError::invalid(format!(
            "criticality {other} outside [3,15]"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_weights_in_range() {
        for asset_type in AssetType::all() {
            let w = cid_for(asset_type);
            for v in [w.confidentiality, w.integrity, w.availability] {
                assert!((1..=5).contains(&v), "{asset_type}: weight {v} out of range");
            }
        }
    }

    #[test]
    fn test_criticality_is_exact_sum() {
        for asset_type in AssetType::all() {
            let w = cid_for(asset_type);
            let expected = i64::from(w.confidentiality)
                + i64::from(w.integrity)
                + i64::from(w.availability);
            assert_eq!(criticality(w), expected);
        }
    }

    #[test]
    fn test_impact_label_monotonic() {
        let mut previous = ImpactLabel::Low;
        for value in 3..=15 {
            let label = impact_label(value).unwrap();
            assert!(label >= previous, "label regressed at {value}");
            previous = label;
        }
    }

    #[test]
    fn test_impact_label_boundaries() {
        assert_eq!(impact_label(3).unwrap(), ImpactLabel::Low);
        assert_eq!(impact_label(6).unwrap(), ImpactLabel::Low);
        assert_eq!(impact_label(7).unwrap(), ImpactLabel::Medium);
        assert_eq!(impact_label(10).unwrap(), ImpactLabel::Medium);
        assert_eq!(impact_label(11).unwrap(), ImpactLabel::High);
        assert_eq!(impact_label(13).unwrap(), ImpactLabel::High);
        assert_eq!(impact_label(14).unwrap(), ImpactLabel::Critical);
        assert_eq!(impact_label(15).unwrap(), ImpactLabel::Critical);
    }

    #[test]
    fn test_impact_label_out_of_range() {
        assert!(impact_label(2).is_err());
        assert!(impact_label(16).is_err());
        assert!(impact_label(0).is_err());
    }

    #[test]
    fn test_extremes() {
        let max = CidWeights {
            confidentiality: 5,
            integrity: 5,
            availability: 5,
        };
        assert_eq!(criticality(max), 15);
        assert_eq!(impact_label(15).unwrap(), ImpactLabel::Critical);

        let min = CidWeights {
            confidentiality: 1,
            integrity: 1,
            availability: 1,
        };
        assert_eq!(criticality(min), 3);
        assert_eq!(impact_label(3).unwrap(), ImpactLabel::Low);
    }

    #[test]
    fn test_server_scenario() {
        let w = cid_for(AssetType::Server);
        assert_eq!(w.as_tuple(), (5, 4, 4));
        let value = criticality(w);
        assert_eq!(value, 13);
        assert_eq!(impact_label(value).unwrap(), ImpactLabel::High);
    }

    #[test]
    fn test_revalue_validates_before_computing() {
        assert_eq!(revalue(5, 4, 4).unwrap(), 13);
        assert!(revalue(0, 4, 4).is_err());
        assert!(revalue(5, 6, 4).is_err());
        assert!(revalue(5, 4, -1).is_err());
    }
}
