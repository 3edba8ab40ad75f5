//! Risk Lifecycle Engine
//!
//! Inherent scoring and the risk state machine:
//! Open -> InTreatment -> Verified -> Closed, plus free administrative
//! override to any state. All functions are pure over the records passed
//! in; persistence is the store's concern.

use chrono::{DateTime, Utc};

use crate::errors::{CidScanError, CidScanResult};
use crate::models::{Residual, Risk, RiskState};

/// Inherent risk score: probability * impact, both in [1,5].
///
/// Validation happens before the multiply; out-of-range values never
/// produce a score.
pub fn risk_score(probability: i64, impact: i64) -> CidScanResult<i64> {
    for (name, value) in [("probability", probability), ("impact", impact)] {
        if !(1..=5).contains(&value) {
            return Err(CidScanError::invalid(format!(
                "{name} {value} outside [1,5]"
            )));
        }
    }
    Ok(probability * impact)
}

/// Build a new risk in its initial state.
///
/// All fields are validated before the record is constructed, so a
/// failure here leaves nothing to roll back.
#[allow(clippy::too_many_arguments)]
pub fn new_risk(
    asset_id: i64,
    threat: impl Into<String>,
    vulnerability: impl Into<String>,
    existing_control: Option<String>,
    probability: i64,
    impact: i64,
    observations: impl Into<String>,
    created_at: DateTime<Utc>,
) -> CidScanResult<Risk> {
    let inherent_score = risk_score(probability, impact)?;
    Ok(Risk {
        id: 0,
        asset_id,
        threat: threat.into(),
        vulnerability: vulnerability.into(),
        existing_control: existing_control
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| "N/A".to_string()),
        probability,
        impact,
        inherent_score,
        state: RiskState::Open,
        observations: observations.into(),
        created_at,
    })
}

/// Build a residual assessment for a risk.
///
/// The caller upserts the result; at most one residual exists per risk.
pub fn new_residual(
    risk_id: i64,
    probability: i64,
    impact: i64,
    evaluated_at: impl Into<String>,
) -> CidScanResult<Residual> {
    let score = risk_score(probability, impact)?;
    Ok(Residual {
        risk_id,
        probability,
        impact,
        score,
        evaluated_at: evaluated_at.into(),
    })
}

/// Advance an Open risk to InTreatment.
///
/// Invoked by the treatment-creation workflow as an explicit step, not a
/// hidden side effect. Idempotent: any state other than Open is left
/// untouched. Returns whether the state changed.
pub fn advance_to_treatment(risk: &mut Risk) -> bool {
    if risk.state == RiskState::Open {
        risk.state = RiskState::InTreatment;
        true
    } else {
        false
    }
}

/// Administrative override: set any state from any state.
///
/// No transition table applies here; manual correction must always be
/// possible.
pub fn set_state(risk: &mut Risk, state: RiskState) {
    risk.state = state;
}

/// Named policy: mark a risk Verified when its residual score is at or
/// below the given threshold.
///
/// Only applied when an operator opts in with a threshold; a residual
/// assessment on its own never changes risk state. Returns whether the
/// policy fired.
pub fn verify_if_residual_low(risk: &mut Risk, residual_score: i64, threshold: i64) -> bool {
    if residual_score <= threshold {
        risk.state = RiskState::Verified;
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_risk(state: RiskState) -> Risk {
        Risk {
            id: 1,
            asset_id: 1,
            threat: "Credential theft".to_string(),
            vulnerability: "Weak passwords".to_string(),
            existing_control: "N/A".to_string(),
            probability: 4,
            impact: 5,
            inherent_score: 20,
            state,
            observations: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_risk_score_full_grid() {
        for probability in 1..=5 {
            for impact in 1..=5 {
                assert_eq!(risk_score(probability, impact).unwrap(), probability * impact);
            }
        }
    }

    #[test]
    fn test_risk_score_bounds() {
        assert_eq!(risk_score(1, 1).unwrap(), 1);
        assert_eq!(risk_score(5, 5).unwrap(), 25);
    }

    #[test]
    fn test_risk_score_rejects_out_of_range() {
        assert!(risk_score(0, 3).is_err());
        assert!(risk_score(3, 6).is_err());
        assert!(risk_score(-1, 1).is_err());
    }

    #[test]
    fn test_new_risk_starts_open() {
        let risk = new_risk(1, "t", "v", None, 3, 3, "", Utc::now()).unwrap();
        assert_eq!(risk.state, RiskState::Open);
        assert_eq!(risk.inherent_score, 9);
        assert_eq!(risk.existing_control, "N/A");
    }

    #[test]
    fn test_new_risk_blank_control_defaults() {
        let risk = new_risk(1, "t", "v", Some("  ".to_string()), 2, 2, "", Utc::now()).unwrap();
        assert_eq!(risk.existing_control, "N/A");

        let risk = new_risk(1, "t", "v", Some("MFA".to_string()), 2, 2, "", Utc::now()).unwrap();
        assert_eq!(risk.existing_control, "MFA");
    }

    #[test]
    fn test_new_risk_validates_before_building() {
        assert!(new_risk(1, "t", "v", None, 9, 3, "", Utc::now()).is_err());
    }

    #[test]
    fn test_treatment_advances_open_risk() {
        let mut risk = sample_risk(RiskState::Open);
        assert!(advance_to_treatment(&mut risk));
        assert_eq!(risk.state, RiskState::InTreatment);
    }

    #[test]
    fn test_second_treatment_is_idempotent() {
        let mut risk = sample_risk(RiskState::Open);
        advance_to_treatment(&mut risk);
        assert!(!advance_to_treatment(&mut risk));
        assert_eq!(risk.state, RiskState::InTreatment);
    }

    #[test]
    fn test_treatment_leaves_other_states_alone() {
        for state in [RiskState::Verified, RiskState::Closed] {
            let mut risk = sample_risk(state);
            assert!(!advance_to_treatment(&mut risk));
            assert_eq!(risk.state, state);
        }
    }

    #[test]
    fn test_override_accepts_any_state_from_any_state() {
        for from in RiskState::all() {
            for to in RiskState::all() {
                let mut risk = sample_risk(from);
                set_state(&mut risk, to);
                assert_eq!(risk.state, to);
            }
        }
    }

    #[test]
    fn test_verify_policy_fires_at_threshold() {
        let mut risk = sample_risk(RiskState::InTreatment);
        assert!(verify_if_residual_low(&mut risk, 4, 4));
        assert_eq!(risk.state, RiskState::Verified);
    }

    #[test]
    fn test_verify_policy_holds_above_threshold() {
        let mut risk = sample_risk(RiskState::InTreatment);
        assert!(!verify_if_residual_low(&mut risk, 5, 4));
        assert_eq!(risk.state, RiskState::InTreatment);
    }

    #[test]
    fn test_new_residual_score_is_product() {
        let residual = new_residual(7, 2, 3, "2026-08-07").unwrap();
        assert_eq!(residual.score, 6);
        assert_eq!(residual.risk_id, 7);
    }
}
