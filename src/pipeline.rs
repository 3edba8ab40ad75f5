//! Discovery and valuation pipeline.
//!
//! The end-to-end assessment run: sweep the target, classify each host,
//! value it with the CID engine, upsert it into the store, fold in the
//! manually-declared config assets, then render the HTML report and CSV
//! registers. Risk/treatment/residual registers come straight from the
//! store so manual lifecycle work done between runs shows up in every
//! report.

use std::path::{Path, PathBuf};

use chrono::{Local, Utc};

use crate::cid;
use crate::classifier::Classifier;
use crate::config::CompanyConfig;
use crate::errors::CidScanResult;
use crate::exporter::CsvExporter;
use crate::models::{
    Asset, AssetType, CidRow, ImpactLabel, InventoryRow, ReportBundle, RiskRow, Sensitivity,
    TreatmentRow,
};
use crate::reporter::HtmlReporter;
use crate::scanner::NetworkScanner;
use crate::store::RecordStore;
use crate::ui;

/// What a pipeline run produced, for the caller's summary output.
#[derive(Debug)]
pub struct RunOutcome {
    pub hosts_seen: usize,
    /// Total inventory rows: discovered hosts plus manual config assets
    pub assets_registered: usize,
    pub manual_assets: usize,
    pub outputs: Vec<PathBuf>,
}

/// Sequential report identifiers (A-001, A-002, ...) used in the
/// rendered inventory; store rowids stay internal.
struct ReportIdSequence(usize);

impl ReportIdSequence {
    fn new() -> Self {
        Self(0)
    }

    fn next(&mut self) -> String {
        self.0 += 1;
        format!("A-{:03}", self.0)
    }
}

pub async fn run_assessment(
    config: &CompanyConfig,
    store: &mut RecordStore,
    scanner: &NetworkScanner,
    target: &str,
    out_dir: &Path,
    quiet: bool,
) -> CidScanResult<RunOutcome> {
    log::info!("Starting assessment run against '{target}'");
    let progress = ui::sweep_progress(quiet);
    let hosts = scanner.sweep(target, Some(&progress)).await?;

    let classifier = Classifier::new()?;
    let mut ids = ReportIdSequence::new();
    let mut inventory = Vec::new();
    let mut cid_rows = Vec::new();
    let registered_at = Local::now().format("%d/%m/%Y").to_string();

    // Discovered hosts: classify, value, upsert by network address.
    for host in &hosts {
        let classification = classifier.classify(host);
        let weights = cid::cid_for(classification.asset_type);
        let value = cid::criticality(weights);
        let label = cid::impact_label(value)?;

        let stored = store.upsert_asset(&Asset {
            id: 0,
            address: host.address.clone(),
            hostname: host.hostname.clone().unwrap_or_default(),
            location: config.default_location.clone(),
            asset_type: classification.asset_type,
            description: classification.description.clone(),
            sensitivity: classification.sensitivity,
            criticality: value,
            created_at: Utc::now(),
        })?;
        log::debug!(
            "Registered asset #{} {} as {} (criticality {})",
            stored.id,
            stored.address,
            stored.asset_type,
            value
        );

        let report_id = ids.next();
        inventory.push(InventoryRow {
            report_id: report_id.clone(),
            location: stored.location.clone(),
            asset_type: stored.asset_type.to_string(),
            description: stored.description.clone(),
            owner: "Unassigned".to_string(),
            security_responsible: config.security_responsible.clone(),
            registered_at: registered_at.clone(),
            status: "Active".to_string(),
            associated_risk: classification.risk_note.clone(),
            sensitivity: stored.sensitivity.to_string(),
            criticality: value,
        });
        cid_rows.push(CidRow {
            report_id,
            confidentiality: weights.confidentiality,
            integrity: weights.integrity,
            availability: weights.availability,
            value,
            impact: label.to_string(),
        });
    }

    // Manually-declared assets (cloud services, mail, ...) are valued
    // with the same engine. An unknown type name fails the run here.
    for manual in &config.manual_assets {
        let (asset_type, weights, value, label) = value_declared_type(&manual.asset_type)?;
        let sensitivity = match &manual.sensitivity {
            Some(tag) => tag.parse()?,
            None => Sensitivity::Internal,
        };

        store.upsert_asset(&Asset {
            id: 0,
            address: manual.id.clone(),
            hostname: String::new(),
            location: manual.location.clone().unwrap_or_else(|| "Cloud".to_string()),
            asset_type,
            description: manual
                .description
                .clone()
                .unwrap_or_else(|| "Manually declared asset".to_string()),
            sensitivity,
            criticality: value,
            created_at: Utc::now(),
        })?;

        let report_id = ids.next();
        inventory.push(InventoryRow {
            report_id: report_id.clone(),
            location: manual.location.clone().unwrap_or_else(|| "Cloud".to_string()),
            asset_type: asset_type.to_string(),
            description: manual
                .description
                .clone()
                .unwrap_or_else(|| "Manually declared asset".to_string()),
            owner: manual.owner.clone().unwrap_or_else(|| "Unassigned".to_string()),
            security_responsible: manual
                .security_responsible
                .clone()
                .unwrap_or_else(|| config.security_responsible.clone()),
            registered_at: registered_at.clone(),
            status: manual.status.clone().unwrap_or_else(|| "Active".to_string()),
            associated_risk: manual.risk_note.clone().unwrap_or_else(|| "N/A".to_string()),
            sensitivity: sensitivity.to_string(),
            criticality: value,
        });
        cid_rows.push(CidRow {
            report_id,
            confidentiality: weights.confidentiality,
            integrity: weights.integrity,
            availability: weights.availability,
            value,
            impact: label.to_string(),
        });
    }

    let mut bundle = registers_from_store(config, store, target)?;
    bundle.inventory = inventory;
    bundle.cid = cid_rows;

    let outputs = render(&bundle, out_dir)?;
    Ok(RunOutcome {
        hosts_seen: hosts.len(),
        assets_registered: bundle.inventory.len(),
        manual_assets: config.manual_assets.len(),
        outputs,
    })
}

/// Rebuild a full bundle from persisted records only, for re-rendering
/// reports without a new sweep.
pub fn bundle_from_store(
    config: &CompanyConfig,
    store: &RecordStore,
    target_label: &str,
) -> CidScanResult<ReportBundle> {
    let mut bundle = registers_from_store(config, store, target_label)?;
    let mut ids = ReportIdSequence::new();

    for asset in store.list_assets()? {
        // The CID sheet shows the type's table valuation; the inventory
        // column carries the stored criticality, which an administrative
        // re-valuation may have overridden.
        let weights = cid::cid_for(asset.asset_type);
        let table_value = cid::criticality(weights);
        let label = cid::impact_label(table_value)?;
        let report_id = ids.next();
        bundle.inventory.push(InventoryRow {
            report_id: report_id.clone(),
            location: asset.location.clone(),
            asset_type: asset.asset_type.to_string(),
            description: asset.description.clone(),
            owner: "Unassigned".to_string(),
            security_responsible: config.security_responsible.clone(),
            registered_at: asset.created_at.format("%d/%m/%Y").to_string(),
            status: "Active".to_string(),
            associated_risk: "N/A".to_string(),
            sensitivity: asset.sensitivity.to_string(),
            criticality: asset.criticality,
        });
        bundle.cid.push(CidRow {
            report_id,
            confidentiality: weights.confidentiality,
            integrity: weights.integrity,
            availability: weights.availability,
            value: table_value,
            impact: label.to_string(),
        });
    }
    Ok(bundle)
}

/// Risk/treatment/residual registers and KPI counts, shared by both
/// bundle builders. Inventory and CID rows are left empty.
fn registers_from_store(
    config: &CompanyConfig,
    store: &RecordStore,
    target_label: &str,
) -> CidScanResult<ReportBundle> {
    let residuals = store.list_residuals()?;
    let risks = store
        .risks_by_state(None)?
        .into_iter()
        .map(|risk| {
            let residual = residuals
                .iter()
                .find(|r| r.risk_id == risk.id)
                .map(|r| r.score);
            RiskRow {
                risk_id: risk.id,
                asset_id: risk.asset_id,
                threat: risk.threat,
                vulnerability: risk.vulnerability,
                existing_control: risk.existing_control,
                probability: risk.probability,
                impact: risk.impact,
                inherent: risk.inherent_score,
                state: risk.state.to_string(),
                observations: risk.observations,
                residual,
            }
        })
        .collect();

    let treatments = store
        .list_treatments()?
        .into_iter()
        .map(|t| TreatmentRow {
            risk_id: t.risk_id,
            strategy: t.strategy.to_string(),
            control_ref: t.control_ref,
            proposed_control: t.proposed_control,
            responsible: t.responsible,
            target_date: t.target_date,
            control_status: t.control_status.to_string(),
        })
        .collect();

    let residual_rows = residuals
        .into_iter()
        .map(|r| crate::models::ResidualRow {
            risk_id: r.risk_id,
            probability: r.probability,
            impact: r.impact,
            score: r.score,
            evaluated_at: r.evaluated_at,
        })
        .collect();

    Ok(ReportBundle {
        company: config.company.clone(),
        target: target_label.to_string(),
        generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        inventory: Vec::new(),
        cid: Vec::new(),
        risks,
        treatments,
        residuals: residual_rows,
        counts: store.state_counts()?,
    })
}

/// Render the HTML report and CSV registers into the output directory.
pub fn render(bundle: &ReportBundle, out_dir: &Path) -> CidScanResult<Vec<PathBuf>> {
    std::fs::create_dir_all(out_dir)
        .map_err(|e| crate::errors::CidScanError::io(e, Some(out_dir.to_path_buf())))?;
    let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();

    let html_path = out_dir.join(format!("risk_report_{stamp}.html"));
    HtmlReporter::new().generate_report(bundle, &html_path)?;

    let mut outputs = vec![html_path];
    outputs.extend(CsvExporter::export(bundle, out_dir, &stamp)?);
    Ok(outputs)
}

/// Value a type name declared in configuration. Unknown names fail with
/// the documented `UnknownAssetType` policy; nothing is defaulted.
fn value_declared_type(
    name: &str,
) -> CidScanResult<(AssetType, cid::CidWeights, i64, ImpactLabel)> {
    let asset_type: AssetType = name.parse()?;
    let weights = cid::cid_for(asset_type);
    let value = cid::criticality(weights);
    let label = cid::impact_label(value)?;
    Ok((asset_type, weights, value, label))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ManualAsset;

    fn manual(asset_type: &str) -> ManualAsset {
        ManualAsset {
            id: "CLOUD-01".to_string(),
            asset_type: asset_type.to_string(),
            description: None,
            location: None,
            owner: None,
            security_responsible: None,
            status: None,
            risk_note: None,
            sensitivity: None,
        }
    }

    #[test]
    fn test_report_id_sequence() {
        let mut ids = ReportIdSequence::new();
        assert_eq!(ids.next(), "A-001");
        assert_eq!(ids.next(), "A-002");
        assert_eq!(ids.next(), "A-003");
    }

    #[test]
    fn test_value_declared_type() {
        let (asset_type, _, value, label) = value_declared_type("CloudService").unwrap();
        assert_eq!(asset_type, AssetType::CloudService);
        assert_eq!(value, 12);
        assert_eq!(label, ImpactLabel::High);
    }

    #[test]
    fn test_unknown_declared_type_is_rejected() {
        let err = value_declared_type(&manual("Drone").asset_type).unwrap_err();
        assert!(matches!(
            err,
            crate::errors::CidScanError::UnknownAssetType(_)
        ));
    }

    #[test]
    fn test_bundle_from_store_builds_registers() {
        let config = CompanyConfig {
            company: "ACME".to_string(),
            default_location: "HQ".to_string(),
            security_responsible: "IT admin".to_string(),
            manual_assets: vec![],
            admin: None,
        };
        let mut store = RecordStore::open_in_memory().unwrap();
        let asset = store
            .upsert_asset(&Asset {
                id: 0,
                address: "10.0.0.5".to_string(),
                hostname: "srv".to_string(),
                location: "HQ".to_string(),
                asset_type: crate::models::AssetType::Server,
                description: "server".to_string(),
                sensitivity: Sensitivity::Restricted,
                criticality: 13,
                created_at: Utc::now(),
            })
            .unwrap();
        let risk = store
            .insert_risk(
                &crate::lifecycle::new_risk(asset.id, "t", "v", None, 4, 4, "", Utc::now())
                    .unwrap(),
            )
            .unwrap();
        store
            .upsert_residual(&crate::lifecycle::new_residual(risk.id, 2, 2, "2026-08-07").unwrap())
            .unwrap();

        let bundle = bundle_from_store(&config, &store, "stored records").unwrap();
        assert_eq!(bundle.inventory.len(), 1);
        assert_eq!(bundle.cid.len(), 1);
        assert_eq!(bundle.risks.len(), 1);
        assert_eq!(bundle.risks[0].residual, Some(4));
        assert_eq!(bundle.counts.open, 1);
    }
}
