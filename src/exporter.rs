//! CSV export of the assessment bundle.
//!
//! One file per register: inventory, CID valuation, risks, treatments,
//! residuals. Output is spreadsheet-agnostic flat text; a cell that
//! could be misread as a formula is neutralized on write.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{CidScanError, CidScanResult};
use crate::models::ReportBundle;

pub struct CsvExporter;

impl CsvExporter {
    /// Write all register files into `dir`, stamped with `stamp`.
    /// Returns the paths written.
    pub fn export(bundle: &ReportBundle, dir: &Path, stamp: &str) -> CidScanResult<Vec<PathBuf>> {
        fs::create_dir_all(dir).map_err(|e| CidScanError::io(e, Some(dir.to_path_buf())))?;

        let files = [
            (format!("inventory_{stamp}.csv"), Self::inventory_csv(bundle)),
            (format!("cid_valuation_{stamp}.csv"), Self::cid_csv(bundle)),
            (format!("risks_{stamp}.csv"), Self::risks_csv(bundle)),
            (format!("treatments_{stamp}.csv"), Self::treatments_csv(bundle)),
            (format!("residuals_{stamp}.csv"), Self::residuals_csv(bundle)),
        ];

        let mut written = Vec::new();
        for (name, content) in files {
            let path = dir.join(name);
            fs::write(&path, content).map_err(|e| CidScanError::io(e, Some(path.clone())))?;
            written.push(path);
        }
        log::info!("CSV registers written to {:?}", dir);
        Ok(written)
    }

    fn inventory_csv(bundle: &ReportBundle) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "id,location,type,description,owner,security_responsible,registered_at,status,associated_risk,sensitivity,criticality"
        );
        for row in &bundle.inventory {
            let _ = writeln!(
                out,
                "{},{},{},{},{},{},{},{},{},{},{}",
                csv_escape(&row.report_id),
                csv_escape(&row.location),
                csv_escape(&row.asset_type),
                csv_escape(&row.description),
                csv_escape(&row.owner),
                csv_escape(&row.security_responsible),
                csv_escape(&row.registered_at),
                csv_escape(&row.status),
                csv_escape(&row.associated_risk),
                csv_escape(&row.sensitivity),
                row.criticality,
            );
        }
        out
    }

    fn cid_csv(bundle: &ReportBundle) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "id,confidentiality,integrity,availability,value,impact");
        for row in &bundle.cid {
            let _ = writeln!(
                out,
                "{},{},{},{},{},{}",
                csv_escape(&row.report_id),
                row.confidentiality,
                row.integrity,
                row.availability,
                row.value,
                csv_escape(&row.impact),
            );
        }
        out
    }

    fn risks_csv(bundle: &ReportBundle) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "risk_id,asset_id,threat,vulnerability,existing_control,probability,impact,inherent,residual,state,observations"
        );
        for row in &bundle.risks {
            let residual = row
                .residual
                .map(|r| r.to_string())
                .unwrap_or_default();
            let _ = writeln!(
                out,
                "{},{},{},{},{},{},{},{},{},{},{}",
                row.risk_id,
                row.asset_id,
                csv_escape(&row.threat),
                csv_escape(&row.vulnerability),
                csv_escape(&row.existing_control),
                row.probability,
                row.impact,
                row.inherent,
                residual,
                csv_escape(&row.state),
                csv_escape(&row.observations),
            );
        }
        out
    }

    fn treatments_csv(bundle: &ReportBundle) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "risk_id,strategy,control_ref,proposed_control,responsible,target_date,control_status"
        );
        for row in &bundle.treatments {
            let _ = writeln!(
                out,
                "{},{},{},{},{},{},{}",
                row.risk_id,
                csv_escape(&row.strategy),
                csv_escape(&row.control_ref),
                csv_escape(&row.proposed_control),
                csv_escape(&row.responsible),
                csv_escape(&row.target_date),
                csv_escape(&row.control_status),
            );
        }
        out
    }

    fn residuals_csv(bundle: &ReportBundle) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "risk_id,probability,impact,score,evaluated_at");
        for row in &bundle.residuals {
            let _ = writeln!(
                out,
                "{},{},{},{},{}",
                row.risk_id,
                row.probability,
                row.impact,
                row.score,
                csv_escape(&row.evaluated_at),
            );
        }
        out
    }
}

fn csv_escape(s: &str) -> String {
    let needs_quoting = s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r');
    let has_formula_prefix = matches!(s.as_bytes().first(), Some(b'=' | b'+' | b'-' | b'@' | b'\t'));

    if has_formula_prefix {
        // Neutralize formula interpretation in spreadsheets
        format!("\"'{}\"", s.replace('"', "\"\""))
    } else if needs_quoting {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InventoryRow, RiskRow, StateCounts};

    fn sample_bundle() -> ReportBundle {
        ReportBundle {
            company: "ACME".to_string(),
            target: "10.0.0.0/24".to_string(),
            generated_at: "2026-08-07 12:00:00".to_string(),
            inventory: vec![InventoryRow {
                report_id: "A-001".to_string(),
                location: "HQ, floor 2".to_string(),
                asset_type: "Server".to_string(),
                description: "File server".to_string(),
                owner: "Unassigned".to_string(),
                security_responsible: "IT admin".to_string(),
                registered_at: "07/08/2026".to_string(),
                status: "Active".to_string(),
                associated_risk: "Remote administration exposed".to_string(),
                sensitivity: "Restricted".to_string(),
                criticality: 13,
            }],
            cid: vec![],
            risks: vec![RiskRow {
                risk_id: 1,
                asset_id: 1,
                threat: "Credential theft".to_string(),
                vulnerability: "Weak passwords".to_string(),
                existing_control: "N/A".to_string(),
                probability: 4,
                impact: 4,
                inherent: 16,
                residual: Some(6),
                state: "InTreatment".to_string(),
                observations: String::new(),
            }],
            treatments: vec![],
            residuals: vec![],
            counts: StateCounts::default(),
        }
    }

    #[test]
    fn test_inventory_csv_quotes_commas() {
        let csv = CsvExporter::inventory_csv(&sample_bundle());
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("\"HQ, floor 2\""));
    }

    #[test]
    fn test_risks_csv_includes_residual() {
        let csv = CsvExporter::risks_csv(&sample_bundle());
        let lines: Vec<&str> = csv.lines().collect();
        assert!(lines[1].contains(",16,6,"));
    }

    #[test]
    fn test_csv_escape_formula_prefix() {
        assert_eq!(csv_escape("=SUM(A1)"), "\"'=SUM(A1)\"");
    }

    #[test]
    fn test_export_writes_all_registers() {
        let dir = tempfile::tempdir().unwrap();
        let files = CsvExporter::export(&sample_bundle(), dir.path(), "20260807_120000").unwrap();
        assert_eq!(files.len(), 5);
        for file in files {
            assert!(file.exists());
        }
    }
}
