use crate::errors::{CidScanError, CidScanResult};
use crate::models::ReportBundle;
use std::path::Path;

/// HTML report generator for assessment results.
/// Produces a single self-contained page: KPI cards, impact
/// distribution chart, asset inventory, CID calculation sheet, and the
/// risk/treatment/residual registers.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlReporter;

impl HtmlReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn generate_report(&self, bundle: &ReportBundle, path: &Path) -> CidScanResult<()> {
        let html = self.generate_html(bundle);
        std::fs::write(path, html).map_err(|e| CidScanError::io(e, Some(path.to_path_buf())))?;
        log::info!("HTML report written to {:?}", path);
        Ok(())
    }

    fn generate_html(&self, bundle: &ReportBundle) -> String {
        // Impact distribution for the chart and the KPI cards.
        let mut low = 0;
        let mut medium = 0;
        let mut high = 0;
        let mut critical = 0;
        for row in &bundle.cid {
            match row.value {
                3..=6 => low += 1,
                7..=10 => medium += 1,
                11..=13 => high += 1,
                _ => critical += 1,
            }
        }

        let mut inventory_rows = String::new();
        for row in &bundle.inventory {
            let crit_class = match row.criticality {
                14..=15 => "crit-critical",
                11..=13 => "crit-high",
                7..=10 => "crit-medium",
                _ => "crit-low",
            };
            inventory_rows.push_str(&format!(
                r#"<tr>
                <td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td>
                <td>{}</td><td>{}</td><td>{}</td><td>{}</td>
                <td><span class="badge {}">{}</span></td>
            </tr>"#,
                escape_html(&row.report_id),
                escape_html(&row.location),
                escape_html(&row.asset_type),
                escape_html(&row.description),
                escape_html(&row.owner),
                escape_html(&row.security_responsible),
                escape_html(&row.registered_at),
                escape_html(&row.status),
                escape_html(&row.associated_risk),
                escape_html(&row.sensitivity),
                crit_class,
                row.criticality,
            ));
        }

        let mut cid_rows = String::new();
        for row in &bundle.cid {
            cid_rows.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape_html(&row.report_id),
                row.confidentiality,
                row.integrity,
                row.availability,
                row.value,
                escape_html(&row.impact),
            ));
        }

        let mut risk_rows = String::new();
        for row in &bundle.risks {
            let residual = row
                .residual
                .map(|r| r.to_string())
                .unwrap_or_else(|| "-".to_string());
            risk_rows.push_str(&format!(
                r#"<tr>
                <td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td>
                <td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td>
            </tr>"#,
                row.risk_id,
                row.asset_id,
                escape_html(&row.threat),
                escape_html(&row.vulnerability),
                escape_html(&row.existing_control),
                row.probability,
                row.impact,
                row.inherent,
                residual,
                escape_html(&row.state),
                escape_html(&row.observations),
            ));
        }

        let mut treatment_rows = String::new();
        for row in &bundle.treatments {
            treatment_rows.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                row.risk_id,
                escape_html(&row.strategy),
                escape_html(&row.control_ref),
                escape_html(&row.proposed_control),
                escape_html(&row.responsible),
                escape_html(&row.target_date),
                escape_html(&row.control_status),
            ));
        }

        let mut residual_rows = String::new();
        for row in &bundle.residuals {
            residual_rows.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                row.risk_id, row.probability, row.impact, row.score,
                escape_html(&row.evaluated_at),
            ));
        }

        format!(
            r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>CIDSCAN // RISK REPORT</title>
    <script src="https://cdn.jsdelivr.net/npm/chart.js@4.4.1/dist/chart.umd.min.js"></script>
    <style>
        * {{ margin: 0; padding: 0; box-sizing: border-box; }}
        :root {{
            --bg: #0d0d14; --card: #151520; --border: #232333;
            --text: #e0e0e0; --dim: #707080; --accent: #05d9e8;
            --critical: #ff2a6d; --high: #ff9100; --medium: #fcee0a; --low: #05d9e8;
        }}
        body {{ background: var(--bg); color: var(--text); font-family: 'JetBrains Mono', monospace; font-size: 14px; padding: 2rem; }}
        h1 {{ color: var(--accent); letter-spacing: 0.1em; margin-bottom: 0.3rem; }}
        h2 {{ color: var(--accent); margin: 2rem 0 0.8rem; font-size: 1.1rem; letter-spacing: 0.08em; text-transform: uppercase; }}
        .meta {{ color: var(--dim); margin-bottom: 1.5rem; }}
        .meta span {{ color: var(--text); }}
        .stats {{ display: grid; grid-template-columns: repeat(auto-fit, minmax(170px, 1fr)); gap: 1rem; margin-bottom: 1.5rem; }}
        .stat {{ background: var(--card); border: 1px solid var(--border); border-radius: 6px; padding: 1.2rem; text-align: center; }}
        .stat .value {{ font-size: 2.2rem; font-weight: 700; display: block; }}
        .stat .label {{ color: var(--dim); font-size: 0.75rem; letter-spacing: 0.15em; text-transform: uppercase; }}
        .value.accent {{ color: var(--accent); }} .value.critical {{ color: var(--critical); }}
        .value.high {{ color: var(--high); }} .value.medium {{ color: var(--medium); }} .value.low {{ color: var(--low); }}
        .chart-box {{ background: var(--card); border: 1px solid var(--border); border-radius: 6px; padding: 1.2rem; max-width: 420px; margin-bottom: 1rem; }}
        table {{ width: 100%; border-collapse: collapse; background: var(--card); border: 1px solid var(--border); margin-bottom: 1rem; }}
        th {{ color: var(--accent); text-align: left; padding: 0.7rem; border-bottom: 2px solid var(--border); font-size: 0.8rem; text-transform: uppercase; }}
        td {{ padding: 0.6rem 0.7rem; border-bottom: 1px solid var(--border); color: var(--dim); font-size: 0.85rem; }}
        tr:hover td {{ color: var(--text); }}
        .badge {{ padding: 0.15rem 0.5rem; border-radius: 3px; border: 1px solid currentColor; font-weight: bold; }}
        .crit-critical {{ color: var(--critical); }} .crit-high {{ color: var(--high); }}
        .crit-medium {{ color: var(--medium); }} .crit-low {{ color: var(--low); }}
        .footer {{ color: var(--dim); text-align: center; margin-top: 2rem; font-size: 0.8rem; }}
        .footer b {{ color: var(--accent); }}
    </style>
</head>
<body>
    <h1>CIDSCAN RISK REPORT</h1>
    <div class="meta">Company: <span>{company}</span> | Target: <span>{target}</span> | Generated: <span>{generated}</span></div>

    <div class="stats">
        <div class="stat"><span class="value accent">{total_assets}</span><span class="label">Assets</span></div>
        <div class="stat"><span class="value critical">{critical}</span><span class="label">Critical impact</span></div>
        <div class="stat"><span class="value high">{high}</span><span class="label">High impact</span></div>
        <div class="stat"><span class="value critical">{open_risks}</span><span class="label">Open risks</span></div>
        <div class="stat"><span class="value high">{in_treatment}</span><span class="label">In treatment</span></div>
        <div class="stat"><span class="value low">{verified}</span><span class="label">Verified</span></div>
    </div>

    <div class="chart-box">
        <canvas id="impactChart"></canvas>
    </div>

    <h2>Asset inventory</h2>
    <table>
        <thead><tr>
            <th>ID</th><th>Location</th><th>Type</th><th>Description</th><th>Owner</th>
            <th>Security responsible</th><th>Registered</th><th>Status</th>
            <th>Associated risk</th><th>Sensitivity</th><th>Criticality</th>
        </tr></thead>
        <tbody>{inventory_rows}</tbody>
    </table>

    <h2>CID valuation</h2>
    <table>
        <thead><tr><th>ID</th><th>C</th><th>I</th><th>A</th><th>Value</th><th>Impact</th></tr></thead>
        <tbody>{cid_rows}</tbody>
    </table>

    <h2>Risk register</h2>
    <table>
        <thead><tr>
            <th>Risk</th><th>Asset</th><th>Threat</th><th>Vulnerability</th><th>Existing control</th>
            <th>Prob.</th><th>Impact</th><th>Inherent</th><th>Residual</th><th>State</th><th>Observations</th>
        </tr></thead>
        <tbody>{risk_rows}</tbody>
    </table>

    <h2>Treatments</h2>
    <table>
        <thead><tr>
            <th>Risk</th><th>Strategy</th><th>Control ref.</th><th>Proposed control</th>
            <th>Responsible</th><th>Target date</th><th>Status</th>
        </tr></thead>
        <tbody>{treatment_rows}</tbody>
    </table>

    <h2>Residual assessments</h2>
    <table>
        <thead><tr><th>Risk</th><th>Prob.</th><th>Impact</th><th>Score</th><th>Evaluated</th></tr></thead>
        <tbody>{residual_rows}</tbody>
    </table>

    <div class="footer">GENERATED BY <b>CIDSCAN // RISK ENGINE</b></div>

    <script>
        const impactData = [{low}, {medium}, {high}, {critical}];
        new Chart(document.getElementById('impactChart').getContext('2d'), {{
            type: 'doughnut',
            data: {{
                labels: ['Low', 'Medium', 'High', 'Critical'],
                datasets: [{{
                    data: impactData,
                    backgroundColor: ['#05d9e8', '#fcee0a', '#ff9100', '#ff2a6d'],
                    borderWidth: 0,
                    hoverOffset: 8
                }}]
            }},
            options: {{
                cutout: '65%',
                plugins: {{ legend: {{ position: 'right', labels: {{ color: '#707080' }} }} }}
            }}
        }});
    </script>
</body>
</html>"##,
            company = escape_html(&bundle.company),
            target = escape_html(&bundle.target),
            generated = escape_html(&bundle.generated_at),
            total_assets = bundle.inventory.len(),
            critical = critical,
            high = high,
            open_risks = bundle.counts.open,
            in_treatment = bundle.counts.in_treatment,
            verified = bundle.counts.verified,
            inventory_rows = inventory_rows,
            cid_rows = cid_rows,
            risk_rows = risk_rows,
            treatment_rows = treatment_rows,
            residual_rows = residual_rows,
            low = low,
            medium = medium,
        )
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
