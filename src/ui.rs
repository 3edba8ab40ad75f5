use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::models::{StateCounts, TopRisk};

/// Progress bar for the discovery sweep. Hidden in quiet mode.
pub fn sweep_progress(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(0);
    let bar_style = ProgressStyle::with_template(
        "{prefix} {spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} hosts ({percent}%)",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("█▉▊▋▌▍▎▏  ");
    bar.set_style(bar_style);
    bar.set_prefix(style("🔍 SWEEP").green().bold().to_string());
    bar
}

/// Render the risk dashboard to the terminal.
pub fn print_dashboard(
    assets: i64,
    critical_assets: usize,
    high_assets: usize,
    counts: &StateCounts,
    top: &[TopRisk],
) {
    println!();
    println!("{}", style("RISK DASHBOARD").cyan().bold());
    println!("{}", style("═════════════════════════════════════════").cyan());
    println!(
        "   📦 Assets registered: {} ({} critical, {} high)",
        style(assets).white().bold(),
        style(critical_assets).red().bold(),
        style(high_assets).yellow().bold()
    );
    println!("   🟥 Open risks:        {}", style(counts.open).red().bold());
    println!(
        "   🟧 In treatment:      {}",
        style(counts.in_treatment).yellow().bold()
    );
    println!(
        "   🟩 Verified:          {}",
        style(counts.verified).green().bold()
    );
    println!("   ⬜ Closed:            {}", style(counts.closed).dim());

    if !top.is_empty() {
        println!();
        println!("{}", style("TOP RISKS (inherent vs. residual)").cyan().bold());
        println!("{}", style("═════════════════════════════════════════").cyan());
        for (i, risk) in top.iter().enumerate() {
            let residual = risk
                .residual
                .map(|r| r.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "{}. risk #{} (asset #{})  inherent {}  residual {}  [{}]",
                i + 1,
                risk.risk_id,
                risk.asset_id,
                style(risk.inherent).red().bold(),
                style(residual).yellow(),
                risk.state
            );
        }
    }
    println!();
}
