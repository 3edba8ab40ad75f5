use clap::Parser;
use console::style;
use env_logger::Env;

use cidscan::cid;
use cidscan::cli::{Args, Command};
use cidscan::config::CompanyConfig;
use cidscan::errors::{CidScanError, CidScanResult};
use cidscan::lifecycle;
use cidscan::models::{ControlStatus, RiskState, Strategy, Treatment};
use cidscan::pipeline;
use cidscan::scanner::{NetworkScanner, ScanOptions};
use cidscan::store::RecordStore;
use cidscan::ui;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let log_level = if args.quiet {
        "error"
    } else if args.verbose {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_timestamp_millis()
        .init();

    if let Err(e) = run(args).await {
        log::error!("{e}");
        eprintln!("{} {e}", style("error:").red().bold());
        std::process::exit(1);
    }
}

async fn run(args: Args) -> CidScanResult<()> {
    let config = CompanyConfig::load(&args.config)?;
    let mut store = RecordStore::open(&args.database)?;

    match args.command {
        Command::Scan {
            target,
            ports,
            concurrency,
            timeout_ms,
        } => {
            let mut options = ScanOptions::default();
            if !ports.is_empty() {
                options.ports = ports;
            }
            if concurrency > 0 {
                options.concurrency = concurrency;
            }
            options.connect_timeout = std::time::Duration::from_millis(timeout_ms);

            let scanner = NetworkScanner::new(options);
            let outcome = pipeline::run_assessment(
                &config,
                &mut store,
                &scanner,
                &target,
                &args.output_dir,
                args.quiet,
            )
            .await?;

            println!();
            println!(
                "    {} {}",
                style("▶").green(),
                style("Assessment run complete").white().bold()
            );
            println!("    ├─ Hosts discovered: {}", style(outcome.hosts_seen).bold());
            println!(
                "    ├─ Assets in inventory: {} ({} manual)",
                style(outcome.assets_registered).bold(),
                outcome.manual_assets
            );
            println!("    └─ Files generated:");
            for path in &outcome.outputs {
                println!("       {}", path.display());
            }
        }

        Command::Assets => {
            let assets = store.list_assets()?;
            println!("{} assets registered", assets.len());
            for asset in assets {
                let label = cid::impact_label(asset.criticality)?;
                println!(
                    "#{:<4} {:<18} {:<14} crit {:>2} ({})  {}",
                    asset.id,
                    asset.address,
                    asset.asset_type.to_string(),
                    asset.criticality,
                    label,
                    asset.description
                );
            }
        }

        Command::RiskAdd {
            asset_id,
            threat,
            vulnerability,
            existing_control,
            probability,
            impact,
            observations,
        } => {
            let risk = lifecycle::new_risk(
                asset_id,
                threat,
                vulnerability,
                existing_control,
                probability,
                impact,
                observations,
                chrono::Utc::now(),
            )?;
            let stored = store.insert_risk(&risk)?;
            println!(
                "Registered risk #{} against asset #{} (inherent score {}, state {})",
                stored.id, stored.asset_id, stored.inherent_score, stored.state
            );
        }

        Command::Risks { state } => {
            let filter = state.map(|s| s.parse::<RiskState>()).transpose()?;
            let risks = store.risks_by_state(filter)?;
            println!("{} risks", risks.len());
            for risk in risks {
                let residual = store
                    .residual_for(risk.id)?
                    .map(|r| r.score.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "#{:<4} asset #{:<4} inherent {:>2} residual {:>2} [{}] {}",
                    risk.id, risk.asset_id, risk.inherent_score, residual, risk.state, risk.threat
                );
            }
        }

        Command::TreatmentAdd {
            risk_id,
            strategy,
            control_ref,
            proposed_control,
            responsible,
            target_date,
            status,
        } => {
            let treatment = Treatment {
                id: 0,
                risk_id,
                strategy: strategy.parse::<Strategy>()?,
                control_ref,
                proposed_control,
                responsible,
                target_date,
                control_status: status.parse::<ControlStatus>()?,
                created_at: chrono::Utc::now(),
            };
            let (stored, advanced) = store.insert_treatment(&treatment)?;
            println!(
                "Recorded treatment #{} ({}) for risk #{}",
                stored.id, stored.strategy, stored.risk_id
            );
            if advanced {
                println!("Risk #{} advanced to InTreatment", stored.risk_id);
            }
        }

        Command::ResidualSet {
            risk_id,
            probability,
            impact,
            date,
            verify_below,
        } => {
            let evaluated_at = date
                .unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string());
            let residual = lifecycle::new_residual(risk_id, probability, impact, evaluated_at)?;
            store.upsert_residual(&residual)?;
            println!(
                "Residual for risk #{} set to {} (evaluated {})",
                risk_id, residual.score, residual.evaluated_at
            );

            // Opt-in named policy; a residual on its own never moves state.
            if let Some(threshold) = verify_below {
                let mut risk = store.get_risk(risk_id)?;
                if lifecycle::verify_if_residual_low(&mut risk, residual.score, threshold) {
                    store.update_risk_state(risk_id, risk.state)?;
                    println!(
                        "Risk #{risk_id} marked Verified (residual {} <= threshold {threshold})",
                        residual.score
                    );
                }
            }
        }

        Command::RiskState {
            risk_id,
            state,
            user,
            password,
        } => {
            require_admin(&config, &user, &password)?;
            let state = state.parse::<RiskState>()?;
            store.update_risk_state(risk_id, state)?;
            println!("Risk #{risk_id} state set to {state}");
        }

        Command::Revalue {
            asset_id,
            confidentiality,
            integrity,
            availability,
            user,
            password,
        } => {
            require_admin(&config, &user, &password)?;
            let value = cid::revalue(confidentiality, integrity, availability)?;
            let label = cid::impact_label(value)?;
            store.set_asset_valuation(asset_id, value)?;
            println!("Asset #{asset_id} re-valued: criticality {value} ({label})");
        }

        Command::Dashboard => {
            let assets = store.list_assets()?;
            let critical = assets.iter().filter(|a| a.criticality >= 14).count();
            let high = assets
                .iter()
                .filter(|a| (11..=13).contains(&a.criticality))
                .count();
            let counts = store.state_counts()?;
            let top = store.top_risks(5)?;
            ui::print_dashboard(assets.len() as i64, critical, high, &counts, &top);
        }

        Command::Report { target_label } => {
            let bundle = pipeline::bundle_from_store(&config, &store, &target_label)?;
            let outputs = pipeline::render(&bundle, &args.output_dir)?;
            println!("Reports generated:");
            for path in outputs {
                println!("   {}", path.display());
            }
        }
    }

    Ok(())
}

fn require_admin(config: &CompanyConfig, user: &str, password: &str) -> CidScanResult<()> {
    if config.verify_admin(user, password) {
        Ok(())
    } else {
        Err(CidScanError::invalid(
            "admin credentials rejected (or no admin configured)",
        ))
    }
}
