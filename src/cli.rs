use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "cidscan",
    about = "cidscan - Network asset discovery, CID criticality valuation, and risk lifecycle management",
    version
)]
pub struct Args {
    /// Path to the company configuration JSON
    #[arg(short, long, default_value = "config/company.json")]
    pub config: PathBuf,

    /// SQLite database holding assets, risks, treatments, and residuals
    #[arg(short, long, default_value = "cidscan.db")]
    pub database: PathBuf,

    /// Directory for generated reports and CSV registers
    #[arg(short, long, default_value = "output")]
    pub output_dir: PathBuf,

    /// Enable verbose logging of all operations
    #[arg(short, long)]
    pub verbose: bool,

    /// Hide progress bars and use quiet output
    #[arg(short, long)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Discover hosts, classify and value them, then render reports
    Scan {
        /// Target specification: CIDR or comma-separated host list
        target: String,

        /// Ports to probe (defaults to the common service ports)
        #[arg(long, value_delimiter = ',')]
        ports: Vec<u16>,

        /// Concurrent connect attempts (0 = auto-detect)
        #[arg(long, default_value = "0")]
        concurrency: usize,

        /// Per-connection timeout in milliseconds
        #[arg(long, default_value = "800")]
        timeout_ms: u64,
    },

    /// List registered assets
    Assets,

    /// Register a risk against an existing asset
    RiskAdd {
        /// Owning asset id
        asset_id: i64,

        /// Threat description
        #[arg(long)]
        threat: String,

        /// Vulnerability description
        #[arg(long)]
        vulnerability: String,

        /// Existing control, if any
        #[arg(long)]
        existing_control: Option<String>,

        /// Likelihood, 1-5
        #[arg(short, long)]
        probability: i64,

        /// Impact, 1-5
        #[arg(short, long)]
        impact: i64,

        /// Free-text observations
        #[arg(long, default_value = "")]
        observations: String,
    },

    /// List risks, optionally filtered by state
    Risks {
        /// Open, InTreatment, Verified, or Closed
        #[arg(long)]
        state: Option<String>,
    },

    /// Record a treatment for a risk (advances an Open risk to InTreatment)
    TreatmentAdd {
        /// Owning risk id
        risk_id: i64,

        /// Mitigate, Transfer, Accept, or Avoid
        #[arg(short, long)]
        strategy: String,

        /// External-standard control reference (e.g. ISO/IEC 27002 clause)
        #[arg(long, default_value = "")]
        control_ref: String,

        /// Proposed control
        #[arg(long)]
        proposed_control: String,

        /// Responsible party
        #[arg(long)]
        responsible: String,

        /// Target date (free text, e.g. 2026-12-01)
        #[arg(long, default_value = "")]
        target_date: String,

        /// Pending, InProgress, or Done
        #[arg(long, default_value = "Pending")]
        status: String,
    },

    /// Record or update the residual assessment for a risk
    ResidualSet {
        /// Owning risk id
        risk_id: i64,

        /// Residual likelihood, 1-5
        #[arg(short, long)]
        probability: i64,

        /// Residual impact, 1-5
        #[arg(short, long)]
        impact: i64,

        /// Evaluation date (defaults to today)
        #[arg(long)]
        date: Option<String>,

        /// Opt-in policy: mark the risk Verified when the residual score
        /// is at or below this threshold
        #[arg(long)]
        verify_below: Option<i64>,
    },

    /// Override a risk state directly (requires admin credentials)
    RiskState {
        /// Risk id
        risk_id: i64,

        /// Open, InTreatment, Verified, or Closed
        state: String,

        /// Admin user
        #[arg(long)]
        user: String,

        /// Admin password
        #[arg(long)]
        password: String,
    },

    /// Re-value one asset with explicit C/I/A weights (requires admin credentials)
    Revalue {
        /// Asset id
        asset_id: i64,

        /// Confidentiality weight, 1-5
        #[arg(short, long)]
        confidentiality: i64,

        /// Integrity weight, 1-5
        #[arg(short, long)]
        integrity: i64,

        /// Availability weight, 1-5
        #[arg(short, long)]
        availability: i64,

        /// Admin user
        #[arg(long)]
        user: String,

        /// Admin password
        #[arg(long)]
        password: String,
    },

    /// Show risk KPIs and the top risks by inherent score
    Dashboard,

    /// Re-render the HTML report and CSV registers from stored records
    Report {
        /// Label shown as the report target
        #[arg(long, default_value = "stored records")]
        target_label: String,
    },
}
