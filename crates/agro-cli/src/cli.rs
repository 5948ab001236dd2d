use clap::{Parser, Subcommand, ValueEnum, ValueHint};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "agroplan", author, version, about = "Agricultural land-use optimization", long_about = None)]
pub struct Cli {
    /// Set the logging level (overrides `[logging] level` in the config file)
    #[arg(long, global = true)]
    pub log_level: Option<tracing::Level>,

    /// Configuration file; `agroplan.toml` in the working directory is used when present
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Solve the farm goal-programming model
    Goal {
        /// Parameter file (YAML, JSON or TOML); the Ireland case when omitted
        #[arg(long, value_hint = ValueHint::FilePath)]
        params: Option<PathBuf>,
        /// Weight file replacing the weights in the parameter file
        #[arg(long, value_hint = ValueHint::FilePath)]
        weights: Option<PathBuf>,
        /// Balance row encoding (opposed-inequalities, native)
        #[arg(long)]
        encoding: Option<String>,
        /// LP backend (microlp, clarabel, highs)
        #[arg(long)]
        solver: Option<String>,
        /// Write the name/value record to this file
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        out: Option<PathBuf>,
        /// Record format; inferred from the `--out` extension when omitted
        #[arg(long, value_enum)]
        format: Option<ResultFormat>,
        /// Print the plain-text plan and deviation report
        #[arg(long)]
        report: bool,
    },
    /// Best-management-practice allocation models
    Bmp {
        #[command(subcommand)]
        command: BmpCommands,
    },
    /// List the solver backends compiled into this binary
    Solvers,
}

#[derive(Subcommand, Debug)]
pub enum BmpCommands {
    /// Solve the linear allocation over a (capP, capN) grid
    Sweep {
        /// Crop coefficient table (CSV)
        #[arg(long, value_hint = ValueHint::FilePath)]
        crops: PathBuf,
        /// Baseline area table (CSV)
        #[arg(long, value_hint = ValueHint::FilePath)]
        baseline: PathBuf,
        /// Sweep specification (YAML or JSON); the default 26 × 26 grid when omitted
        #[arg(long, value_hint = ValueHint::FilePath)]
        spec: Option<PathBuf>,
        /// Output directory (defaults to `[output] dir`)
        #[arg(short, long, value_hint = ValueHint::DirPath)]
        out: Option<PathBuf>,
        /// LP backend (microlp, clarabel, highs)
        #[arg(long)]
        solver: Option<String>,
        /// Worker threads (0 = every core)
        #[arg(long, default_value_t = 0)]
        threads: usize,
        /// Also write the subdivision × crop allocation of each scenario
        #[arg(long)]
        keep_allocation: bool,
        /// Allow drawing water beyond the baseline use
        #[arg(long)]
        water_available: bool,
    },
    /// Solve the price-responsive allocation for one scenario
    Price {
        /// Crop coefficient table (CSV)
        #[arg(long, value_hint = ValueHint::FilePath)]
        crops: PathBuf,
        /// Baseline area table (CSV)
        #[arg(long, value_hint = ValueHint::FilePath)]
        baseline: PathBuf,
        /// Required phosphorus export reduction, fraction of baseline
        #[arg(long, default_value_t = 0.1)]
        dp: f64,
        /// Required nitrogen export reduction, fraction of baseline
        #[arg(long, default_value_t = 0.0)]
        dn: f64,
        /// Objective derivatives (numerical, analytic)
        #[arg(long)]
        gradient: Option<String>,
        /// L-BFGS iteration budget
        #[arg(long)]
        max_iter: Option<usize>,
        /// Output directory (defaults to `[output] dir`)
        #[arg(short, long, value_hint = ValueHint::DirPath)]
        out: Option<PathBuf>,
        /// Also write the subdivision × crop allocation
        #[arg(long)]
        keep_allocation: bool,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultFormat {
    Json,
    Csv,
}

impl ResultFormat {
    /// `.csv` files get CSV, anything else JSON.
    pub fn from_path(path: &std::path::Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => ResultFormat::Csv,
            _ => ResultFormat::Json,
        }
    }
}
