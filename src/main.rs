//! bridge-report CLI: load the BRIDGE decisions log, apply the decision
//! filter, and print the report as JSON for a renderer to consume.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use bridge_report::config::{load_config, load_config_from};
use bridge_report::{DatePolicy, DecisionSelection, ReportConfig, ReportSession, SourceConfig};

/// Compute the BRIDGE ministry contact/conversion report.
#[derive(Parser, Debug)]
#[command(name = "bridge-report", version, about, long_about = None)]
struct Cli {
    /// Config file (defaults to ./bridge-report.toml when present).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Decisions log (CSV or workbook).
    #[arg(long)]
    decisions: Option<PathBuf>,

    /// Sheet inside the decisions workbook.
    #[arg(long)]
    decisions_sheet: Option<String>,

    /// Participants list (CSV or workbook).
    #[arg(long)]
    participants: Option<PathBuf>,

    /// Sheet inside the participants workbook.
    #[arg(long)]
    participants_sheet: Option<String>,

    /// Decision type to keep; repeat for several. None keeps everything.
    #[arg(short = 'd', long = "decision")]
    decisions_filter: Vec<String>,

    /// Rows in the top-neighborhood tables.
    #[arg(long)]
    top_n: Option<usize>,

    /// Drop rows whose date cannot be parsed instead of keeping them.
    #[arg(long)]
    drop_undated: bool,

    /// Print the available decision types and exit.
    #[arg(long)]
    list_decisions: bool,

    /// Write the JSON report here instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text")]
    log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Debug, clap::ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = match cli.verbose {
        0 => "bridge_report=info",
        1 => "bridge_report=debug",
        _ => "bridge_report=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // logs go to stderr so stdout stays valid JSON
    match cli.log_format {
        LogFormat::Text => fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init(),
    }
}

/// Layer CLI flags over the file config. A path flag replaces only the path,
/// so a configured or default sheet and separator still apply.
fn apply_overrides(config: &mut ReportConfig, cli: &Cli) {
    if let Some(path) = &cli.decisions {
        config.sources.decisions.path = path.clone();
    }
    if let Some(sheet) = &cli.decisions_sheet {
        config.sources.decisions.sheet = Some(sheet.clone());
    }
    if let Some(path) = &cli.participants {
        match config.sources.participants.as_mut() {
            Some(participants) => participants.path = path.clone(),
            None => config.sources.participants = Some(SourceConfig::new(path)),
        }
    }
    if let (Some(sheet), Some(participants)) =
        (&cli.participants_sheet, config.sources.participants.as_mut())
    {
        participants.sheet = Some(sheet.clone());
    }
    if let Some(n) = cli.top_n {
        config.report.table_top_n = n;
    }
    if cli.drop_undated {
        config.report.date_policy = DatePolicy::Drop;
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let mut config = match &cli.config {
        Some(path) => load_config_from(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => load_config()?,
    };

    apply_overrides(&mut config, &cli);

    let decisions_path = config.sources.decisions.path.clone();
    let mut session = ReportSession::new(config);

    if cli.list_decisions {
        for option in session
            .decision_options()
            .with_context(|| format!("loading {}", decisions_path.display()))?
        {
            println!("{option}");
        }
        return Ok(());
    }

    let selection = DecisionSelection::new(cli.decisions_filter);
    let report = session
        .report(&selection)
        .with_context(|| format!("building report from {}", decisions_path.display()))?;
    let json = serde_json::to_string_pretty(&report)?;

    match &cli.output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "report written");
        }
        None => println!("{json}"),
    }

    Ok(())
}
