//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use thirteenf_pipeline::RunReport;
use thirteenf_shared::{
    AggregatedDataset, AppConfig, Cik, PipelineConfig, init_config, load_config,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// thirteenf — normalize institutional 13F holdings into one dataset.
#[derive(Parser)]
#[command(
    name = "thirteenf",
    version,
    about = "Ingest 13F filings for a list of funds and emit normalized holdings.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Ingest the latest 13F filing for every fund in the list.
    Run {
        /// Path to a JSON array of fund CIKs.
        #[arg(long)]
        funds: PathBuf,

        /// Concurrent per-fund pipeline slots (overrides config).
        #[arg(short, long)]
        workers: Option<usize>,

        /// Write the aggregated dataset as JSON to this path.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "thirteenf=info",
        1 => "thirteenf=debug",
        _ => "thirteenf=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run {
            funds,
            workers,
            output,
        } => cmd_run(&funds, workers, output.as_deref()).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

async fn cmd_run(funds: &Path, workers: Option<usize>, output: Option<&Path>) -> Result<()> {
    let config = load_config()?;
    let mut pipeline_config = PipelineConfig::from(&config);
    if let Some(workers) = workers {
        pipeline_config.worker_count = workers;
    }

    let ciks = load_cik_list(funds)?;
    if ciks.is_empty() {
        info!(path = %funds.display(), "fund list is empty, nothing to ingest");
    }

    info!(
        funds = ciks.len(),
        workers = pipeline_config.worker_count,
        "starting ingestion run"
    );

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("static template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner.set_message(format!("Ingesting {} funds", ciks.len()));

    let report = thirteenf_pipeline::run_ingestion(&pipeline_config, &ciks).await?;

    spinner.finish_and_clear();
    print_summary(&report);

    if let Some(path) = output {
        write_dataset(&report.dataset, path)?;
        println!("  Output: {}", path.display());
        println!();
    }

    Ok(())
}

/// Load the JSON array of fund CIKs.
fn load_cik_list(path: &Path) -> Result<Vec<Cik>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| eyre!("cannot read fund list '{}': {e}", path.display()))?;
    let raw: Vec<String> = serde_json::from_str(&content)
        .map_err(|e| eyre!("fund list '{}' is not a JSON array of CIKs: {e}", path.display()))?;
    Ok(raw.into_iter().map(Cik::new).collect())
}

fn print_summary(report: &RunReport) {
    println!();
    println!("  Ingestion run complete");
    println!("  Rows:            {}", report.dataset.len());
    println!("  Funds ok:        {}", report.funds_succeeded);
    println!("  Funds w/o 13F:   {}", report.funds_without_filing);
    println!("  Funds failed:    {}", report.failures.len());
    println!("  Time:            {:.1}s", report.elapsed.as_secs_f64());

    if !report.failures.is_empty() {
        println!();
        println!("  Failures:");
        for failure in &report.failures {
            println!(
                "    CIK {} — {} ({})",
                failure.cik, failure.reason, failure.stage
            );
        }
    }
    println!();
}

/// Serialize the dataset as `{ "schema": [...], "rows": [...] }`.
fn write_dataset(dataset: &AggregatedDataset, path: &Path) -> Result<()> {
    let payload = serde_json::json!({
        "schema": AggregatedDataset::schema(),
        "rows": dataset.to_rows(),
    });
    let content = serde_json::to_string_pretty(&payload)?;
    std::fs::write(path, content)
        .map_err(|e| eyre!("cannot write output '{}': {e}", path.display()))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
