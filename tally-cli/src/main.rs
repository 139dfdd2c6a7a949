use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use tally_core::{
    AnalyzerConfig, AnomalyEngine, CleanTransaction, DatasetProfiler, NormalizationPipeline,
    PipelineConfig, assess_risk, summarize,
};
use tally_ingest::{AuditLogger, read_raw_csv, write_clean_csv};

mod report;

#[derive(Parser, Debug)]
#[command(name = "tally", version, about = "Normalize messy transaction exports and flag anomalies")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Normalize a messy CSV, analyze it, and write the cleaned output
    Process {
        /// Messy input CSV
        input: PathBuf,

        /// Cleaned CSV destination
        #[arg(long, default_value = "data/processed/transactions_clean.csv")]
        output: PathBuf,

        /// JSONL audit trail destination
        #[arg(long, default_value = "logs/audit.jsonl")]
        audit: PathBuf,

        /// Optional pipeline/analyzer config overrides (JSON file)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Analyze a messy CSV and print the report without writing output
    Report {
        /// Messy input CSV
        input: PathBuf,

        /// Optional pipeline/analyzer config overrides (JSON file)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

/// On-disk override file: both stages, all fields optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CliConfig {
    pipeline: PipelineConfig,
    analyzer: AnalyzerConfig,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Process {
            input,
            output,
            audit,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let audit = AuditLogger::new(audit)?;
            let transactions = run_pipeline(&input, &config, Some(&audit))?;
            write_clean_csv(&output, &transactions)?;
            audit.log_event(
                "clean_data_saved",
                json!({"output": output.display().to_string(), "rows": transactions.len()}),
            )?;
            print_report(&transactions);
            println!("Clean data saved to {}", output.display());
            println!("Audit log saved to {}", audit.path().display());
        }

        Command::Report { input, config } => {
            let config = load_config(config.as_deref())?;
            let transactions = run_pipeline(&input, &config, None)?;
            print_report(&transactions);
        }
    }

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<CliConfig> {
    match path {
        None => Ok(CliConfig::default()),
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
        }
    }
}

fn run_pipeline(
    input: &std::path::Path,
    config: &CliConfig,
    audit: Option<&AuditLogger>,
) -> Result<Vec<CleanTransaction>> {
    let records = read_raw_csv(input)?;
    if let Some(audit) = audit {
        audit.log_event(
            "parse_started",
            json!({"input": input.display().to_string(), "rows": records.len()}),
        )?;
    }

    let pipeline = NormalizationPipeline::new(&config.pipeline);
    let outcome = pipeline.normalize_batch(&records);

    if let Some(audit) = audit {
        for failure in &outcome.failures {
            audit.log_event(
                "parse_error",
                json!({
                    "row": failure.row,
                    "field": failure.field,
                    "value": failure.value,
                    "kind": failure.kind,
                }),
            )?;
        }
    }

    if outcome.transactions.is_empty() {
        bail!("no transactions were successfully parsed from {}", input.display());
    }

    let mut transactions = outcome.transactions;
    let profile = DatasetProfiler::new(&config.analyzer).profile(&transactions);
    AnomalyEngine::new(config.analyzer.clone()).annotate(&mut transactions, &profile);

    if let Some(audit) = audit {
        audit.log_event(
            "parse_completed",
            json!({
                "total": outcome.failures.len() + transactions.len(),
                "successful": transactions.len(),
                "failed": outcome.failures.len(),
            }),
        )?;
    }

    println!(
        "Parsed {} transactions from {} ({} failed)",
        transactions.len(),
        input.display(),
        outcome.failures.len()
    );

    Ok(transactions)
}

fn print_report(transactions: &[CleanTransaction]) {
    let Some(summary) = summarize(transactions) else {
        return;
    };
    let risk = assess_risk(transactions);
    println!("{}", report::render(&summary, &risk, transactions));
}
