// 🖥️ credit-audit CLI - Thin wrapper over the audit engine
//
// Reads normalized report JSON produced by the parsing layer, runs the audit,
// prints AuditResults as JSON on stdout. Logs go to stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use credit_audit::citation::{CitationSource, SqliteCitationStore, StaticCitationTable};
use credit_audit::rules::catalog;
use credit_audit::{
    AuditConfig, AuditEngine, AuditInput, NormalizedReport, RuleSet, Severity, SnapshotHistory,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// FCRA / Metro-2 compliance audit over normalized credit reports.
#[derive(Parser, Debug)]
#[command(name = "credit-audit", version, about)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Audit one normalized report per bureau.
    Audit {
        /// Normalized report JSON files
        #[arg(required = true)]
        reports: Vec<PathBuf>,

        /// Prior delinquency snapshots, keyed by account fingerprint or id
        #[arg(long)]
        history: Option<PathBuf>,

        /// Audit configuration JSON (defaults apply to missing keys)
        #[arg(long)]
        config: Option<PathBuf>,

        /// SQLite citation store (built-in table when omitted)
        #[arg(long)]
        citations: Option<PathBuf>,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,

        /// Exit with status 2 when any violation reaches this severity
        #[arg(long, value_parser = parse_severity)]
        fail_on: Option<Severity>,
    },

    /// Manage the citation store.
    Citations {
        #[command(subcommand)]
        command: CitationCommands,
    },

    /// Print the rule catalog.
    Catalog,
}

#[derive(Subcommand, Debug)]
enum CitationCommands {
    /// Load rule_code,anchor_id,source_document,page_range,statute rows
    Import { csv: PathBuf, db: PathBuf },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Commands::Audit {
            reports,
            history,
            config,
            citations,
            pretty,
            fail_on,
        } => run_audit(&reports, history, config, citations, pretty, fail_on),
        Commands::Citations {
            command: CitationCommands::Import { csv, db },
        } => {
            run_import(&csv, &db)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Catalog => {
            println!("{}", serde_json::to_string_pretty(&catalog())?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn run_audit(
    report_paths: &[PathBuf],
    history_path: Option<PathBuf>,
    config_path: Option<PathBuf>,
    citations_path: Option<PathBuf>,
    pretty: bool,
    fail_on: Option<Severity>,
) -> Result<ExitCode> {
    let config = match config_path {
        Some(path) => AuditConfig::from_file(path)?,
        None => AuditConfig::default(),
    };

    let citations: Box<dyn CitationSource> = match citations_path {
        Some(path) => Box::new(SqliteCitationStore::open(&path)?),
        None => Box::new(StaticCitationTable::standard()),
    };

    let engine = AuditEngine::new(config, RuleSet::standard(), citations)
        .context("Failed to build audit engine")?;

    let reports = report_paths
        .iter()
        .map(|path| read_json::<NormalizedReport>(path))
        .collect::<Result<Vec<_>>>()?;

    let history = match history_path {
        Some(path) => read_json::<SnapshotHistory>(&path)?,
        None => SnapshotHistory::new(),
    };

    let results = engine
        .audit(&AuditInput::new(reports).with_history(history))
        .context("Audit could not run")?;

    let output = if pretty {
        serde_json::to_string_pretty(&results)?
    } else {
        serde_json::to_string(&results)?
    };
    println!("{}", output);

    let failed = fail_on.map_or(false, |threshold| {
        results
            .iter()
            .flat_map(|r| &r.violations)
            .any(|v| v.severity >= threshold)
    });

    Ok(if failed {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    })
}

fn run_import(csv_path: &Path, db_path: &Path) -> Result<()> {
    println!("📚 Citation import - CSV → SQLite");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let store = SqliteCitationStore::open(db_path)?;
    let imported = store.import_csv(csv_path)?;
    println!("✓ Imported {} citations from {:?}", imported, csv_path);

    let total = store.count()?;
    println!("✓ Store now holds {} citations", total);

    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {:?}", path))
}

fn parse_severity(value: &str) -> Result<Severity, String> {
    Severity::ALL
        .iter()
        .copied()
        .find(|s| s.as_str().eq_ignore_ascii_case(value))
        .ok_or_else(|| format!("unknown severity '{}' (LOW, MEDIUM, HIGH, CRITICAL)", value))
}
