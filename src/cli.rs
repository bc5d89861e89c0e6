//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_tick_adapter::CsvTickAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::text_report::{self, TextReport};
use crate::domain::config_validation::{ReplaySettings, validate_config};
use crate::domain::error::TickdeskError;
use crate::domain::plan::{SeriesPlan, StreamRef};
use crate::domain::registry::IndexRegistry;
use crate::domain::replay::{ReplayReport, ReplaySession};
use crate::domain::strategies::StrategyRegistry;
use crate::ports::config_port::ConfigPort;
use crate::ports::report_port::ReportPort;
use crate::ports::tick_port::TickPort;

#[derive(Parser, Debug)]
#[command(name = "tickdesk", about = "Streaming indicator engine over recorded ticks")]
pub struct Cli {
    /// Log engine activity at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay a recorded tick log through the configured indexes and strategy
    Replay {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        ticks: PathBuf,
        /// Only replay ticks for this ticker id
        #[arg(long)]
        ticker: Option<i64>,
    },
    /// List the built-in indexes and strategies with their parameters
    Indexes,
    /// Validate a configuration without replaying
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Replay {
            config,
            ticks,
            ticker,
        } => run_replay(&config, ticks, ticker),
        Command::Indexes => run_indexes(),
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    })
}

fn run_replay(config_path: &Path, ticks_path: PathBuf, ticker: Option<i64>) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let ticks = CsvTickAdapter::new(ticks_path);

    let (settings, report) = match replay(&adapter, &ticks, ticker) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let mut stdout = io::stdout().lock();
    match TextReport::new(settings.ledger).write(&report, &mut stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Validates `config`, replays every tick from `ticks` and returns the report.
pub fn replay(
    config: &dyn ConfigPort,
    ticks: &dyn TickPort,
    ticker: Option<i64>,
) -> Result<(ReplaySettings, ReplayReport), TickdeskError> {
    let (settings, plan) = validate_config(config)?;
    tracing::debug!(
        field = %settings.field,
        indexes = plan.indexes().len(),
        strategy = plan.strategy().is_some(),
        "plan ready"
    );

    let mut session = ReplaySession::new(&settings, plan).only(ticker);
    session.replay(ticks)?;
    let report = session.report();
    Ok((settings, report))
}

fn run_indexes() -> ExitCode {
    print!(
        "{}",
        text_report::format_registry(IndexRegistry::builtin(), StrategyRegistry::builtin())
    );
    ExitCode::SUCCESS
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating configuration: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    match validate_config(&adapter) {
        Ok((settings, plan)) => {
            eprint!("{}", describe_plan(&settings, &plan));
            eprintln!("\nConfiguration is valid.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// One line per planned stream, in attachment order.
pub fn describe_plan(settings: &ReplaySettings, plan: &SeriesPlan) -> String {
    let mut out = format!("\nReplay field: {}\n", settings.field);
    for (id, symbol) in &settings.tickers {
        out.push_str(&format!("Ticker {}: {}\n", id, symbol));
    }

    if plan.is_empty() {
        out.push_str("No indexes configured.\n");
        return out;
    }

    for spec in plan.indexes() {
        out.push_str(&format!(
            "  {} = {}({})\n",
            spec.key,
            spec.kind,
            wiring(&spec.source, &spec.inputs, &spec.params)
        ));
    }
    if let Some(spec) = plan.strategy() {
        out.push_str(&format!(
            "  strategy = {}({}) x {} shares\n",
            spec.name,
            wiring(&spec.source, &spec.inputs, &spec.params),
            spec.trade_shares
        ));
    }
    out
}

fn wiring(source: &StreamRef, inputs: &[StreamRef], params: &[(String, f64)]) -> String {
    let mut out = source.to_string();
    for input in inputs {
        out.push_str(&format!(", {}", input));
    }
    if !params.is_empty() {
        let params: Vec<String> = params
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect();
        out.push_str(&format!("; {}", params.join(", ")));
    }
    out
}
