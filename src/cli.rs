//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::error;

use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::logging::LoggingConfig;
use crate::adapters::scheduler::CycleScheduler;
use crate::adapters::sqlite_adapter::SqliteAdapter;
use crate::domain::calculators::standard_calculators;
use crate::domain::checkpoint::CycleStatus;
use crate::domain::config_validation::validate_settings_config;
use crate::domain::coordinator::{CycleReport, CycleTrigger, RunCoordinator};
use crate::domain::error::AnalyticsError;
use crate::domain::settings::AnalyticsSettings;
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::AnalyticsStorePort;

#[derive(Parser, Debug)]
#[command(name = "tradelens", about = "Scheduled analytics over a closed-trade ledger")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the cycle scheduler until interrupted
    Run {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Run a single analysis cycle and print its report
    Once {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        health_refresh: bool,
    },
    /// Show the cursor, the latest checkpoint and table sizes
    Status {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Run { config } => run_scheduler(&config),
        Command::Once {
            config,
            health_refresh,
        } => run_once(&config, health_refresh),
        Command::Status { config } => run_status(&config),
        Command::Validate { config } => run_validate(&config),
    }
}

/// Everything a cycle needs, wired from one config file.
pub struct Engine {
    pub settings: AnalyticsSettings,
    pub adapter: Arc<SqliteAdapter>,
    pub coordinator: Arc<RunCoordinator>,
}

impl Engine {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, AnalyticsError> {
        validate_settings_config(config)?;
        let settings = AnalyticsSettings::from_config(config)?;
        let adapter = Arc::new(SqliteAdapter::from_config(config)?);
        adapter.initialize_schema()?;
        let coordinator = RunCoordinator::new(
            adapter.clone(),
            adapter.clone(),
            standard_calculators(&settings),
        )?;
        Ok(Self {
            settings,
            adapter,
            coordinator: Arc::new(coordinator),
        })
    }
}

fn fail(err: &AnalyticsError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

/// Load the config file and install logging from it.
fn prepare(path: &Path) -> Result<Engine, AnalyticsError> {
    let config = FileConfigAdapter::load(path)?;
    LoggingConfig::from_config(&config).init();
    Engine::from_config(&config)
}

fn run_scheduler(config_path: &Path) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let engine = match prepare(config_path) {
        Ok(e) => e,
        Err(e) => return fail(&e),
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => return fail(&AnalyticsError::Io(e)),
    };

    let scheduler = CycleScheduler::from_settings(engine.coordinator, &engine.settings);
    let stats = runtime.block_on(scheduler.run_until(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "cannot listen for ctrl-c, running until killed");
            std::future::pending::<()>().await;
        }
    }));
    eprintln!(
        "Stopped after {} regular and {} health refresh cycles",
        stats.regular, stats.health_refresh
    );
    ExitCode::SUCCESS
}

fn run_once(config_path: &Path, health_refresh: bool) -> ExitCode {
    let engine = match prepare(config_path) {
        Ok(e) => e,
        Err(e) => return fail(&e),
    };
    let trigger = if health_refresh {
        CycleTrigger::HealthRefresh
    } else {
        CycleTrigger::Regular
    };

    match engine.coordinator.try_run_cycle(trigger) {
        Ok(report) => {
            print_report(&report);
            match report.failures().next() {
                Some(e) => e.into(),
                None => ExitCode::SUCCESS,
            }
        }
        Err(e) => fail(&e),
    }
}

pub fn print_report(report: &CycleReport) {
    println!("Cycle:      {}", report.trigger);
    println!("Status:     {}", report.status);
    println!("New orders: {}", report.new_orders);
    println!("Cursor:     {}", display_cursor(report.cursor));
    if report.status == CycleStatus::NoOp {
        return;
    }
    println!("Rows:       {}", report.rows_written());
    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(rows) => println!("  {:<12} {rows} rows", outcome.kind.name()),
            Err(e) => println!("  {:<12} FAILED: {e}", outcome.kind.name()),
        }
    }
}

fn display_cursor(cursor: Option<i64>) -> String {
    cursor.map_or_else(|| "none".to_string(), |id| id.to_string())
}

fn run_status(config_path: &Path) -> ExitCode {
    let engine = match prepare(config_path) {
        Ok(e) => e,
        Err(e) => return fail(&e),
    };

    let checkpoint = match engine.adapter.latest_checkpoint() {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let counts = match engine.adapter.table_row_counts() {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };

    println!("Cursor: {}", display_cursor(engine.coordinator.cursor()));
    match checkpoint {
        Some(c) => {
            println!(
                "Last cycle: {} {} at {} ({} new orders, {} rows)",
                c.snapshot_type, c.status, c.created_at, c.records_processed, c.rows_written
            );
            if let Some(message) = &c.error_message {
                println!("  errors: {message}");
            }
        }
        None => println!("Last cycle: never"),
    }
    println!("\nTables:");
    for (table, rows) in counts {
        println!("  {table:<22} {rows}");
    }
    ExitCode::SUCCESS
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let config = match FileConfigAdapter::load(config_path) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    if let Err(e) = validate_settings_config(&config) {
        return fail(&e);
    }
    let settings = match AnalyticsSettings::from_config(&config) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    eprintln!(
        "  scheduler: every {}s, health refresh every {}s",
        settings.short_interval.as_secs(),
        settings.long_interval.as_secs()
    );
    eprintln!(
        "  effectiveness: overall {}%, by pair {}%, by strategy {}%",
        settings.effectiveness.overall,
        settings.effectiveness.by_pair,
        settings.effectiveness.by_strategy
    );
    eprintln!("Config is valid.");
    ExitCode::SUCCESS
}
