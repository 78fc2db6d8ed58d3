//! Load test CLI for the Polanji course-completion journey.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use load_test::config::{resolve_environment, ScenarioCatalog, ThresholdBounds, ThresholdSet};
use load_test::journey::{ALLOWED_ENVIRONMENTS, JOURNEY_OPERATIONS};
use load_test::{LoadRunner, ResultsReport, RunnerConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Exit status when one or more thresholds fail.
const THRESHOLDS_FAILED: u8 = 99;

#[derive(Parser)]
#[command(name = "load-test")]
#[command(about = "Load testing tool for the Polanji course-completion journey", long_about = None)]
struct Cli {
    /// Log level
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the course-completion journey under a load scenario
    Run {
        /// Target environment: dev, qa, staging, prod
        #[arg(short, long, env = "ENV")]
        env: Option<String>,

        /// Scenario (workload) name
        #[arg(short, long, env = "WORKLOAD")]
        workload: Option<String>,

        /// Password shared by every generated user
        #[arg(short, long, env = "PASSWORD", hide_env_values = true)]
        password: String,

        /// Override the environment's base URL
        #[arg(long, env = "BASE_URL")]
        base_url: Option<String>,

        /// Extra scenarios from a YAML file (same names override built-ins)
        #[arg(long)]
        scenario_file: Option<PathBuf>,

        /// Seed for reproducible emails, course picks and pauses
        #[arg(long)]
        seed: Option<u64>,

        /// Per-request timeout in seconds
        #[arg(long, default_value = "30")]
        timeout: u64,

        /// Delay before aborting thresholds are evaluated, in seconds
        #[arg(long)]
        threshold_abort_delay: Option<u64>,

        /// Run against environments other than staging
        #[arg(long)]
        allow_any_env: bool,

        /// Hide the progress bar
        #[arg(long)]
        no_progress: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        output: OutputFormat,
    },

    /// List available scenarios
    List {
        /// Extra scenarios from a YAML file
        #[arg(long)]
        scenario_file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_json)?;

    match cli.command {
        Commands::Run {
            env,
            workload,
            password,
            base_url,
            scenario_file,
            seed,
            timeout,
            threshold_abort_delay,
            allow_any_env,
            no_progress,
            output,
        } => {
            let mut environment = resolve_environment(env.as_deref())?;
            if let Some(url) = base_url {
                environment = environment.with_base_url(url)?;
            }
            if allow_any_env {
                if let Err(e) = environment.require(&ALLOWED_ENVIRONMENTS) {
                    warn!(error = %e, "Environment guard bypassed");
                }
            } else {
                environment.require(&ALLOWED_ENVIRONMENTS)?;
            }

            let catalog = load_catalog(scenario_file)?;
            let scenario = catalog.select(workload.as_deref())?.clone();

            let mut thresholds =
                ThresholdSet::for_operations(&JOURNEY_OPERATIONS, &ThresholdBounds::default());
            if let Some(secs) = threshold_abort_delay {
                thresholds = thresholds.with_abort_delay(Duration::from_secs(secs));
            }

            info!(
                scenario = %scenario.name,
                environment = %environment.name,
                thresholds = thresholds.len(),
                "Configuration loaded"
            );

            let runner = LoadRunner::new(RunnerConfig {
                scenario,
                environment,
                password,
                thresholds,
                seed,
                request_timeout: Duration::from_secs(timeout),
                show_progress: !no_progress,
            })?;
            let results = runner.run().await?;

            match output {
                OutputFormat::Json => println!("{}", ResultsReport::format_json(&results)?),
                OutputFormat::Csv => {
                    println!("{}", ResultsReport::csv_header());
                    println!("{}", ResultsReport::format_csv(&results));
                }
                OutputFormat::Table => println!("{}", ResultsReport::format_table(&results)),
            }

            if results.thresholds_passed {
                Ok(ExitCode::SUCCESS)
            } else {
                error!(
                    failed = results.thresholds.iter().filter(|t| !t.passed).count(),
                    "Thresholds have been crossed"
                );
                Ok(ExitCode::from(THRESHOLDS_FAILED))
            }
        }
        Commands::List { scenario_file } => {
            let catalog = load_catalog(scenario_file)?;
            println!("Available scenarios:");
            println!();
            for name in catalog.names() {
                let scenario = catalog.select(Some(name))?;
                println!(
                    "  {} - {} (max {} VUs, {}s)",
                    name,
                    scenario.executor.kind(),
                    scenario.executor.max_vus(),
                    scenario.executor.duration().as_secs()
                );
                if !scenario.description.is_empty() {
                    println!("    {}", scenario.description);
                }
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_catalog(path: Option<PathBuf>) -> Result<ScenarioCatalog> {
    let builtin = ScenarioCatalog::builtin();
    Ok(match path {
        Some(path) => builtin.merge(ScenarioCatalog::from_file(&path)?),
        None => builtin,
    })
}

fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Logs go to stderr so reports on stdout stay machine readable.
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}
