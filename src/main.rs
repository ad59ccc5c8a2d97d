//! Ralph Loop - autonomous spec runner
//!
//! Runs a coding agent against a spec file, iteration after iteration,
//! until the spec is complete.

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use ralph_loop::config::{ConfigLoader, LoopConfig};
use ralph_loop::r#loop::{LoopController, LoopDependencies};
use ralph_loop::spec::{SpecReader, SpecSummary};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

#[derive(Parser)]
#[command(name = "ralph-loop")]
#[command(version)]
#[command(about = "Drive a coding agent through a spec until every task is complete", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// The spec file, given with either flag.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct SpecArg {
    /// Spec file: Markdown task doc (.md) or JSON story list (.json)
    #[arg(long, value_name = "FILE")]
    spec: Option<PathBuf>,

    /// Spec file, same as --spec
    #[arg(long, value_name = "FILE")]
    prd: Option<PathBuf>,
}

impl SpecArg {
    fn into_path(self) -> anyhow::Result<PathBuf> {
        self.spec
            .or(self.prd)
            .ok_or_else(|| anyhow::anyhow!("one of --spec or --prd is required"))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the loop until the spec is complete or the cap is reached
    Run {
        #[command(flatten)]
        spec: SpecArg,

        /// Maximum iterations (0 = unlimited)
        #[arg(short, long, env = "RALPH_LOOP_MAX_ITERATIONS")]
        max_iterations: Option<u32>,

        /// Text the agent prints once all work is done
        #[arg(long, env = "RALPH_LOOP_COMPLETION_PROMISE")]
        completion_promise: Option<String>,

        /// Agent executable to invoke
        #[arg(long, env = "RALPH_LOOP_MODEL")]
        model: Option<String>,

        /// Write JSONL telemetry to this file
        #[arg(long = "log-file", visible_alias = "log", env = "RALPH_LOOP_LOG_FILE", value_name = "FILE")]
        log_file: Option<PathBuf>,

        /// Seconds to pause between iterations
        #[arg(long, value_name = "SECS")]
        delay_secs: Option<u64>,
    },

    /// Show progress of a spec without running the agent
    Status {
        #[command(flatten)]
        spec: SpecArg,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct StatusReport {
    spec: PathBuf,
    #[serde(flatten)]
    summary: SpecSummary,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; stdout carries the agent's output
    let filter = if cli.verbose {
        "ralph_loop=debug,info"
    } else {
        "ralph_loop=info,warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            spec,
            max_iterations,
            completion_promise,
            model,
            log_file,
            delay_secs,
        } => {
            let spec_path = spec.into_path()?;
            let working_dir = std::env::current_dir()?;

            let file_config = match ConfigLoader::new().load(&working_dir) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("{} {}", "Error:".red().bold(), e);
                    std::process::exit(e.exit_code());
                }
            };

            let mut config = LoopConfig::new(spec_path)
                .with_working_dir(working_dir)
                .with_file_config(&file_config);
            if let Some(max) = max_iterations {
                config = config.with_max_iterations(max);
            }
            if let Some(promise) = completion_promise {
                config = config.with_completion_promise(promise);
            }
            if let Some(model) = model {
                config = config.with_model(model);
            }
            if let Some(path) = log_file {
                config = config.with_log_file(path);
            }
            if let Some(secs) = delay_secs {
                config = config.with_iteration_delay(Duration::from_secs(secs));
            }
            debug!("Resolved configuration: {:?}", config);

            let deps = match LoopDependencies::real(&config) {
                Ok(deps) => deps,
                Err(e) => {
                    eprintln!("{} {:#}", "Error:".red().bold(), e);
                    std::process::exit(1);
                }
            };

            let mut controller = match LoopController::new(config, deps) {
                Ok(controller) => controller,
                Err(e) => {
                    eprintln!("{} {}", "Error:".red().bold(), e);
                    std::process::exit(e.exit_code());
                }
            };

            match controller.run().await {
                Ok(outcome) => std::process::exit(outcome.exit_code()),
                Err(e) => {
                    eprintln!("{} {}", "Error:".red().bold(), e);
                    std::process::exit(e.exit_code());
                }
            }
        }

        Commands::Status { spec, json } => {
            let spec_path = spec.into_path()?;
            let summary = match SpecReader::open(&spec_path).and_then(|r| r.summary()) {
                Ok(summary) => summary,
                Err(e) => {
                    eprintln!("{} {}", "Error:".red().bold(), e);
                    std::process::exit(e.exit_code());
                }
            };
            let complete = summary.is_complete();

            if json {
                let report = StatusReport {
                    spec: spec_path,
                    summary,
                };
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", "Spec Status".bright_blue().bold());
                println!("   File: {}", spec_path.display());
                println!("   Format: {}", summary.format);
                println!(
                    "   Pending: {}/{} {}",
                    summary.pending,
                    summary.total,
                    summary.format.unit_name()
                );
                if let Some(ref next) = summary.next {
                    println!("   Next: {next}");
                }
                if complete {
                    println!("{} All work complete", "OK".green().bold());
                }
            }

            if !complete {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
