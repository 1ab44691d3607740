//! CLI Adapter.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};

use crate::app::api::{self, StackOptions};
use crate::domain::{AppError, EngineKind};

#[derive(Parser)]
#[command(name = "broker-stack")]
#[command(version)]
#[command(about = "Declare, plan and apply the Bro-Ker serverless backend", long_about = None)]
struct Cli {
    /// Configuration file (default: ./broker-stack.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// State file (default: ./.broker-stack/state.json)
    #[arg(short, long, global = true)]
    state: Option<PathBuf>,
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter broker-stack.toml
    Init,
    /// Print resources in submission order with their dependencies
    #[clap(visible_alias = "g")]
    Graph,
    /// Show planned operations without applying them
    #[clap(visible_alias = "p")]
    Plan {
        /// Exit with code 2 when changes are pending
        #[arg(long)]
        detailed_exitcode: bool,
    },
    /// Plan and apply changes
    #[clap(visible_alias = "a")]
    Apply {
        /// Provisioning engine (overrides provider.engine)
        #[arg(long, value_enum)]
        engine: Option<EngineArg>,
    },
    /// Print outputs exported by the last apply
    #[clap(visible_alias = "o")]
    Outputs {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum EngineArg {
    Simulated,
    Http,
}

impl From<EngineArg> for EngineKind {
    fn from(value: EngineArg) -> Self {
        match value {
            EngineArg::Simulated => EngineKind::Simulated,
            EngineArg::Http => EngineKind::Http,
        }
    }
}

/// Entry point for the CLI.
pub fn run() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = StackOptions::current().and_then(|mut options| {
        options.config_path = cli.config;
        options.state_path = cli.state;
        match cli.command {
            Commands::Init => run_init(&options).map(|_| 0),
            Commands::Graph => run_graph(&options).map(|_| 0),
            Commands::Plan { detailed_exitcode } => run_plan(&options, detailed_exitcode),
            Commands::Apply { engine } => {
                options.engine = engine.map(EngineKind::from);
                run_apply(&options).map(|_| 0)
            }
            Commands::Outputs { json } => run_outputs(&options, json).map(|_| 0),
        }
    });

    match result {
        Ok(exit_code) => {
            if exit_code != 0 {
                std::process::exit(exit_code);
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run_init(options: &StackOptions) -> Result<(), AppError> {
    let path = api::init(options)?;
    println!("✅ Created {}", path.display());
    Ok(())
}

fn run_graph(options: &StackOptions) -> Result<(), AppError> {
    let report = api::graph(options)?;
    for (i, entry) in report.resources.iter().enumerate() {
        println!("{:>2}. {} ({})", i + 1, entry.name, entry.kind);
        if !entry.dependencies.is_empty() {
            let deps: Vec<&str> = entry.dependencies.iter().map(|d| d.as_str()).collect();
            println!("    depends on: {}", deps.join(", "));
        }
    }
    if !report.exports.is_empty() {
        println!();
        println!("Exports:");
        for (key, value) in &report.exports {
            println!("  {} = {}", key, value);
        }
    }
    Ok(())
}

fn run_plan(options: &StackOptions, detailed_exitcode: bool) -> Result<i32, AppError> {
    let plan = api::plan(options)?;
    if plan.is_empty() {
        println!("No changes. Recorded state matches the configuration.");
        return Ok(0);
    }

    for operation in plan.operations() {
        println!("  {}", operation);
    }
    println!();
    println!("Plan: {}", plan.summary());
    Ok(if detailed_exitcode { 2 } else { 0 })
}

fn run_apply(options: &StackOptions) -> Result<(), AppError> {
    let outcome = api::apply(options)?;
    if !outcome.changed() {
        println!("✅ No changes. Recorded state matches the configuration.");
    } else {
        for operation in &outcome.operations {
            println!("  {}", operation);
        }
        println!();
        println!("✅ Apply complete: {}", outcome.summary);
    }

    if !outcome.outputs.is_empty() {
        println!();
        println!("Outputs:");
        for (key, value) in &outcome.outputs {
            println!("  {} = {}", key, value);
        }
    }
    Ok(())
}

fn run_outputs(options: &StackOptions, json: bool) -> Result<(), AppError> {
    let outputs = api::outputs(options)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&outputs)?);
        return Ok(());
    }
    if outputs.is_empty() {
        println!("No outputs recorded. Run `broker-stack apply` first.");
        return Ok(());
    }
    for (key, value) in &outputs {
        println!("{} = {}", key, value);
    }
    Ok(())
}
