//! Command-line front end for the Graphite expression evaluator
//!
//! ```bash
//! # Evaluate a target against series stored in a JSON file
//! kuba-eval eval --data fetched.json "groupByNode(servers.*.cpu, 1, 'sum')"
//!
//! # List function descriptors
//! kuba-eval functions --name summarize
//!
//! # Validate a configuration file
//! kuba-eval --config eval.toml check-config
//! ```
//!
//! The data file maps each metric pattern to the series it matched:
//!
//! ```json
//! { "servers.*.cpu": [ { "name": "servers.a.cpu", "values": [1.0, 2.0],
//!     "is_absent": [false, false], "start": 0, "stop": 120, "step": 60 } ] }
//! ```
//!
//! Configuration is read from `--config`, else `KUBA_EVAL_CONFIG`, else
//! defaults, and environment overrides are applied on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use kuba_graphite::{
    config::Config,
    metrics,
    query::{Evaluator, FunctionRegistry},
    types::{FetchedSeriesIndex, TimeSeries, TimeWindow},
    Error,
};
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "kuba-eval")]
#[command(version)]
#[command(about = "Evaluate Graphite targets against pre-fetched series", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file (overrides KUBA_EVAL_CONFIG env var)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print Prometheus metrics to stderr before exiting
    #[arg(long, global = true)]
    metrics: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a target and print the resulting series as JSON
    Eval {
        /// JSON file mapping metric patterns to fetched series
        #[arg(short, long)]
        data: PathBuf,

        /// Window start (defaults to the earliest series start)
        #[arg(long)]
        from: Option<i64>,

        /// Window end (defaults to the latest series stop)
        #[arg(long)]
        until: Option<i64>,

        /// Target expression
        target: String,
    },

    /// Print function descriptors as JSON
    Functions {
        /// Only show this function
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Validate configuration and print it
    CheckConfig,
}

// =============================================================================
// Command Handlers
// =============================================================================

fn load_config(cli: &Cli) -> Result<Config, Error> {
    let path = cli
        .config
        .clone()
        .or_else(|| std::env::var("KUBA_EVAL_CONFIG").ok().map(PathBuf::from));

    let config = match path {
        Some(path) => Config::from_file_with_env(&path.to_string_lossy())?,
        None => Config::from_env(),
    };
    config.validate()?;
    Ok(config)
}

fn load_index(
    path: &Path,
    from: Option<i64>,
    until: Option<i64>,
) -> Result<(FetchedSeriesIndex, TimeWindow), Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)?;
    let fetched: BTreeMap<String, Vec<TimeSeries>> = serde_json::from_str(&contents)?;

    let all = || fetched.values().flatten();
    let from = from.or_else(|| all().map(|s| s.start).min()).unwrap_or(0);
    let until = until.or_else(|| all().map(|s| s.stop).max()).unwrap_or(0);
    let window = TimeWindow::new(from, until);

    let mut index = FetchedSeriesIndex::new();
    for (metric, series) in fetched {
        index.insert(metric, window, series)?;
    }
    Ok((index, window))
}

fn cmd_eval(
    config: Config,
    data: &Path,
    from: Option<i64>,
    until: Option<i64>,
    target: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let (index, window) = load_index(data, from, until)?;
    debug!(keys = index.len(), window = %window, "Loaded fetched series");

    let registry = Arc::new(FunctionRegistry::with_builtins()?);
    metrics::update_registered_functions(registry.len());
    let evaluator = Evaluator::new(registry).with_config(config.evaluator);

    let result = match evaluator.evaluate_target(target, window, &index) {
        Ok(series) => series,
        Err(e) if e.is_no_data() => {
            info!(target = %target, "No data");
            Vec::new()
        },
        Err(e) => return Err(e.into()),
    };

    let series: Vec<&TimeSeries> = result.iter().map(|s| s.as_ref()).collect();
    println!("{}", serde_json::to_string_pretty(&series)?);
    Ok(())
}

fn cmd_functions(name: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let registry = FunctionRegistry::with_builtins()?;
    let catalogue = registry.catalogue();

    match name {
        Some(name) => {
            let descriptor = catalogue.get(name).ok_or_else(|| Error::UnknownFunction {
                name: name.to_string(),
                position: 0,
            })?;
            println!("{}", serde_json::to_string_pretty(descriptor)?);
        },
        None => println!("{}", serde_json::to_string_pretty(&catalogue)?),
    }
    Ok(())
}

fn cmd_check_config(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("Configuration is valid");
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.logging.with_target)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Eval {
            data,
            from,
            until,
            target,
        } => cmd_eval(config, data, *from, *until, target)?,
        Commands::Functions { name } => cmd_functions(name.as_deref())?,
        Commands::CheckConfig => cmd_check_config(&config)?,
    }

    if cli.metrics {
        eprintln!("{}", metrics::gather_metrics()?);
    }
    Ok(())
}
