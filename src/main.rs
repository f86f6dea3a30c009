//! # EMSys command line
//!
//! Runs the telemetry API, seeds sample data and prints statistics from the
//! local store.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;

use chrono::Utc;
use emsys_lib::analytics::{self, calculator};
use emsys_lib::error::AppError;
use emsys_lib::local_server::{default_config_dir, LocalServer, ServerConfig};
use emsys_lib::logging::init_logging;
use emsys_lib::seed;
use emsys_lib::storage::Database;

#[derive(Parser)]
#[command(name = "emsys")]
#[command(about = "Engine monitoring telemetry backend")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Directory holding settings.yaml and the database (default: platform data dir)
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the HTTP API until interrupted
    Serve {
        /// Port to listen on, overriding config and PORT
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Replace the stored readings with generated sample data
    Seed,

    /// Print statistics for a time range as JSON
    Stats {
        /// Preset range (1h, 24h, 7d, 30d, all)
        #[arg(short, long)]
        range: Option<String>,

        /// Start of a custom range
        #[arg(long)]
        start: Option<String>,

        /// End of a custom range
        #[arg(long)]
        end: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging();

    let config_dir = cli.config_dir.unwrap_or_else(default_config_dir);
    let config = ServerConfig::load_with_env(&config_dir);

    let result = match cli.command {
        Commands::Serve { port } => serve(&config_dir, config, port),
        Commands::Seed => run_seed(&config_dir, &config),
        Commands::Stats { range, start, end } => print_stats(
            &config_dir,
            &config,
            range.as_deref(),
            start.as_deref(),
            end.as_deref(),
        ),
    };

    if let Err(e) = result {
        tracing::error!(code = e.code(), "{}", e);
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

fn serve(config_dir: &Path, config: ServerConfig, port: Option<u16>) -> Result<(), AppError> {
    let runtime = tokio::runtime::Runtime::new()?;

    runtime.block_on(async {
        let port = port.unwrap_or(config.port);
        LocalServer::ensure_port_available(port).await?;

        let server = LocalServer::open(config_dir, config)?;
        let handle = server.start(Some(port)).await?;
        println!("EMSys API running on http://{}", handle.addr());

        tokio::signal::ctrl_c().await?;
        tracing::info!("shutdown requested");
        handle.stop().await;
        Ok(())
    })
}

fn run_seed(config_dir: &Path, config: &ServerConfig) -> Result<(), AppError> {
    let mut db = Database::new(&config.database_path(config_dir))?;
    let summary = seed::seed_database(&mut db, Utc::now())?;

    println!("Removed {} existing readings", summary.deleted);
    println!("Inserted {} readings", summary.inserted);
    if let (Some(oldest), Some(latest)) = (summary.oldest, summary.latest) {
        println!("Data range: {} to {}", oldest.to_rfc3339(), latest.to_rfc3339());
    }
    Ok(())
}

fn print_stats(
    config_dir: &Path,
    config: &ServerConfig,
    range: Option<&str>,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<(), AppError> {
    let db = Database::new(&config.database_path(config_dir))?;
    let resolved = analytics::resolve(range, start, end, Utc::now());
    let readings = db.query_range(&resolved.window)?;

    let stats = calculator::aggregate(&readings, resolved.window, resolved.time_range);
    let json = serde_json::to_string_pretty(&stats)
        .map_err(|e| AppError::internal(format!("Failed to serialize stats: {}", e)))?;
    println!("{}", json);
    Ok(())
}
