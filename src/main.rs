use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use u_taskorder::config::{init_config, load_config, DEFAULT_CONFIG_FILE};
use u_taskorder::run::RunController;
use u_taskorder::server::run_server;
use u_taskorder::store::JsonFileStore;
use u_taskorder::transport::{write_ndjson, RunEventStream};

#[derive(Parser, Debug)]
#[command(
    name = "u-taskorder",
    version,
    about = "Simulated-annealing task ordering with live progress"
)]
struct Cli {
    /// Configuration file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API (task list + SSE optimizer stream).
    Serve {
        /// Override `[server] bind`.
        #[arg(long)]
        bind: Option<String>,
    },
    /// Optimize once and print events as JSON lines on stdout.
    Run {
        /// Task list to optimize (defaults to `[store] path`).
        #[arg(long)]
        tasks: Option<PathBuf>,
        /// Override `[annealing] seed`.
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Write a default configuration file.
    InitConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the NDJSON stream, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("u_taskorder=info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve { bind } => {
            let mut config = load_config(&cli.config)?;
            if let Some(bind) = bind {
                config.server.bind = bind;
                config.validate().context("invalid --bind")?;
            }
            run_server(&config).await
        }
        Command::Run { tasks, seed } => {
            let mut config = load_config(&cli.config)?;
            if seed.is_some() {
                config.annealing.seed = seed;
            }
            let path = tasks.unwrap_or_else(|| config.store.path.clone());
            info!(path = %path.display(), "optimizing task list");

            // An unreadable task list comes out as an `error` line.
            let controller = RunController::new(config.run_settings());
            let handle = controller.start_from_store(&JsonFileStore::new(&path)).await?;
            let stream = RunEventStream::new(handle);
            let mut stdout = tokio::io::stdout();

            tokio::select! {
                res = write_ndjson(stream, &mut stdout) => res.context("write events")?,
                _ = tokio::signal::ctrl_c() => {
                    // Dropping the stream cancels the run.
                    warn!("interrupted, cancelling run");
                }
            }
            Ok(())
        }
        Command::InitConfig => {
            if init_config(&cli.config)? {
                println!("Wrote default config: {}", cli.config.display());
            } else {
                println!("Config already exists: {}", cli.config.display());
            }
            Ok(())
        }
    }
}
