//! alarmvisor - concurrent alarm scheduler
//!
//! Reads `Start_Alarm:` / `Replace_Alarm:` / `Cancel_Alarm:` commands from
//! standard input and prints alarms from a pool of display workers.

use std::sync::Arc;
use std::time::Duration;

use alarmvisor::{AlarmService, Config, StdoutConsole, Subscribe};
use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// alarmvisor - concurrent alarm scheduler
#[derive(Parser, Debug)]
#[command(name = "alarmvisor")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Number of display worker slots
    #[arg(short, long, default_value_t = 4)]
    workers: usize,

    /// Delay in seconds for commands without an `in=` / `every=` token
    #[arg(long, default_value_t = 5)]
    default_delay: u64,

    /// Seconds to wait for display workers to stop during shutdown
    #[arg(long, default_value_t = 5)]
    grace: u64,

    /// At end of input, keep running until every display worker has exited
    #[arg(long)]
    linger: bool,

    /// Prompt written before each command (e.g. "Alarm> ")
    #[arg(long)]
    prompt: Option<String>,

    /// Log level (trace, debug, info, warn, error); `RUST_LOG` takes precedence
    #[arg(long, default_value = "warn")]
    log_level: String,
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            workers: self.workers,
            default_delay: Duration::from_secs(self.default_delay),
            grace: Duration::from_secs(self.grace),
            linger: self.linger,
            prompt: self.prompt.clone(),
            ..Config::default()
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the command protocol.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;
    let result = runtime.block_on(run(cli.config()));

    // Stdin is read on a blocking thread that may still be parked in a read.
    runtime.shutdown_timeout(Duration::from_millis(100));
    result
}

async fn run(cfg: Config) -> Result<()> {
    #[cfg(feature = "logging")]
    let subscribers: Vec<Arc<dyn Subscribe>> = vec![Arc::new(alarmvisor::LogWriter::new())];
    #[cfg(not(feature = "logging"))]
    let subscribers: Vec<Arc<dyn Subscribe>> = Vec::new();

    tracing::info!(workers = cfg.worker_count(), linger = cfg.linger, "starting alarm service");
    let service = AlarmService::new(cfg, Arc::new(StdoutConsole), subscribers);
    service
        .run(BufReader::new(tokio::io::stdin()))
        .await
        .context("alarm service failed")
}
