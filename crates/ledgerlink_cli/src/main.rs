//! ledgerlink CLI
//!
//! Operator tools for the engine sync subsystem.
//!
//! # Commands
//!
//! - `status` - Probe the engine and show queue depth
//! - `probe` - Run a single reachability probe
//! - `drain` - Replay queued entries to the engine
//! - `pending` - List entries awaiting delivery
//! - `cancel` - Drop a pending entry without delivering it
//! - `checkpoint` - Compact the queue journal

mod commands;

use clap::{Parser, Subcommand};
use ledgerlink_queue::{BackoffPolicy, OfflineQueue, QueueResult};
use ledgerlink_storage::FileBackend;
use ledgerlink_sync::{HttpTransport, ReqwestClient, SyncConfig, SyncCoordinator};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Operator tools for the ledger engine sync subsystem.
#[derive(Parser)]
#[command(name = "ledgerlink")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Engine host
    #[arg(global = true, long, default_value = "localhost")]
    host: String,

    /// Engine HTTP port
    #[arg(global = true, long, default_value_t = 9000)]
    port: u16,

    /// Target company (defaults to the engine's active company)
    #[arg(global = true, long)]
    company: Option<String>,

    /// Directory holding the queue journal
    #[arg(global = true, short, long, default_value = ".")]
    data_dir: PathBuf,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe the engine and show connection state and queue depth
    Status,

    /// Run a single reachability probe
    Probe,

    /// Replay queued entries to the engine
    Drain,

    /// List entries awaiting delivery
    Pending,

    /// Drop a pending entry without delivering it
    Cancel {
        /// Sequence number of the entry
        #[arg(short, long)]
        seq: u64,
    },

    /// Compact the queue journal down to live entries
    Checkpoint,
}

impl Cli {
    fn open_queue(&self) -> QueueResult<Arc<OfflineQueue>> {
        let path = self.data_dir.join("queue.journal");
        let backend = FileBackend::open_with_create_dirs(&path)?;
        let queue = OfflineQueue::open(Box::new(backend), BackoffPolicy::default())?;
        Ok(Arc::new(queue))
    }

    fn open_coordinator(
        &self,
    ) -> Result<SyncCoordinator<HttpTransport<ReqwestClient>>, Box<dyn std::error::Error>> {
        let mut config = SyncConfig::new(self.host.clone(), self.port);
        if let Some(company) = &self.company {
            config = config.with_company(company.clone());
        }
        let transport = Arc::new(HttpTransport::connect(self.host.clone(), self.port)?);
        let queue = self.open_queue()?;
        Ok(SyncCoordinator::new(config, transport, queue))
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Status => {
            let coordinator = cli.open_coordinator()?;
            commands::status::run(&coordinator)?;
        }
        Commands::Probe => {
            let coordinator = cli.open_coordinator()?;
            commands::probe::run(&coordinator)?;
        }
        Commands::Drain => {
            let coordinator = cli.open_coordinator()?;
            commands::drain::run(&coordinator)?;
        }
        Commands::Pending => {
            let queue = cli.open_queue()?;
            commands::pending::run(&queue)?;
        }
        Commands::Cancel { seq } => {
            let queue = cli.open_queue()?;
            commands::cancel::run(&queue, seq)?;
        }
        Commands::Checkpoint => {
            let queue = cli.open_queue()?;
            commands::checkpoint::run(&queue)?;
        }
    }

    Ok(())
}
