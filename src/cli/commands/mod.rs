//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod backends;
mod config_cmd;
mod jobs;
mod work;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{Config, Settings};

#[derive(Parser)]
#[command(name = "lectern")]
#[command(about = "Asynchronous study-material generation pipeline")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Redis URL for queue, locks and status events
    #[arg(long, global = true, env = "REDIS_URL")]
    redis_url: Option<String>,

    /// Database URL (sqlite:path)
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Run the worker pool until interrupted
    Work {
        /// Number of workers
        #[arg(short, long)]
        workers: Option<usize>,
        /// Concurrent model calls across all workers
        #[arg(long)]
        model_concurrency: Option<usize>,
    },

    /// Save a pending job and push it onto its queue
    Enqueue {
        /// Job type (content-processing, summary-generation, quiz-generation, flashcard-generation)
        job_type: String,
        /// Id of the content item, summary, quiz or deck the job updates
        reference_id: String,
        /// Owning user id
        #[arg(short, long)]
        user: String,
        /// Job options as JSON
        #[arg(long)]
        options: Option<String>,
    },

    /// Cancel a job that has not finished yet
    Cancel {
        job_id: String,
    },

    /// Show a job record
    Job {
        job_id: String,
    },

    /// Show the effective configuration
    Config,
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (mut settings, source_path) = match cli.config {
        Some(ref path) => load_from_file(path).await?,
        None => Settings::load().await,
    };
    if let Some(url) = cli.redis_url {
        settings.redis_url = Some(url);
    }
    if let Some(url) = cli.database_url {
        settings.database_url = Some(url);
    }

    match cli.command {
        Commands::Work {
            workers,
            model_concurrency,
        } => {
            if let Some(n) = workers {
                settings.worker_count = n.max(1);
            }
            if let Some(n) = model_concurrency {
                settings.model_concurrency = n.max(1);
            }
            work::cmd_work(&settings).await
        }
        Commands::Enqueue {
            job_type,
            reference_id,
            user,
            options,
        } => {
            jobs::cmd_enqueue(&settings, &job_type, &reference_id, &user, options.as_deref())
                .await
        }
        Commands::Cancel { job_id } => jobs::cmd_cancel(&settings, &job_id).await,
        Commands::Job { job_id } => jobs::cmd_show(&settings, &job_id).await,
        Commands::Config => config_cmd::cmd_config_show(&settings, source_path.as_deref()),
    }
}

async fn load_from_file(path: &std::path::Path) -> anyhow::Result<(Settings, Option<PathBuf>)> {
    if !path.exists() {
        anyhow::bail!("Config file not found: {}", path.display());
    }
    let config = Config::load_from_path(path)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;
    let base_dir = config.base_dir().unwrap_or_else(|| PathBuf::from("."));

    let mut settings = Settings::default();
    config.apply_to_settings(&mut settings, &base_dir);
    settings.apply_env(|key| std::env::var(key).ok());
    Ok((settings, config.source_path))
}
