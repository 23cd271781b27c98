use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use repo_migrate::App;
use repo_migrate::Config;
use repo_migrate::RunSettings;
use repo_migrate::Shutdown;
use repo_migrate::commands::batch::write_report;
use repo_migrate::commands::batch::write_summary;
use repo_migrate::logging::setup_logging;
use repo_migrate::ops::credentials::EnvCredentials;
use repo_migrate::ops::git::RealGit;
use tracing::error;
use tracing::warn;

#[derive(Parser)]
#[command(name = "repo-migrate", version)]
#[command(about = "Migrate git repositories between hosts, merging divergent destination history", long_about = None)]
pub struct Cli {
    /// Path to the migration configuration (searches default locations if omitted)
    pub config: Option<PathBuf>,

    /// Parent directory for per-repository working directories
    #[arg(long)]
    pub work_dir: Option<PathBuf>,

    /// Delay between two repositories, in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub delay_ms: u64,

    /// Fail any single git command running longer than this
    #[arg(long)]
    pub git_timeout_secs: Option<u64>,

    /// Also write the run summary as JSON to this path
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    let loaded = match &cli.config {
        Some(path) => Config::load(path),
        None => Config::find_default(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    let settings = RunSettings {
        work_root: cli.work_dir.unwrap_or_else(std::env::temp_dir),
        job_delay: Duration::from_millis(cli.delay_ms),
    };
    let git = RealGit::new().with_timeout(cli.git_timeout_secs.map(Duration::from_secs));

    let shutdown = Shutdown::default();
    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if on_signal.request() {
                error!("Interrupted again, exiting immediately");
                std::process::exit(130);
            }
            warn!("Shutdown requested, stopping at the next step boundary (Ctrl-C again to exit now)");
        }
    });

    let app = App::new(git, EnvCredentials, settings).with_shutdown(shutdown);
    let summary = app.migrate_batch(&config.repositories).await;

    write_summary(&summary, &mut std::io::stdout())?;
    if let Some(path) = &cli.report {
        write_report(&summary, path)?;
    }

    if summary.all_succeeded() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
