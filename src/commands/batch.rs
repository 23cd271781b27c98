use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::Path;

use anyhow::Context;
use anyhow::Result;
use colored::Colorize;
use futures_util::FutureExt as _;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::App;
use crate::model::BatchSummary;
use crate::model::MigrationJob;
use crate::model::MigrationResult;
use crate::ops::credentials::CredentialResolver;
use crate::ops::git::GitOps;

impl<G: GitOps, C: CredentialResolver> App<G, C> {
    /// Migrate every job in order, one at a time, and summarize.
    ///
    /// A failed job never stops the batch. Each job yields exactly one
    /// result; jobs not started because of a shutdown request are recorded
    /// as failed.
    pub async fn migrate_batch(&self, jobs: &[MigrationJob]) -> BatchSummary {
        info!("Found {} repositories to migrate", jobs.len());

        let mut results = Vec::with_capacity(jobs.len());
        for (index, job) in jobs.iter().enumerate() {
            if self.shutdown.is_requested() {
                warn!("Skipping {}: shutdown requested", job.name);
                results.push(MigrationResult::failed(
                    &job.name,
                    "Skipped: shutdown requested",
                ));
                continue;
            }

            info!("[{}/{}] Migrating {}", index + 1, jobs.len(), job.name);
            let result = match AssertUnwindSafe(self.migrate(job)).catch_unwind().await {
                Ok(result) => result,
                Err(panic) => {
                    let message = format!("unexpected fault: {}", panic_message(&*panic));
                    error!("Migration of {} aborted: {}", job.name, message);
                    MigrationResult::failed(&job.name, message)
                }
            };
            results.push(result);

            let is_last = index + 1 == jobs.len();
            if !is_last && !self.settings.job_delay.is_zero() && !self.shutdown.is_requested() {
                tokio::time::sleep(self.settings.job_delay).await;
            }
        }

        let summary = BatchSummary::from_results(results);
        info!(
            "Migration batch completed. {}/{} repositories migrated successfully",
            summary.succeeded, summary.total
        );
        summary
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}

/// Print one line per job, then the totals and the error of every failed job.
pub fn write_summary(summary: &BatchSummary, stdout: &mut impl std::io::Write) -> Result<()> {
    for result in &summary.results {
        if result.success {
            writeln!(stdout, "{} {}", "✓".green(), result.job_name)?;
        } else {
            writeln!(stdout, "{} {}", "✗".red(), result.job_name.bold())?;
            if let Some(message) = &result.error_message {
                writeln!(stdout, "  {}", message.dimmed())?;
            }
        }
    }

    let totals = format!(
        "Migrated {}/{} repositories, {} failed",
        summary.succeeded, summary.total, summary.failed
    );
    if summary.all_succeeded() {
        writeln!(stdout, "{}", totals.green())?;
    } else {
        writeln!(stdout, "{}", totals.red())?;
    }

    Ok(())
}

/// Write the summary as pretty-printed JSON.
pub fn write_report(summary: &BatchSummary, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, json + "\n")
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    Ok(())
}
