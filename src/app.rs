use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::ops::credentials::CredentialResolver;
use crate::ops::git::GitOps;

/// Pause between two jobs of a batch.
pub const DEFAULT_JOB_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Parent directory for the per-job working directories.
    pub work_root: PathBuf,
    pub job_delay: Duration,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            work_root: std::env::temp_dir(),
            job_delay: DEFAULT_JOB_DELAY,
        }
    }
}

/// Shared shutdown request, observed at step boundaries.
#[derive(Debug, Clone, Default)]
pub struct Shutdown(Arc<AtomicBool>);

impl Shutdown {
    /// Returns whether a shutdown had already been requested.
    pub fn request(&self) -> bool {
        self.0.swap(true, Ordering::SeqCst)
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Composition root: the orchestrator and batch runner over a git executor
/// and a credential resolver.
pub struct App<G: GitOps, C: CredentialResolver> {
    pub git: G,
    pub credentials: C,
    pub settings: RunSettings,
    pub shutdown: Shutdown,
}

impl<G: GitOps, C: CredentialResolver> App<G, C> {
    pub fn new(git: G, credentials: C, settings: RunSettings) -> Self {
        Self {
            git,
            credentials,
            settings,
            shutdown: Shutdown::default(),
        }
    }

    /// Share an externally owned shutdown flag, e.g. one set by a signal handler.
    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }
}
