use std::path::Path;

use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::instrument;
use tracing::warn;

use crate::App;
use crate::error::CredentialError;
use crate::error::MigrationError;
use crate::model::CANONICAL_DEFAULT_BRANCH;
use crate::model::MigrationJob;
use crate::model::MigrationResult;
use crate::model::RENAMED_DEFAULT_BRANCH;
use crate::ops::credentials::Credential;
use crate::ops::credentials::CredentialResolver;
use crate::ops::git::GitOps;
use crate::redact::redact_credentials;
use crate::step::Step;
use crate::step::StepOutcome;
use crate::step::StepStatus;
use crate::workdir::WorkingState;

impl<G: GitOps, C: CredentialResolver> App<G, C> {
    /// Migrate one repository.
    ///
    /// 1. Clone the source into a fresh working directory.
    /// 2. Create local branches for every remote branch.
    /// 3. Move a non-`main` default branch to `old-main`.
    /// 4. Point `origin` at the destination.
    /// 5. Merge the destination's `main`, incoming side winning conflicts.
    /// 6. Push all branches.
    /// 7. Push all tags.
    ///
    /// The working directory is removed before this returns, whatever the
    /// outcome.
    pub async fn migrate(&self, job: &MigrationJob) -> MigrationResult {
        self.migrate_with_outcomes(job).await.0
    }

    /// Like [`Self::migrate`], also returning the outcome of every step that
    /// was reached.
    #[instrument(skip_all, fields(job = %job.name))]
    pub async fn migrate_with_outcomes(
        &self,
        job: &MigrationJob,
    ) -> (MigrationResult, Vec<StepOutcome>) {
        info!(
            "Starting migration of {} to {}",
            redact_credentials(&job.source_url),
            redact_credentials(&job.destination_url)
        );

        let mut outcomes = Vec::new();
        let result = match self.run_steps(job, &mut outcomes).await {
            Ok(()) => {
                info!("Migration completed successfully");
                MigrationResult::succeeded(&job.name)
            }
            Err(e) => {
                let message = redact_credentials(&e.to_string());
                error!("Migration failed: {}", message);
                MigrationResult::failed(&job.name, message)
            }
        };

        (result, outcomes)
    }

    async fn run_steps(
        &self,
        job: &MigrationJob,
        outcomes: &mut Vec<StepOutcome>,
    ) -> Result<(), MigrationError> {
        self.enter_step(Step::Clone)?;
        let source_credential = match self.credentials.resolve(&job.source_url) {
            Ok(credential) => credential,
            Err(e) => return Err(credential_failure(Step::Clone, e, outcomes)),
        };
        let mut state = match WorkingState::allocate(
            &self.settings.work_root,
            &job.repository_dir_name(),
            source_credential,
        ) {
            Ok(state) => state,
            Err(e) => return Err(abort(outcomes, StepOutcome::fatal(Step::Clone, format!("{e:#}")))),
        };
        debug!("Working directory: {}", state.path().display());

        let result = self.run_steps_in(job, &mut state, outcomes).await;

        let path = state.path().to_path_buf();
        match state.close() {
            Ok(()) => info!("Cleaned up working directory {}", path.display()),
            Err(e) => warn!("{}: {}", e, e.source),
        }

        result
    }

    async fn run_steps_in(
        &self,
        job: &MigrationJob,
        state: &mut WorkingState,
        outcomes: &mut Vec<StepOutcome>,
    ) -> Result<(), MigrationError> {
        let repo = state.repo_path();

        let outcome = self.clone_step(job, state, &repo).await;
        advance(outcomes, outcome)?;

        self.enter_step(Step::PullAllBranches)?;
        let outcome = self.pull_all_branches_step(job, state, &repo).await;
        advance(outcomes, outcome)?;

        self.enter_step(Step::RenameDefaultBranch)?;
        let outcome = self.rename_default_branch_step(job, &repo).await;
        advance(outcomes, outcome)?;

        self.enter_step(Step::SetRemoteUrl)?;
        let outcome = self.set_remote_url_step(job, &repo).await;
        advance(outcomes, outcome)?;

        self.enter_step(Step::MergeRemoteMain)?;
        let credential = match self.destination_credential(job, state) {
            Ok(credential) => credential,
            Err(e) => return Err(credential_failure(Step::MergeRemoteMain, e, outcomes)),
        };
        let outcome = self.merge_remote_main_step(job, &repo, &credential).await;
        advance(outcomes, outcome)?;

        self.enter_step(Step::PushAllBranches)?;
        let outcome = self.push_all_branches_step(job, &repo, &credential).await;
        advance(outcomes, outcome)?;

        self.enter_step(Step::PushAllTags)?;
        let outcome = self.push_all_tags_step(job, &repo, &credential).await;
        advance(outcomes, outcome)?;

        Ok(())
    }

    /// Log step entry, or stop if a shutdown was requested.
    fn enter_step(&self, step: Step) -> Result<(), MigrationError> {
        if self.shutdown.is_requested() {
            warn!("Shutdown requested, stopping before {}", step);
            return Err(MigrationError::Interrupted(step));
        }
        info!("Step {}: {}", step.number(), step);
        Ok(())
    }

    fn destination_credential(
        &self,
        job: &MigrationJob,
        state: &mut WorkingState,
    ) -> Result<Credential, CredentialError> {
        if let Some(credential) = &state.destination_credential {
            return Ok(credential.clone());
        }
        let credential = self.credentials.resolve(&job.destination_url)?;
        state.destination_credential = Some(credential.clone());
        Ok(credential)
    }

    async fn clone_step(&self, job: &MigrationJob, state: &WorkingState, repo: &Path) -> StepOutcome {
        match self
            .git
            .clone_repo(&job.source_url, repo, &state.source_credential)
            .await
        {
            Ok(()) => StepOutcome::succeeded(Step::Clone, format!("cloned to {}", repo.display())),
            Err(e) => StepOutcome::failed(Step::Clone, format!("{e:#}")),
        }
    }

    async fn pull_all_branches_step(
        &self,
        job: &MigrationJob,
        state: &WorkingState,
        repo: &Path,
    ) -> StepOutcome {
        if !job.migrate_all_branches {
            return StepOutcome::skipped(Step::PullAllBranches);
        }
        match self
            .git
            .pull_all_branches(repo, &state.source_credential)
            .await
        {
            Ok(created) if created.is_empty() => {
                StepOutcome::succeeded(Step::PullAllBranches, "no new branches")
            }
            Ok(created) => StepOutcome::succeeded(
                Step::PullAllBranches,
                format!("created {}", created.join(", ")),
            ),
            Err(e) => StepOutcome::failed(Step::PullAllBranches, format!("{e:#}")),
        }
    }

    async fn rename_default_branch_step(&self, job: &MigrationJob, repo: &Path) -> StepOutcome {
        let Some(branch) = job.branch_to_rename() else {
            return StepOutcome::skipped(Step::RenameDefaultBranch);
        };
        match self
            .git
            .rename_branch(repo, branch, RENAMED_DEFAULT_BRANCH)
            .await
        {
            Ok(()) => StepOutcome::succeeded(
                Step::RenameDefaultBranch,
                format!("renamed {} to {}", branch, RENAMED_DEFAULT_BRANCH),
            ),
            Err(e) => StepOutcome::failed(Step::RenameDefaultBranch, format!("{e:#}")),
        }
    }

    async fn set_remote_url_step(&self, job: &MigrationJob, repo: &Path) -> StepOutcome {
        match self.git.set_remote_url(repo, &job.destination_url).await {
            Ok(()) => StepOutcome::succeeded(
                Step::SetRemoteUrl,
                format!("origin is {}", redact_credentials(&job.destination_url)),
            ),
            Err(e) => StepOutcome::failed(Step::SetRemoteUrl, format!("{e:#}")),
        }
    }

    async fn merge_remote_main_step(
        &self,
        job: &MigrationJob,
        repo: &Path,
        credential: &Credential,
    ) -> StepOutcome {
        match self
            .git
            .merge_remote_default(
                repo,
                CANONICAL_DEFAULT_BRANCH,
                &job.commit_message,
                credential,
            )
            .await
        {
            Ok(outcome) => StepOutcome::succeeded(Step::MergeRemoteMain, outcome.to_string()),
            Err(e) => StepOutcome::failed(Step::MergeRemoteMain, format!("{e:#}")),
        }
    }

    async fn push_all_branches_step(
        &self,
        job: &MigrationJob,
        repo: &Path,
        credential: &Credential,
    ) -> StepOutcome {
        if !job.migrate_all_branches {
            return StepOutcome::skipped(Step::PushAllBranches);
        }
        match self.git.push_all_branches(repo, credential).await {
            Ok(()) => StepOutcome::succeeded(Step::PushAllBranches, "pushed all branches"),
            Err(e) => StepOutcome::failed(Step::PushAllBranches, format!("{e:#}")),
        }
    }

    async fn push_all_tags_step(
        &self,
        job: &MigrationJob,
        repo: &Path,
        credential: &Credential,
    ) -> StepOutcome {
        if !job.migrate_tags {
            return StepOutcome::skipped(Step::PushAllTags);
        }
        match self.git.push_all_tags(repo, credential).await {
            Ok(0) => StepOutcome::succeeded(Step::PushAllTags, "no tags to push"),
            Ok(count) => StepOutcome::succeeded(Step::PushAllTags, format!("pushed {} tags", count)),
            Err(e) => StepOutcome::failed(Step::PushAllTags, format!("{e:#}")),
        }
    }
}

/// Log a step's exit and record it. A fatal outcome ends the job.
fn advance(outcomes: &mut Vec<StepOutcome>, outcome: StepOutcome) -> Result<(), MigrationError> {
    if outcome.is_fatal() {
        return Err(abort(outcomes, outcome));
    }

    let step = outcome.step;
    let message = outcome.message.as_deref().map(redact_credentials);
    match outcome.status {
        StepStatus::Skipped => info!("{} skipped", step),
        StepStatus::FailedRecoverable => warn!(
            "{} failed, continuing: {}",
            step,
            message.unwrap_or_default()
        ),
        _ => info!("{} done: {}", step, message.unwrap_or_default()),
    }

    outcomes.push(outcome);
    Ok(())
}

fn abort(outcomes: &mut Vec<StepOutcome>, outcome: StepOutcome) -> MigrationError {
    let step = outcome.step;
    let message = outcome
        .message
        .as_deref()
        .map(redact_credentials)
        .unwrap_or_default();
    error!("{} failed: {}", step, message);
    outcomes.push(outcome);
    MigrationError::GitOperation { step, message }
}

/// Record a credential failure as fatal to `step`.
fn credential_failure(
    step: Step,
    error: CredentialError,
    outcomes: &mut Vec<StepOutcome>,
) -> MigrationError {
    error!("{} failed: {}", step, error);
    outcomes.push(StepOutcome::fatal(step, error.to_string()));
    MigrationError::Credential(error)
}
