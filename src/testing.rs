//! Shared fixtures for unit tests.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use anyhow::bail;

use crate::App;
use crate::app::RunSettings;
use crate::model::MigrationJob;
use crate::ops::credentials::Credential;
use crate::ops::credentials::CredentialResolver;
use crate::ops::credentials::MockCredentialResolver;
use crate::ops::git::GitOps;
use crate::ops::git::MergeOutcome;
use crate::ops::git::MockGitOps;
use crate::step::Step;

pub fn job(name: &str) -> MigrationJob {
    MigrationJob::new(
        name,
        &format!("https://dev.azure.com/org/project/_git/{}", name),
        &format!("https://github.com/org/{}.git", name),
        &format!("Migrate {}", name),
    )
}

/// A resolver that hands out a dummy credential for any URL.
pub fn credentials() -> MockCredentialResolver {
    let mut credentials = MockCredentialResolver::new();
    credentials
        .expect_resolve()
        .returning(|_| Ok(Credential::new("token", "secret")));
    credentials
}

/// A git mock on which every operation succeeds, except `failing`.
pub fn scripted_git(failing: Option<Step>) -> MockGitOps {
    let fails = move |step: Step| failing == Some(step);
    let mut git = MockGitOps::new();
    git.expect_clone_repo().returning(move |_, dest, _| {
        if fails(Step::Clone) {
            bail!("git clone failed: repository not found");
        }
        std::fs::create_dir_all(dest)?;
        Ok(())
    });
    git.expect_pull_all_branches().returning(move |_, _| {
        if fails(Step::PullAllBranches) {
            bail!("git fetch failed: early EOF");
        }
        Ok(vec!["develop".to_string()])
    });
    git.expect_rename_branch().returning(move |_, _, _| {
        if fails(Step::RenameDefaultBranch) {
            bail!("git branch failed: no branch named 'master'");
        }
        Ok(())
    });
    git.expect_set_remote_url().returning(move |_, _| {
        if fails(Step::SetRemoteUrl) {
            bail!("git remote failed: could not lock config file");
        }
        Ok(())
    });
    git.expect_merge_remote_default()
        .returning(move |_, _, _, _| {
            if fails(Step::MergeRemoteMain) {
                bail!("git merge failed: refusing to merge");
            }
            Ok(MergeOutcome::Merged)
        });
    git.expect_push_all_branches().returning(move |_, _| {
        if fails(Step::PushAllBranches) {
            bail!("git push failed: permission denied");
        }
        Ok(())
    });
    git.expect_push_all_tags().returning(move |_, _| {
        if fails(Step::PushAllTags) {
            bail!("git push failed: tag already exists");
        }
        Ok(2)
    });
    git
}

/// Clones successfully, then panics while merging.
pub struct PanickingGit;

impl GitOps for PanickingGit {
    async fn clone_repo(&self, _url: &str, dest: &Path, _credential: &Credential) -> Result<()> {
        std::fs::create_dir_all(dest)?;
        std::fs::write(dest.join("README.md"), "cloned")?;
        Ok(())
    }

    async fn pull_all_branches(&self, _repo: &Path, _credential: &Credential) -> Result<Vec<String>> {
        Ok(vec![])
    }

    async fn rename_branch(&self, _repo: &Path, _from: &str, _to: &str) -> Result<()> {
        Ok(())
    }

    async fn set_remote_url(&self, _repo: &Path, _url: &str) -> Result<()> {
        Ok(())
    }

    async fn merge_remote_default(
        &self,
        _repo: &Path,
        _branch: &str,
        _message: &str,
        _credential: &Credential,
    ) -> Result<MergeOutcome> {
        panic!("index corrupted");
    }

    async fn push_all_branches(&self, _repo: &Path, _credential: &Credential) -> Result<()> {
        Ok(())
    }

    async fn push_all_tags(&self, _repo: &Path, _credential: &Credential) -> Result<usize> {
        Ok(0)
    }
}

pub fn app<G: GitOps, C: CredentialResolver>(git: G, credentials: C, work_root: &Path) -> App<G, C> {
    App::new(
        git,
        credentials,
        RunSettings {
            work_root: work_root.to_path_buf(),
            job_delay: Duration::ZERO,
        },
    )
}

pub fn is_empty(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(true)
}
