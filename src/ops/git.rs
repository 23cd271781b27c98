#![allow(async_fn_in_trait)]

use std::collections::HashSet;
use std::ffi::OsStr;
use std::fmt::Display;
use std::path::Path;
use std::process::Output;
use std::process::Stdio;
use std::time::Duration;

use anyhow::Context;
use anyhow::Result;
use anyhow::anyhow;
use anyhow::bail;
#[cfg(test)]
use mockall::automock;
use tokio::process::Command;
use tracing::debug;
use tracing::instrument;
use tracing::warn;

use super::credentials::Credential;
use crate::redact::redact_credentials;

const REMOTE: &str = "origin";

// -----------------------------------------------------------------------------
// GitOps trait

/// One operation per migration step, each run against a working directory.
///
/// An `Err` carries the diagnostic text of the failed git action.
#[cfg_attr(test, automock)]
pub trait GitOps {
    /// Clone `url` into `dest`, which must not exist or be empty.
    async fn clone_repo(&self, url: &str, dest: &Path, credential: &Credential) -> Result<()>;

    /// Create a local tracking branch for every remote branch.
    /// Returns the names of the branches created.
    async fn pull_all_branches(&self, repo: &Path, credential: &Credential) -> Result<Vec<String>>;

    async fn rename_branch(&self, repo: &Path, from: &str, to: &str) -> Result<()>;

    /// Point the primary remote at `url`, adding the remote if it is missing.
    async fn set_remote_url(&self, repo: &Path, url: &str) -> Result<()>;

    /// Fetch the remote's `branch` and merge it into `HEAD`, resolving every
    /// conflict in favour of the incoming side, as one commit with `message`.
    async fn merge_remote_default(
        &self,
        repo: &Path,
        branch: &str,
        message: &str,
        credential: &Credential,
    ) -> Result<MergeOutcome>;

    /// Push every local branch to the primary remote.
    async fn push_all_branches(&self, repo: &Path, credential: &Credential) -> Result<()>;

    /// Push all tags. Returns the number of local tags, zero meaning nothing
    /// was pushed.
    async fn push_all_tags(&self, repo: &Path, credential: &Credential) -> Result<usize>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// A merge commit was created.
    Merged,
    /// The remote branch was already contained in `HEAD`; no commit.
    UpToDate,
    /// The remote has no such branch; nothing was done.
    NoRemoteBranch,
}

impl Display for MergeOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Merged => f.write_str("merged"),
            Self::UpToDate => f.write_str("already up to date"),
            Self::NoRemoteBranch => f.write_str("remote branch not found, skipped"),
        }
    }
}

// -----------------------------------------------------------------------------
// RealGit

/// Real implementation that calls the git CLI
pub struct RealGit {
    timeout: Option<Duration>,
    author_name: String,
    author_email: String,
}

impl Default for RealGit {
    fn default() -> Self {
        Self {
            timeout: None,
            author_name: "Repository Migration".to_string(),
            author_email: "migration@localhost".to_string(),
        }
    }
}

impl RealGit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail any single git command that runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Spawn git and wait for it, without interpreting the exit status.
    ///
    /// The credential travels as an `http.extraHeader` set through
    /// `GIT_CONFIG_*` variables so it never lands in argv or `.git/config`.
    async fn output<I, S>(
        &self,
        repo: Option<&Path>,
        args: I,
        credential: Option<&Credential>,
    ) -> Result<(String, Output)>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<_> = args.into_iter().map(|a| a.as_ref().to_owned()).collect();
        let subcommand = args
            .first()
            .map(|a| a.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut command = Command::new("git");
        command
            .args(&args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("GIT_AUTHOR_NAME", &self.author_name)
            .env("GIT_AUTHOR_EMAIL", &self.author_email)
            .env("GIT_COMMITTER_NAME", &self.author_name)
            .env("GIT_COMMITTER_EMAIL", &self.author_email)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if let Some(repo) = repo {
            command.current_dir(repo);
        }
        if let Some(credential) = credential {
            command
                .env("GIT_CONFIG_COUNT", "1")
                .env("GIT_CONFIG_KEY_0", "http.extraHeader")
                .env("GIT_CONFIG_VALUE_0", credential.basic_auth_header());
        }

        debug!("git {}", subcommand);
        let output = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, command.output())
                .await
                .map_err(|_| anyhow!("git {} timed out after {:?}", subcommand, timeout))?,
            None => command.output().await,
        }
        .context("Failed to execute git command")?;

        Ok((subcommand, output))
    }

    /// Run git and return its trimmed stdout, failing on a non-zero exit.
    async fn run<I, S>(
        &self,
        repo: Option<&Path>,
        args: I,
        credential: Option<&Credential>,
    ) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let (subcommand, output) = self.output(repo, args, credential).await?;

        if !output.status.success() {
            bail!(
                "git {} failed: {}",
                subcommand,
                redact_credentials(String::from_utf8_lossy(&output.stderr).trim())
            );
        }

        Ok(String::from_utf8(output.stdout)?.trim().to_string())
    }

    async fn list_refs(&self, repo: &Path, prefix: &str) -> Result<Vec<String>> {
        let output = self
            .run(
                Some(repo),
                ["for-each-ref", "--format=%(refname:short)", prefix],
                None,
            )
            .await?;
        Ok(output.lines().map(|l| l.trim().to_string()).collect())
    }

    /// Check if `commit` is reachable from `descendant`.
    async fn is_ancestor(&self, repo: &Path, commit: &str, descendant: &str) -> Result<bool> {
        let (_, output) = self
            .output(
                Some(repo),
                ["merge-base", "--is-ancestor", commit, descendant],
                None,
            )
            .await?;

        // Exit code 0 means it is an ancestor, 1 means it's not
        match output.status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => bail!(
                "git merge-base failed: {}",
                redact_credentials(String::from_utf8_lossy(&output.stderr).trim())
            ),
        }
    }

    async fn abort_merge(&self, repo: &Path) -> Result<()> {
        self.run(Some(repo), ["merge", "--abort"], None).await?;
        Ok(())
    }

    /// Take the incoming side of every path still conflicted after a merge
    /// and conclude the merge.
    async fn resolve_conflicts_with_theirs(&self, repo: &Path, message: &str) -> Result<usize> {
        let conflicted = self
            .run(Some(repo), ["diff", "--name-only", "--diff-filter=U"], None)
            .await?;
        let paths: Vec<&str> = conflicted.lines().filter(|l| !l.is_empty()).collect();
        if paths.is_empty() {
            bail!("merge stopped without conflicting paths");
        }

        for &path in &paths {
            let took_theirs = self
                .run(Some(repo), ["checkout", "--theirs", "--", path], None)
                .await;
            match took_theirs {
                Ok(_) => {
                    self.run(Some(repo), ["add", "--", path], None).await?;
                }
                // The incoming side deleted the path.
                Err(_) => {
                    self.run(Some(repo), ["rm", "--quiet", "--", path], None)
                        .await?;
                }
            }
        }

        self.run(Some(repo), ["commit", "--no-verify", "-m", message], None)
            .await?;
        Ok(paths.len())
    }
}

impl GitOps for RealGit {
    #[instrument(skip_all)]
    async fn clone_repo(&self, url: &str, dest: &Path, credential: &Credential) -> Result<()> {
        self.run(
            None,
            [
                OsStr::new("clone"),
                OsStr::new("--no-progress"),
                OsStr::new(url),
                dest.as_os_str(),
            ],
            Some(credential),
        )
        .await?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn pull_all_branches(&self, repo: &Path, credential: &Credential) -> Result<Vec<String>> {
        self.run(Some(repo), ["fetch", "--all", "--prune"], Some(credential))
            .await?;

        let local: HashSet<String> = self
            .list_refs(repo, "refs/heads")
            .await?
            .into_iter()
            .collect();
        let remote_prefix = format!("{}/", REMOTE);

        let mut created = Vec::new();
        for remote_branch in self
            .list_refs(repo, &format!("refs/remotes/{}", REMOTE))
            .await?
        {
            // origin/HEAD is listed as "origin" by recent versions of git
            let Some(branch) = remote_branch.strip_prefix(&remote_prefix) else {
                continue;
            };
            if branch == "HEAD" || local.contains(branch) {
                continue;
            }
            self.run(
                Some(repo),
                ["branch", "--track", branch, remote_branch.as_str()],
                None,
            )
            .await?;
            created.push(branch.to_string());
        }

        Ok(created)
    }

    #[instrument(skip_all)]
    async fn rename_branch(&self, repo: &Path, from: &str, to: &str) -> Result<()> {
        self.run(Some(repo), ["branch", "-m", from, to], None)
            .await?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn set_remote_url(&self, repo: &Path, url: &str) -> Result<()> {
        let remotes = self.run(Some(repo), ["remote"], None).await?;
        let action = if remotes.lines().any(|r| r.trim() == REMOTE) {
            "set-url"
        } else {
            "add"
        };
        self.run(Some(repo), ["remote", action, REMOTE, url], None)
            .await?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn merge_remote_default(
        &self,
        repo: &Path,
        branch: &str,
        message: &str,
        credential: &Credential,
    ) -> Result<MergeOutcome> {
        let remote_ref = format!("refs/heads/{}", branch);
        let heads = self
            .run(
                Some(repo),
                ["ls-remote", "--heads", REMOTE, remote_ref.as_str()],
                Some(credential),
            )
            .await?;
        if heads.is_empty() {
            return Ok(MergeOutcome::NoRemoteBranch);
        }

        let incoming = format!("refs/remotes/{}/{}", REMOTE, branch);
        let refspec = format!("+{}:{}", remote_ref, incoming);
        self.run(
            Some(repo),
            ["fetch", "--no-tags", REMOTE, refspec.as_str()],
            Some(credential),
        )
        .await?;

        if self.is_ancestor(repo, &incoming, "HEAD").await? {
            return Ok(MergeOutcome::UpToDate);
        }

        let (_, merge) = self
            .output(
                Some(repo),
                [
                    "merge",
                    "--no-ff",
                    "--no-verify",
                    "--allow-unrelated-histories",
                    "-X",
                    "theirs",
                    "-m",
                    message,
                    incoming.as_str(),
                ],
                None,
            )
            .await?;
        if merge.status.success() {
            return Ok(MergeOutcome::Merged);
        }

        match self.resolve_conflicts_with_theirs(repo, message).await {
            Ok(resolved) => {
                warn!("Resolved {} conflicting paths with the incoming version", resolved);
                Ok(MergeOutcome::Merged)
            }
            Err(e) => {
                // Leave the working tree as it was before the merge.
                if let Err(abort) = self.abort_merge(repo).await {
                    warn!("Repository left mid-merge: {:#}", abort);
                }
                Err(e.context(format!(
                    "git merge failed: {}",
                    redact_credentials(String::from_utf8_lossy(&merge.stderr).trim())
                )))
            }
        }
    }

    #[instrument(skip_all)]
    async fn push_all_branches(&self, repo: &Path, credential: &Credential) -> Result<()> {
        self.run(Some(repo), ["push", "--all", REMOTE], Some(credential))
            .await?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn push_all_tags(&self, repo: &Path, credential: &Credential) -> Result<usize> {
        let tags = self.list_refs(repo, "refs/tags").await?;
        let count = tags.iter().filter(|t| !t.is_empty()).count();
        if count == 0 {
            return Ok(0);
        }

        self.run(Some(repo), ["push", "--tags", REMOTE], Some(credential))
            .await?;
        Ok(count)
    }
}
