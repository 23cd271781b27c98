use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// Branch name the destination is expected to use as its default.
pub const CANONICAL_DEFAULT_BRANCH: &str = "main";

/// Name a differently-named source default branch is moved to, so it does
/// not shadow the destination's default branch.
pub const RENAMED_DEFAULT_BRANCH: &str = "old-main";

/// One source-to-destination repository migration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationJob {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub source_url: String,
    #[serde(default)]
    pub destination_url: String,
    #[serde(default)]
    pub commit_message: String,
    #[serde(default, rename = "defaultBranch")]
    pub default_branch_name: Option<String>,
    #[serde(default = "default_true")]
    pub migrate_all_branches: bool,
    #[serde(default = "default_true")]
    pub migrate_tags: bool,
}

fn default_true() -> bool {
    true
}

impl MigrationJob {
    pub fn new(name: &str, source_url: &str, destination_url: &str, commit_message: &str) -> Self {
        Self {
            name: name.to_string(),
            source_url: source_url.to_string(),
            destination_url: destination_url.to_string(),
            commit_message: commit_message.to_string(),
            default_branch_name: None,
            migrate_all_branches: true,
            migrate_tags: true,
        }
    }

    /// The branch to move out of the way, if the configured default branch
    /// differs from [`CANONICAL_DEFAULT_BRANCH`].
    pub fn branch_to_rename(&self) -> Option<&str> {
        self.default_branch_name
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty() && *b != CANONICAL_DEFAULT_BRANCH)
    }

    /// Directory name for the clone, taken from the last path segment of the
    /// source URL.
    pub fn repository_dir_name(&self) -> String {
        let from_url = url::Url::parse(&self.source_url).ok().and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.rfind(|s| !s.is_empty()).map(str::to_string))
        });
        let raw = from_url.unwrap_or_else(|| self.name.clone());
        let trimmed = raw.strip_suffix(".git").unwrap_or(&raw);
        let sanitized: String = trimmed
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
            "repo".to_string()
        } else {
            sanitized
        }
    }
}

/// Final record of one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationResult {
    pub job_name: String,
    pub success: bool,
    pub error_message: Option<String>,
    pub completed_at: DateTime<Utc>,
}

impl MigrationResult {
    pub fn succeeded(job_name: &str) -> Self {
        Self {
            job_name: job_name.to_string(),
            success: true,
            error_message: None,
            completed_at: Utc::now(),
        }
    }

    pub fn failed(job_name: &str, error_message: impl Into<String>) -> Self {
        Self {
            job_name: job_name.to_string(),
            success: false,
            error_message: Some(error_message.into()),
            completed_at: Utc::now(),
        }
    }
}

/// Aggregate of a batch run, results in job input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<MigrationResult>,
}

impl BatchSummary {
    pub fn from_results(results: Vec<MigrationResult>) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            results,
        }
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &MigrationResult> {
        self.results.iter().filter(|r| !r.success)
    }
}
