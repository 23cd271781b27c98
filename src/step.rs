use std::fmt::Display;

/// A stage of the per-repository migration sequence, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Clone,
    PullAllBranches,
    RenameDefaultBranch,
    SetRemoteUrl,
    MergeRemoteMain,
    PushAllBranches,
    PushAllTags,
}

/// What a failed step does to the rest of the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Stop the job.
    Fatal,
    /// Log and carry on with the next step.
    Recoverable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Succeeded,
    Skipped,
    FailedFatal,
    FailedRecoverable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub step: Step,
    pub status: StepStatus,
    pub message: Option<String>,
}

impl Step {
    pub const ALL: [Step; 7] = [
        Step::Clone,
        Step::PullAllBranches,
        Step::RenameDefaultBranch,
        Step::SetRemoteUrl,
        Step::MergeRemoteMain,
        Step::PushAllBranches,
        Step::PushAllTags,
    ];

    /// Failure policy per step. Only the clone, the remote update and the
    /// branch push stop a job.
    pub fn severity(self) -> Severity {
        match self {
            Step::Clone | Step::SetRemoteUrl | Step::PushAllBranches => Severity::Fatal,
            Step::PullAllBranches
            | Step::RenameDefaultBranch
            | Step::MergeRemoteMain
            | Step::PushAllTags => Severity::Recoverable,
        }
    }

    /// 1-based position in the sequence, used in log lines.
    pub fn number(self) -> usize {
        Self::ALL.iter().position(|s| *s == self).unwrap_or(0) + 1
    }
}

impl Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Step::Clone => "Clone",
            Step::PullAllBranches => "PullAllBranches",
            Step::RenameDefaultBranch => "RenameDefaultBranch",
            Step::SetRemoteUrl => "SetRemoteURL",
            Step::MergeRemoteMain => "MergeRemoteMain",
            Step::PushAllBranches => "PushAllBranches",
            Step::PushAllTags => "PushAllTags",
        })
    }
}

impl StepOutcome {
    pub fn succeeded(step: Step, message: impl Into<String>) -> Self {
        Self {
            step,
            status: StepStatus::Succeeded,
            message: Some(message.into()),
        }
    }

    pub fn skipped(step: Step) -> Self {
        Self {
            step,
            status: StepStatus::Skipped,
            message: None,
        }
    }

    /// A failed step, classified by the step's severity.
    pub fn failed(step: Step, message: impl Into<String>) -> Self {
        let status = match step.severity() {
            Severity::Fatal => StepStatus::FailedFatal,
            Severity::Recoverable => StepStatus::FailedRecoverable,
        };
        Self {
            step,
            status,
            message: Some(message.into()),
        }
    }

    /// A failure that aborts the job whatever the step's usual policy.
    pub fn fatal(step: Step, message: impl Into<String>) -> Self {
        Self {
            step,
            status: StepStatus::FailedFatal,
            message: Some(message.into()),
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.status == StepStatus::FailedFatal
    }
}
