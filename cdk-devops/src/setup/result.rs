//! Setup step and result types.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// The steps of a repository setup, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SetupStep {
    CreateRepository,
    PushContent,
    CreatePipelines,
    BranchPolicy,
    PreCommitHook,
}

impl SetupStep {
    /// Every step, in execution order.
    pub const ALL: [Self; 5] = [
        Self::CreateRepository,
        Self::PushContent,
        Self::CreatePipelines,
        Self::BranchPolicy,
        Self::PreCommitHook,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateRepository => "create_repository",
            Self::PushContent => "push_content",
            Self::CreatePipelines => "create_pipelines",
            Self::BranchPolicy => "branch_policy",
            Self::PreCommitHook => "pre_commit_hook",
        }
    }
}

impl fmt::Display for SetupStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a finished step did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    /// The step made its change.
    Completed,

    /// Nothing needed doing.
    Skipped {
        /// Reason for skipping.
        reason: String,
    },
}

impl StepOutcome {
    pub(crate) fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Skipped { .. } => "skipped",
        }
    }
}

/// Outcome of one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub step: SetupStep,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

/// Result of a successful repository setup.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SetupResult {
    /// Id of the created or existing repository.
    pub repository_id: String,
    /// Pipeline id per stage, created or already present.
    pub pipelines: BTreeMap<String, u64>,
    /// Outcome of each step, in execution order.
    pub steps: Vec<StepReport>,
}

impl SetupResult {
    /// Returns the outcome of `step`, if it ran.
    #[must_use]
    pub fn outcome(&self, step: SetupStep) -> Option<&StepOutcome> {
        self.steps
            .iter()
            .find(|report| report.step == step)
            .map(|report| &report.outcome)
    }

    pub(crate) fn record(&mut self, step: SetupStep, outcome: StepOutcome) {
        self.steps.push(StepReport { step, outcome });
    }
}
