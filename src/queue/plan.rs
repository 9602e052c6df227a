//! Task plans: immutable descriptions of queued work

use serde::{Deserialize, Serialize};

/// Walk one commit's ancestry, `depth` more generations at most
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AncestryScanPlan {
    pub owner: String,
    pub repository: String,
    pub sha: String,
    pub depth: i64,
    /// Unix seconds of the commit, when known (diagnostics only)
    #[serde(default)]
    pub commit_timestamp: i64,
}

/// Scan the changes between two commits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffScanPlan {
    pub owner: String,
    pub repository: String,
    pub from: String,
    pub to: String,
}

/// Scan everything reachable at a single ref, with no baseline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefScanPlan {
    pub owner: String,
    pub repository: String,
    #[serde(rename = "ref")]
    pub git_ref: String,
}

/// The closed set of plans a worker may receive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum TaskPlan {
    AncestryScan(AncestryScanPlan),
    DiffScan(DiffScanPlan),
    RefScan(RefScanPlan),
}

impl TaskPlan {
    /// Wire name of the plan type
    pub fn kind(&self) -> &'static str {
        match self {
            TaskPlan::AncestryScan(_) => "ancestry-scan",
            TaskPlan::DiffScan(_) => "diff-scan",
            TaskPlan::RefScan(_) => "ref-scan",
        }
    }

    pub fn task(self, id: impl Into<String>) -> Task {
        Task { id: id.into(), plan: self }
    }
}

impl AncestryScanPlan {
    pub fn task(&self, id: impl Into<String>) -> Task {
        TaskPlan::AncestryScan(self.clone()).task(id)
    }
}

impl DiffScanPlan {
    pub fn task(&self, id: impl Into<String>) -> Task {
        TaskPlan::DiffScan(self.clone()).task(id)
    }
}

impl RefScanPlan {
    pub fn task(&self, id: impl Into<String>) -> Task {
        TaskPlan::RefScan(self.clone()).task(id)
    }
}

/// A plan paired with the unique id it is queued under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(flatten)]
    pub plan: TaskPlan,
}

impl Task {
    pub fn kind(&self) -> &'static str {
        self.plan.kind()
    }
}
