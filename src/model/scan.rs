use time::OffsetDateTime;

/// Kind of scan that produced a scan record
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ScanType {
    /// Changes between two commits
    Diff,
    /// Everything reachable from a single commit
    Ref,
    /// Re-evaluation of an earlier scan under newer rules
    Rescan,
}

impl ScanType {
    pub fn as_str(self) -> &'static str {
        match self {
            ScanType::Diff => "diff-scan",
            ScanType::Ref => "ref-scan",
            ScanType::Rescan => "rescan",
        }
    }
}

/// Insert shape for a completed scan
#[derive(Debug, Clone)]
pub struct NewScan {
    pub owner: String,
    pub repository: String,
    pub rules_version: i64,
    pub scan_type: ScanType,
    pub branch: String,
    /// Exclusive lower bound; empty for a ref scan
    pub start_sha: String,
    /// Inclusive upper bound
    pub stop_sha: String,
    pub scan_start: OffsetDateTime,
    pub scan_end: OffsetDateTime,
}

/// A stored scan as seen by the rescanner
#[derive(Debug, Clone, PartialEq)]
pub struct PriorScan {
    pub id: i64,
    pub owner: String,
    pub repository: String,
    pub rules_version: i64,
    pub branch: String,
    pub start_sha: String,
    pub stop_sha: String,
}

/// A commit the ancestry walker has fully processed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub owner: String,
    pub repository: String,
    pub sha: String,
}

impl Commit {
    pub fn new(owner: impl Into<String>, repository: impl Into<String>, sha: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repository: repository.into(),
            sha: sha.into(),
        }
    }
}
