use sha2::{Digest, Sha256};
use time::OffsetDateTime;

/// A credential found by the scanner at a specific line of a commit
#[derive(Debug, Clone, PartialEq)]
pub struct Credential {
    pub owner: String,
    pub repository: String,
    pub sha: String,
    pub path: String,
    pub line_number: i64,
    pub match_start: i64,
    pub match_end: i64,
    pub private: bool,
    /// Scan that produced this finding, once persisted
    pub scan_id: Option<i64>,
    pub created_at: OffsetDateTime,
}

impl Credential {
    pub fn new(
        owner: impl Into<String>,
        repository: impl Into<String>,
        sha: impl Into<String>,
        path: impl Into<String>,
        line_number: i64,
    ) -> Self {
        Self {
            owner: owner.into(),
            repository: repository.into(),
            sha: sha.into(),
            path: path.into(),
            line_number,
            match_start: 0,
            match_end: 0,
            private: false,
            scan_id: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    /// Content identity of the finding.
    ///
    /// Covers owner, repository, sha, path and line number only, so the same
    /// leak found by two different scans hashes identically regardless of when
    /// it was stored or which row it lives in.
    pub fn hash(&self) -> String {
        let mut hasher = Sha256::new();
        for field in [
            self.owner.as_bytes(),
            self.repository.as_bytes(),
            self.sha.as_bytes(),
            self.path.as_bytes(),
            self.line_number.to_string().as_bytes(),
        ] {
            hasher.update(field);
            hasher.update([0u8]);
        }
        hex::encode(hasher.finalize())
    }
}
