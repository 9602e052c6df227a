use serde_json::Value;
use time::OffsetDateTime;

/// A source repository tracked for fetching and scanning
#[derive(Debug, Clone, PartialEq)]
pub struct Repository {
    pub id: i64,
    pub owner: String,
    pub name: String,
    /// Location of the local clone on disk
    pub path: String,
    pub ssh_url: String,
    pub private: bool,
    pub default_branch: String,
    /// Upstream metadata as received from the hosting platform
    pub raw_json: Value,
    pub cloned: bool,
    pub disabled: bool,
    pub failed_fetches: i64,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Repository {
    /// `owner/name`, for display and log fields
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// Insert shape for a newly discovered repository
#[derive(Debug, Clone)]
pub struct NewRepository {
    pub owner: String,
    pub name: String,
    pub path: String,
    pub ssh_url: String,
    pub private: bool,
    pub default_branch: String,
    pub raw_json: Value,
    pub cloned: bool,
    pub failed_fetches: i64,
}

impl NewRepository {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            path: String::new(),
            ssh_url: String::new(),
            private: false,
            default_branch: "master".to_string(),
            raw_json: Value::Null,
            cloned: false,
            failed_fetches: 0,
        }
    }
}

/// A recorded fetch of a repository's remote
#[derive(Debug, Clone)]
pub struct Fetch {
    pub id: i64,
    pub repository_id: i64,
    /// Opaque summary of the refs that moved
    pub changes: Value,
    pub created_at: OffsetDateTime,
}
