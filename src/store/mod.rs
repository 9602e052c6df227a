mod commits;
mod database;
mod error;
mod repositories;
mod scans;

pub use commits::CommitRegistry;
pub use database::Database;
pub use error::StoreError;

/// Bumped whenever the table layout changes; a mismatch rebuilds the store
pub const SCHEMA_VERSION: &str = "1";

/// Consecutive failed fetches after which a repository is disabled
pub const FAILED_FETCH_THRESHOLD: i64 = 3;
