//! Notification boundary

use anyhow::Result;
use serde::Serialize;

use crate::model::Credential;

/// One newly discovered credential, as delivered to subscribers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub owner: String,
    pub repository: String,
    pub sha: String,
    pub path: String,
    pub line_number: i64,
    pub private: bool,
}

impl From<&Credential> for Notification {
    fn from(credential: &Credential) -> Self {
        Self {
            owner: credential.owner.clone(),
            repository: credential.repository.clone(),
            sha: credential.sha.clone(),
            path: credential.path.clone(),
            line_number: credential.line_number,
            private: credential.private,
        }
    }
}

/// Delivers batches of notifications to whoever is interested
#[allow(async_fn_in_trait)]
pub trait Router {
    async fn deliver(&self, batch: &[Notification]) -> Result<()>;
}
