/// Store failures callers are expected to tell apart from transport errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("repository {owner}/{name} not found")]
    RepositoryNotFound { owner: String, name: String },
}

impl StoreError {
    pub fn repository_not_found(owner: &str, name: &str) -> Self {
        Self::RepositoryNotFound {
            owner: owner.to_string(),
            name: name.to_string(),
        }
    }

    /// Whether `err` is, or wraps, a not-found failure
    pub fn is_not_found(err: &anyhow::Error) -> bool {
        matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::RepositoryNotFound { .. })
        )
    }
}
