mod credential;
mod repository;
mod scan;

pub use credential::Credential;
pub use repository::{Fetch, NewRepository, Repository};
pub use scan::{Commit, NewScan, PriorScan, ScanType};
