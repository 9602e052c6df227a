//! Incremental credential scanning of repository history.
//!
//! - [`ancestry`] decomposes a commit graph into bounded, queued scan tasks
//! - [`rescan`] re-runs stale scans under new rules and reports only new findings
//! - [`store`] keeps the commit registry and repository fetch/scan bookkeeping

pub mod ancestry;
pub mod git;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod notify;
pub mod queue;
pub mod rescan;
pub mod store;
pub mod util;
