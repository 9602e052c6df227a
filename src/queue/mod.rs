//! Queue contract
//!
//! Work is handed to the queue as [`Task`]s built from a plan and a freshly
//! generated id. Delivery is at-least-once and enqueueing is not transactional
//! with anything else the caller does, so consumers must tolerate duplicates.

mod adapters;
mod plan;

pub use adapters::{JsonLinesQueue, MemoryQueue};
pub use plan::{AncestryScanPlan, DiffScanPlan, RefScanPlan, Task, TaskPlan};

use anyhow::Result;
use uuid::Uuid;

/// Destination for follow-on work
#[allow(async_fn_in_trait)]
pub trait TaskQueue {
    async fn enqueue(&self, task: Task) -> Result<()>;
}

/// Source of task ids
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Random v4 UUIDs
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}
