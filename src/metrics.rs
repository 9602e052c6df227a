//! Counter metrics
//!
//! Components receive an [`Emitter`] at construction and ask it for named
//! counters, so nothing touches global state.

use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::info;

pub const MAX_DEPTH_REACHED: &str = "credwalk.max-depth-reached";
pub const INITIAL_COMMIT_SCANNED: &str = "credwalk.initial-commit-scanned";
pub const RESCAN_SUCCESS: &str = "credwalk.rescanner.success";
pub const RESCAN_FAILED: &str = "credwalk.rescanner.failed";

/// A monotonic counter
pub trait Counter: Send + Sync {
    fn inc(&self);
}

/// Factory for named counters
pub trait Emitter: Send + Sync {
    fn counter(&self, name: &str) -> Box<dyn Counter>;
}

/// Emits a tracing event per increment
pub struct LogEmitter;

impl Emitter for LogEmitter {
    fn counter(&self, name: &str) -> Box<dyn Counter> {
        Box::new(LogCounter(name.to_string()))
    }
}

struct LogCounter(String);

impl Counter for LogCounter {
    fn inc(&self) {
        info!(counter = %self.0, "counter-incremented");
    }
}

/// Keeps counts in process; cheap to clone, clones share counts
#[derive(Clone, Default)]
pub struct MemoryEmitter {
    counters: Arc<Mutex<FxHashMap<String, Arc<AtomicU64>>>>,
}

impl MemoryEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a counter; zero if it was never created
    pub fn value(&self, name: &str) -> u64 {
        self.slot_if_present(name)
            .map(|slot| slot.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// All counters sorted by name
    pub fn snapshot(&self) -> Vec<(String, u64)> {
        let counters = match self.counters.lock() {
            Ok(counters) => counters,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut values: Vec<(String, u64)> = counters
            .iter()
            .map(|(name, slot)| (name.clone(), slot.load(Ordering::Relaxed)))
            .collect();
        values.sort();
        values
    }

    fn slot_if_present(&self, name: &str) -> Option<Arc<AtomicU64>> {
        let counters = match self.counters.lock() {
            Ok(counters) => counters,
            Err(poisoned) => poisoned.into_inner(),
        };
        counters.get(name).cloned()
    }

    fn slot(&self, name: &str) -> Arc<AtomicU64> {
        let mut counters = match self.counters.lock() {
            Ok(counters) => counters,
            Err(poisoned) => poisoned.into_inner(),
        };
        counters.entry(name.to_string()).or_default().clone()
    }
}

impl Emitter for MemoryEmitter {
    fn counter(&self, name: &str) -> Box<dyn Counter> {
        Box::new(MemoryCounter(self.slot(name)))
    }
}

struct MemoryCounter(Arc<AtomicU64>);

impl Counter for MemoryCounter {
    fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }
}

/// Discards every increment
pub struct NoopEmitter;

impl Emitter for NoopEmitter {
    fn counter(&self, _name: &str) -> Box<dyn Counter> {
        Box::new(NoopCounter)
    }
}

struct NoopCounter;

impl Counter for NoopCounter {
    fn inc(&self) {}
}
