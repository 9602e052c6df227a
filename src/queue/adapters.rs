//! In-process queue adapters

use anyhow::{Context, Result, anyhow};
use std::collections::VecDeque;
use std::io::Write;
use std::sync::{Mutex, MutexGuard};

use super::{Task, TaskQueue};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// FIFO queue held in memory, for local draining and tests
#[derive(Default)]
pub struct MemoryQueue {
    tasks: Mutex<VecDeque<Task>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the oldest task
    pub fn pop(&self) -> Option<Task> {
        lock(&self.tasks).pop_front()
    }

    /// Copy of the pending tasks, oldest first
    pub fn tasks(&self) -> Vec<Task> {
        lock(&self.tasks).iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.tasks).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.tasks).is_empty()
    }
}

impl TaskQueue for MemoryQueue {
    async fn enqueue(&self, task: Task) -> Result<()> {
        lock(&self.tasks).push_back(task);
        Ok(())
    }
}

/// Writes each task as one JSON line, for piping into an external transport
pub struct JsonLinesQueue<W: Write> {
    writer: Mutex<W>,
}

impl<W: Write> JsonLinesQueue<W> {
    pub fn new(writer: W) -> Self {
        Self { writer: Mutex::new(writer) }
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|_| anyhow!("Task writer lock poisoned"))
    }
}

impl<W: Write> TaskQueue for JsonLinesQueue<W> {
    async fn enqueue(&self, task: Task) -> Result<()> {
        let line = serde_json::to_string(&task)?;
        let mut writer = lock(&self.writer);
        writeln!(writer, "{}", line).context("Failed to write task")?;
        writer.flush().context("Failed to flush task writer")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{DiffScanPlan, RefScanPlan, TaskPlan};

    fn ref_task(id: &str) -> Task {
        RefScanPlan {
            owner: "o".to_string(),
            repository: "r".to_string(),
            git_ref: "sha".to_string(),
        }
        .task(id)
    }

    #[tokio::test]
    async fn test_memory_queue_fifo() {
        let queue = MemoryQueue::new();
        queue.enqueue(ref_task("1")).await.unwrap();
        queue.enqueue(ref_task("2")).await.unwrap();

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop().unwrap().id, "1");
        assert_eq!(queue.pop().unwrap().id, "2");
        assert!(queue.pop().is_none());
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_json_lines_one_task_per_line() {
        let queue = JsonLinesQueue::new(Vec::new());
        queue.enqueue(ref_task("1")).await.unwrap();
        queue
            .enqueue(
                DiffScanPlan {
                    owner: "o".to_string(),
                    repository: "r".to_string(),
                    from: "a".to_string(),
                    to: "b".to_string(),
                }
                .task("2"),
            )
            .await
            .unwrap();

        let output = String::from_utf8(queue.into_inner().unwrap()).unwrap();
        let tasks: Vec<Task> = output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0], ref_task("1"));
        assert!(matches!(tasks[1].plan, TaskPlan::DiffScan(_)));
    }
}
