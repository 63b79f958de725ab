// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Priority queue with blocking pop and id-indexed lookup.

use parking_lot::Mutex;
use pp_core::{PriorityKey, Task};
use std::collections::{BinaryHeap, HashMap};
use tokio::sync::Notify;

struct Entry {
    key: PriorityKey,
    task: Task,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Entry {}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key.cmp(&other.key)
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Default)]
struct Inner {
    heap: BinaryHeap<Entry>,
    map: HashMap<String, Task>,
    seq: u64,
}

/// Min-priority heap of tasks (smaller numeric priority pops first, ties
/// FIFO) with an advisory id→task map for inspection.
///
/// The map entry outlives the heap entry: it is only dropped by
/// [`PriorityPool::evict`] once the supervisor has committed a terminal
/// state.
#[derive(Default)]
pub struct PriorityPool {
    inner: Mutex<Inner>,
    available: Notify,
}

impl PriorityPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// A queue pre-seeded with `tasks`.
    pub fn seeded(tasks: Vec<Task>) -> Self {
        let pool = Self::new();
        for task in tasks {
            pool.put(task);
        }
        pool
    }

    /// Insert a task and wake a blocked `pop`.
    pub fn put(&self, task: Task) {
        {
            let mut inner = self.inner.lock();
            let key = PriorityKey { priority: task.priority, seq: inner.seq };
            inner.seq += 1;
            if let Some(id) = &task.id {
                inner.map.insert(id.clone(), task.clone());
            }
            inner.heap.push(Entry { key, task });
        }
        self.available.notify_one();
    }

    /// Remove and return the highest-priority task, waiting while empty.
    /// Tolerates spurious wakeups: the heap is re-checked on every wake.
    pub async fn pop(&self) -> Task {
        loop {
            let notified = self.available.notified();
            if let Some(entry) = self.inner.lock().heap.pop() {
                return entry.task;
            }
            notified.await;
        }
    }

    /// The task currently known under `id`, if any.
    pub fn get(&self, id: &str) -> Option<Task> {
        self.inner.lock().map.get(id).cloned()
    }

    /// Drop the advisory map entry once the task reached a terminal state.
    pub fn evict(&self, id: &str) -> Option<Task> {
        self.inner.lock().map.remove(id)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().heap.is_empty()
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
