// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Workload counters for the blocking task pool

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use super::BlockingTaskState;

#[derive(Debug, Default)]
pub struct BlockingTaskMetrics {
    /// Tasks submitted but not yet picked up by a worker
    tasks_queued: AtomicUsize,

    /// Tasks currently running on a worker
    tasks_active: AtomicUsize,

    /// Total number of tasks finished
    tasks_total: AtomicU64,
}

impl BlockingTaskMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_task_queued(&self) {
        self.tasks_queued.fetch_add(1, Ordering::SeqCst);
    }

    /// Moves a task from queued to active. Active is raised first so the pair never reads
    /// as idle while the task changes hands.
    pub(crate) fn record_task_start(&self) {
        self.tasks_active.fetch_add(1, Ordering::SeqCst);
        self.tasks_queued.fetch_sub(1, Ordering::SeqCst);
    }

    pub(crate) fn record_task_completion(&self) {
        self.tasks_total.fetch_add(1, Ordering::Relaxed);
        self.tasks_active.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn tasks_queued(&self) -> usize {
        self.tasks_queued.load(Ordering::SeqCst)
    }

    pub fn tasks_active(&self) -> usize {
        self.tasks_active.load(Ordering::SeqCst)
    }

    pub fn tasks_total(&self) -> u64 {
        self.tasks_total.load(Ordering::Relaxed)
    }

    /// Workload snapshot. Queued is read before active: once a task has left the queue its
    /// active increment is already visible, see [`Self::record_task_start`].
    pub fn state(&self) -> BlockingTaskState {
        let queued = self.tasks_queued();
        let active = self.tasks_active();
        BlockingTaskState::from_counts(queued, active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_lifecycle_drives_state() {
        let metrics = BlockingTaskMetrics::new();
        assert_eq!(metrics.state(), BlockingTaskState::Idle);

        metrics.record_task_queued();
        assert_eq!(
            metrics.state(),
            BlockingTaskState::Busy {
                queued: 1,
                active: 0
            }
        );

        metrics.record_task_start();
        assert_eq!(
            metrics.state(),
            BlockingTaskState::Busy {
                queued: 0,
                active: 1
            }
        );

        metrics.record_task_completion();
        assert_eq!(metrics.state(), BlockingTaskState::Idle);
        assert_eq!(metrics.tasks_total(), 1);
    }

    #[test]
    fn test_overlapping_tasks_stay_busy_until_last_completes() {
        let metrics = BlockingTaskMetrics::new();

        for _ in 0..3 {
            metrics.record_task_queued();
        }
        metrics.record_task_start();
        metrics.record_task_start();
        assert_eq!(
            metrics.state(),
            BlockingTaskState::Busy {
                queued: 1,
                active: 2
            }
        );

        metrics.record_task_completion();
        metrics.record_task_start();
        metrics.record_task_completion();
        assert!(!metrics.state().is_drained());

        metrics.record_task_completion();
        assert_eq!(metrics.state(), BlockingTaskState::Idle);
        assert_eq!(metrics.tasks_total(), 3);
    }
}
