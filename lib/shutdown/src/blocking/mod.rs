// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Blocking task executors as seen by graceful shutdown.
//!
//! Request handlers frequently hand work off to a blocking pool (file IO, CPU bound
//! post-processing) and respond before that work finishes. Shutdown must not close the
//! server while such work is still queued or running, so the quiet period check asks the
//! executor whether it is idle through [`BlockingTaskQueue`].
//!
//! Not every executor can answer. Those report [`BlockingTaskState::Unknown`], which the
//! quiet period check treats as idle: shutdown is never held up by a condition that cannot
//! be observed.

use anyhow::Result;
use rayon::ThreadPoolBuilder;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

pub mod metrics;
pub mod pool;

pub use metrics::BlockingTaskMetrics;
pub use pool::BlockingTaskPool;

/// Minimum stack size accepted for blocking pool threads
const MIN_STACK_SIZE: usize = 128 * 1024;

/// Snapshot of a blocking executor's workload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockingTaskState {
    /// Nothing queued and no worker busy
    Idle,
    /// Work is queued or running
    Busy { queued: usize, active: usize },
    /// The executor does not support introspection
    Unknown,
}

impl BlockingTaskState {
    pub fn from_counts(queued: usize, active: usize) -> Self {
        if queued == 0 && active == 0 {
            BlockingTaskState::Idle
        } else {
            BlockingTaskState::Busy { queued, active }
        }
    }

    /// Whether this state allows shutdown to proceed. [`BlockingTaskState::Unknown`] does.
    pub fn is_drained(&self) -> bool {
        !matches!(self, BlockingTaskState::Busy { .. })
    }
}

/// An executor of blocking tasks that graceful shutdown can query for idleness.
pub trait BlockingTaskQueue: Send + Sync + std::fmt::Debug {
    fn state(&self) -> BlockingTaskState;
}

/// For servers that do not run blocking work at all
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBlockingTasks;

impl BlockingTaskQueue for NoBlockingTasks {
    fn state(&self) -> BlockingTaskState {
        BlockingTaskState::Idle
    }
}

/// An executor that cannot be introspected, e.g. one owned by a third party library
#[derive(Debug, Clone, Copy, Default)]
pub struct OpaqueExecutor;

impl BlockingTaskQueue for OpaqueExecutor {
    fn state(&self) -> BlockingTaskState {
        BlockingTaskState::Unknown
    }
}

/// The tokio blocking pool (`spawn_blocking`) can only be inspected with `--cfg tokio_unstable`.
impl BlockingTaskQueue for tokio::runtime::Handle {
    #[cfg(tokio_unstable)]
    fn state(&self) -> BlockingTaskState {
        let metrics = self.metrics();
        let queued = metrics.blocking_queue_depth();
        let active = metrics
            .num_blocking_threads()
            .saturating_sub(metrics.num_idle_blocking_threads());
        BlockingTaskState::from_counts(queued, active)
    }

    #[cfg(not(tokio_unstable))]
    fn state(&self) -> BlockingTaskState {
        BlockingTaskState::Unknown
    }
}

impl<T: BlockingTaskQueue + ?Sized> BlockingTaskQueue for Arc<T> {
    fn state(&self) -> BlockingTaskState {
        (**self).state()
    }
}

/// Configuration for the blocking task pool
#[derive(Debug, Clone)]
pub struct BlockingPoolConfig {
    /// Number of threads in the pool (defaults to num_cpus / 2, clamped to 2..=16)
    pub num_threads: Option<usize>,

    /// Stack size for pool threads (defaults to 2MB)
    pub stack_size: Option<usize>,

    /// Thread name prefix (defaults to "blocking")
    pub thread_prefix: String,
}

impl Default for BlockingPoolConfig {
    fn default() -> Self {
        Self {
            num_threads: None,
            stack_size: Some(2 * 1024 * 1024),
            thread_prefix: "blocking".to_string(),
        }
    }
}

impl BlockingPoolConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(num_threads) = self.num_threads
            && num_threads == 0
        {
            return Err(anyhow::anyhow!(
                "Number of blocking threads cannot be 0. Use None for the default thread count."
            ));
        }

        if let Some(stack_size) = self.stack_size
            && stack_size < MIN_STACK_SIZE
        {
            return Err(anyhow::anyhow!(
                "Stack size too small: {}KB. Minimum recommended: {}KB",
                stack_size / 1024,
                MIN_STACK_SIZE / 1024
            ));
        }

        Ok(())
    }

    pub(crate) fn build_pool(&self) -> Result<rayon::ThreadPool> {
        self.validate()?;

        let num_threads = self.num_threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| (n.get() / 2).clamp(2, 16))
                .unwrap_or(2)
        });

        let mut builder = ThreadPoolBuilder::new().num_threads(num_threads);

        if let Some(stack_size) = self.stack_size {
            builder = builder.stack_size(stack_size);
        }

        let prefix = self.thread_prefix.clone();
        let thread_counter = Arc::new(AtomicU64::new(0));
        builder = builder.thread_name(move |_| {
            let id = thread_counter.fetch_add(1, Ordering::SeqCst);
            format!("{}-{}", prefix, id)
        });

        builder
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create blocking thread pool: {}", e))
    }
}
