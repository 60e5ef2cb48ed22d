// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Blocking task pool with tokio-rayon integration
//!
//! The `BlockingTaskPool` runs deferred and CPU-heavy work for request handlers on a
//! dedicated Rayon thread pool, and keeps exact queued/active counts so graceful shutdown
//! can tell when that work has drained.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use dynamo_shutdown::blocking::BlockingTaskPool;
//!
//! async fn handle(pool: Arc<BlockingTaskPool>, body: Vec<u8>) -> usize {
//!     // awaited work
//!     let len = pool.execute(move || body.len()).await;
//!
//!     // deferred work that outlives the response
//!     pool.spawn(move || flush_audit_log(len));
//!
//!     len
//! }
//! ```

use super::{BlockingPoolConfig, BlockingTaskMetrics, BlockingTaskQueue, BlockingTaskState};
use anyhow::Result;
use std::sync::Arc;
use tokio_rayon::AsyncThreadPool;

/// A pool of threads for blocking work that reports its own idleness
#[derive(Clone)]
pub struct BlockingTaskPool {
    pool: Arc<rayon::ThreadPool>,
    metrics: Arc<BlockingTaskMetrics>,
    config: BlockingPoolConfig,
}

impl std::fmt::Debug for BlockingTaskPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingTaskPool")
            .field("num_threads", &self.pool.current_num_threads())
            .field("metrics", &self.metrics)
            .field("config", &self.config)
            .finish()
    }
}

/// Marks a task active for as long as it lives, including when the task panics.
struct RunningTask {
    metrics: Arc<BlockingTaskMetrics>,
}

impl RunningTask {
    fn start(metrics: Arc<BlockingTaskMetrics>) -> Self {
        metrics.record_task_start();
        Self { metrics }
    }
}

impl Drop for RunningTask {
    fn drop(&mut self) {
        self.metrics.record_task_completion();
    }
}

impl BlockingTaskPool {
    pub fn new(config: BlockingPoolConfig) -> Result<Self> {
        let pool = config.build_pool()?;
        tracing::debug!(
            "Initialized blocking task pool with {} threads",
            pool.current_num_threads()
        );

        Ok(Self {
            pool: Arc::new(pool),
            metrics: Arc::new(BlockingTaskMetrics::new()),
            config,
        })
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(BlockingPoolConfig::default())
    }

    /// Counts `f` as queued now, and as active while it runs.
    fn instrument<F, R>(&self, f: F) -> impl FnOnce() -> R + Send + 'static
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        self.metrics.record_task_queued();
        let metrics = self.metrics.clone();
        move || {
            let _running = RunningTask::start(metrics);
            f()
        }
    }

    /// Run `f` on the pool and await its result without blocking a tokio worker.
    ///
    /// A panic inside `f` is resumed in the awaiting task.
    pub async fn execute<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let task = self.instrument(f);
        self.pool.spawn_async(task).await
    }

    /// Run `f` on the pool from a synchronous context, blocking the caller until it returns.
    pub fn execute_sync<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let task = self.instrument(f);
        self.pool.install(task)
    }

    /// Queue `f` without waiting for it. Typically used for work that continues after the
    /// response that triggered it has been sent.
    pub fn spawn<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let task = self.instrument(f);
        self.pool.spawn(task);
    }

    pub fn metrics(&self) -> &BlockingTaskMetrics {
        &self.metrics
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl BlockingTaskQueue for BlockingTaskPool {
    fn state(&self) -> BlockingTaskState {
        self.metrics.state()
    }
}
