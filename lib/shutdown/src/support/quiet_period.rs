// SPDX-FileCopyrightText: Copyright (c) 2024-2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;
use std::time::Duration;

use super::GracefulShutdown;
use crate::blocking::BlockingTaskQueue;
use crate::clock::Clock;
use crate::pending::PendingRequests;
use crate::sync::{AtomicU64, Ordering, as_nanos};

/// Sentinel for "shutdown has not started"; started timestamps are stored off by one.
const NOT_STARTED: u64 = 0;

/// Graceful shutdown that waits for requests and blocking tasks to drain, then for the
/// quiet period to pass since both the start of shutdown and the last response.
pub struct QuietPeriodShutdown {
    quiet_period: Duration,
    pending: PendingRequests,
    /// Clock reading at the first quiet period query, plus one. Set once by compare-and-swap.
    shutdown_started_at: AtomicU64,
    blocking_tasks: Arc<dyn BlockingTaskQueue>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for QuietPeriodShutdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuietPeriodShutdown")
            .field("quiet_period", &self.quiet_period)
            .field("pending", &self.pending)
            .field("shutdown_started_at", &self.shutdown_started_at())
            .field("blocking_tasks", &self.blocking_tasks)
            .finish()
    }
}

impl QuietPeriodShutdown {
    pub fn new(
        quiet_period: Duration,
        blocking_tasks: Arc<dyn BlockingTaskQueue>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            quiet_period,
            pending: PendingRequests::new(),
            shutdown_started_at: AtomicU64::new(NOT_STARTED),
            blocking_tasks,
            clock,
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    /// Clock reading at which shutdown started, if it has
    pub fn shutdown_started_at(&self) -> Option<Duration> {
        match self.shutdown_started_at.load(Ordering::Acquire) {
            NOT_STARTED => None,
            encoded => Some(Duration::from_nanos(encoded - 1)),
        }
    }

    /// Returns the shutdown start time, latching it to the current clock reading if this is
    /// the first query. Concurrent first queries agree on a single winner.
    fn latch_shutdown_start(&self) -> Duration {
        if let Some(started_at) = self.shutdown_started_at() {
            return started_at;
        }

        let now = self.clock.now();
        let encoded = as_nanos(now).saturating_add(1);
        match self.shutdown_started_at.compare_exchange(
            NOT_STARTED,
            encoded,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {
                tracing::debug!(
                    pending = self.pending.count(),
                    quiet_period_ms = self.quiet_period.as_millis() as u64,
                    "Graceful shutdown started"
                );
                now
            }
            Err(existing) => Duration::from_nanos(existing - 1),
        }
    }
}

impl GracefulShutdown for QuietPeriodShutdown {
    fn increment(&self) {
        self.pending.increment();
    }

    fn decrement(&self) {
        self.pending.decrement(self.clock.now());
    }

    fn count(&self) -> usize {
        self.pending.count()
    }

    fn is_shutting_down(&self) -> bool {
        self.shutdown_started_at().is_some()
    }

    fn is_quiet_period_complete(&self) -> bool {
        let started_at = self.latch_shutdown_start();

        // Acquire: a zero here makes every prior last-response write visible below
        let pending = self.pending.count();
        if pending != 0 {
            tracing::trace!(pending, "Quiet period not complete: requests in flight");
            return false;
        }

        let blocking = self.blocking_tasks.state();
        if !blocking.is_drained() {
            tracing::trace!(
                ?blocking,
                "Quiet period not complete: blocking tasks outstanding"
            );
            return false;
        }

        let now = self.clock.now();
        let since_shutdown = now.saturating_sub(started_at);
        let elapsed = match self.pending.last_response() {
            // the later of the two reference points governs
            Some(last_response) => since_shutdown.min(now.saturating_sub(last_response)),
            None => since_shutdown,
        };

        let complete = elapsed >= self.quiet_period;
        if complete {
            tracing::debug!(
                elapsed_ms = elapsed.as_millis() as u64,
                "Quiet period complete"
            );
        }
        complete
    }
}
