// SPDX-FileCopyrightText: Copyright (c) 2024-2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Drives a [`GracefulShutdown`] to completion once a shutdown signal has been received.
//!
//! Shutdown happens in three phases:
//!
//! 1. the accept token is cancelled so listeners stop admitting new requests;
//! 2. the quiet period predicate is polled on a fixed interval until it holds, or until the
//!    optional hard timeout expires;
//! 3. the shutdown token is cancelled so listeners and connections can be torn down.
//!
//! The coordinator never cancels in-flight requests itself. What happens to them after the
//! shutdown token fires is up to the server.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::support::GracefulShutdown;

/// Default interval between quiet period checks
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How a coordinated shutdown ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Requests and blocking tasks drained and the quiet period passed
    QuietPeriodCompleted { elapsed: Duration },
    /// The hard timeout expired first
    TimedOut {
        elapsed: Duration,
        pending_requests: usize,
    },
}

impl ShutdownOutcome {
    pub fn is_graceful(&self) -> bool {
        matches!(self, ShutdownOutcome::QuietPeriodCompleted { .. })
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            ShutdownOutcome::QuietPeriodCompleted { elapsed } => *elapsed,
            ShutdownOutcome::TimedOut { elapsed, .. } => *elapsed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ShutdownCoordinator {
    support: Arc<dyn GracefulShutdown>,
    poll_interval: Duration,
    timeout: Option<Duration>,
    accept_token: CancellationToken,
    shutdown_token: CancellationToken,
}

impl ShutdownCoordinator {
    /// `timeout` of `None` waits for the quiet period indefinitely.
    pub fn new(
        support: Arc<dyn GracefulShutdown>,
        poll_interval: Duration,
        timeout: Option<Duration>,
    ) -> Self {
        let shutdown_token = CancellationToken::new();
        // no new requests once the server is going away, whatever the reason
        let accept_token = shutdown_token.child_token();

        Self {
            support,
            poll_interval: poll_interval.max(Duration::from_millis(1)),
            timeout,
            accept_token,
            shutdown_token,
        }
    }

    pub fn support(&self) -> &Arc<dyn GracefulShutdown> {
        &self.support
    }

    /// Cancelled when the server must stop admitting requests
    pub fn accept_token(&self) -> CancellationToken {
        self.accept_token.clone()
    }

    /// Cancelled when the listener may be closed
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Run all three shutdown phases and report how the wait ended.
    pub async fn run_until_quiet(&self) -> ShutdownOutcome {
        tracing::info!("Graceful shutdown initiated");

        tracing::info!("Phase 1: Cancelling accept token");
        self.accept_token.cancel();

        tracing::info!(
            pending = self.support.count(),
            "Phase 2: Waiting for the quiet period to complete"
        );
        let outcome = self.wait_for_quiet_period().await;

        match outcome {
            ShutdownOutcome::QuietPeriodCompleted { elapsed } => {
                tracing::info!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Phase 3: Quiet period complete. Closing listeners"
                );
            }
            ShutdownOutcome::TimedOut {
                elapsed,
                pending_requests,
            } => {
                tracing::warn!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    pending_requests,
                    "Phase 3: Graceful shutdown timed out. Closing listeners with requests in flight"
                );
            }
        }
        self.shutdown_token.cancel();

        outcome
    }

    async fn wait_for_quiet_period(&self) -> ShutdownOutcome {
        let started = Instant::now();
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            // the first tick completes immediately
            interval.tick().await;

            if self.support.is_quiet_period_complete() {
                return ShutdownOutcome::QuietPeriodCompleted {
                    elapsed: started.elapsed(),
                };
            }

            if let Some(timeout) = self.timeout
                && started.elapsed() >= timeout
            {
                return ShutdownOutcome::TimedOut {
                    elapsed: started.elapsed(),
                    pending_requests: self.support.count(),
                };
            }
        }
    }

    /// Spawn [`Self::run_until_quiet`] on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime.
    pub fn shutdown(&self) -> JoinHandle<ShutdownOutcome> {
        let coordinator = self.clone();
        tokio::spawn(async move { coordinator.run_until_quiet().await })
    }
}
