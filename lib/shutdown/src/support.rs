// SPDX-FileCopyrightText: Copyright (c) 2024-2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Keeps track of pending requests so that shutdown happens only after a fixed quiet period
//! has passed since the last pending request.
//!
//! A server creates one [`GracefulShutdown`] at startup, wraps every request in a
//! [`PendingRequestGuard`] (see [`GracefulShutdownExt::track`]), and once a shutdown signal
//! arrives polls [`GracefulShutdown::is_quiet_period_complete`] until it returns `true`.
//! [`crate::coordinator::ShutdownCoordinator`] implements that polling loop.

use std::sync::Arc;
use std::time::Duration;

use crate::blocking::BlockingTaskQueue;
use crate::clock::{Clock, MonotonicClock};

mod disabled;
mod quiet_period;

pub use disabled::DisabledShutdown;
pub use quiet_period::QuietPeriodShutdown;

/// Pending request accounting plus the quiet period predicate.
///
/// None of these methods block or fail.
pub trait GracefulShutdown: Send + Sync + std::fmt::Debug {
    /// A request has started processing
    fn increment(&self);

    /// A request has produced its final response, successfully or not. Must be paired 1:1
    /// with a prior [`GracefulShutdown::increment`].
    fn decrement(&self);

    /// Number of requests currently in flight. The value may be stale by the time it returns.
    fn count(&self) -> usize;

    /// `true` once the first quiet period query has been made, and forever after
    fn is_shutting_down(&self) -> bool;

    /// Whether shutdown may proceed. The first call marks the start of shutdown.
    fn is_quiet_period_complete(&self) -> bool;
}

/// Create a graceful shutdown tracker that waits `quiet_period` on the system monotonic clock
pub fn create(
    quiet_period: Duration,
    blocking_tasks: Arc<dyn BlockingTaskQueue>,
) -> Arc<dyn GracefulShutdown> {
    create_with_clock(quiet_period, blocking_tasks, Arc::new(MonotonicClock::new()))
}

/// Same as [`create`] with an explicit clock, typically a [`crate::clock::ManualClock`] in tests
pub fn create_with_clock(
    quiet_period: Duration,
    blocking_tasks: Arc<dyn BlockingTaskQueue>,
    clock: Arc<dyn Clock>,
) -> Arc<dyn GracefulShutdown> {
    Arc::new(QuietPeriodShutdown::new(quiet_period, blocking_tasks, clock))
}

/// Create a tracker for servers with graceful shutdown turned off: nothing is counted and
/// the quiet period is always complete.
pub fn create_disabled() -> Arc<dyn GracefulShutdown> {
    Arc::new(DisabledShutdown::new())
}

/// Decrements the pending request count when dropped.
///
/// Dropping happens on every exit path of a handler, including `?` returns and panics, which
/// keeps increments and decrements paired.
#[must_use = "the request is counted as complete as soon as the guard is dropped"]
#[derive(Debug)]
pub struct PendingRequestGuard {
    support: Arc<dyn GracefulShutdown>,
}

impl PendingRequestGuard {
    pub fn new(support: Arc<dyn GracefulShutdown>) -> Self {
        support.increment();
        Self { support }
    }
}

impl Drop for PendingRequestGuard {
    fn drop(&mut self) {
        self.support.decrement();
    }
}

/// Extension methods on a shared [`GracefulShutdown`]
pub trait GracefulShutdownExt {
    /// Count a request as pending until the returned guard is dropped
    fn track(&self) -> PendingRequestGuard;
}

impl GracefulShutdownExt for Arc<dyn GracefulShutdown> {
    fn track(&self) -> PendingRequestGuard {
        PendingRequestGuard::new(self.clone())
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use crate::blocking::NoBlockingTasks;
    use crate::clock::ManualClock;

    #[test]
    fn test_guard_pairs_increment_and_decrement() {
        let support = create(Duration::from_secs(1), Arc::new(NoBlockingTasks));

        let first = support.track();
        let second = support.track();
        assert_eq!(support.count(), 2);

        drop(first);
        assert_eq!(support.count(), 1);
        drop(second);
        assert_eq!(support.count(), 0);
    }

    #[test]
    fn test_guard_decrements_on_error_path() {
        fn handle(support: &Arc<dyn GracefulShutdown>) -> anyhow::Result<()> {
            let _guard = support.track();
            anyhow::bail!("handler failed")
        }

        let support = create(Duration::from_secs(1), Arc::new(NoBlockingTasks));
        assert!(handle(&support).is_err());
        assert_eq!(support.count(), 0);
    }

    #[test]
    fn test_guard_drop_counts_as_last_response() {
        let clock = Arc::new(ManualClock::new());
        let support = create_with_clock(
            Duration::from_millis(100),
            Arc::new(NoBlockingTasks),
            clock.clone(),
        );

        assert!(!support.is_quiet_period_complete());

        let guard = support.track();
        clock.set(Duration::from_millis(90));
        drop(guard);

        clock.set(Duration::from_millis(150));
        assert!(!support.is_quiet_period_complete());

        clock.set(Duration::from_millis(190));
        assert!(support.is_quiet_period_complete());
    }

    #[test]
    fn test_disabled_guard_is_inert() {
        let support = create_disabled();
        let _guard = support.track();
        assert_eq!(support.count(), 0);
        assert!(support.is_quiet_period_complete());
    }
}
