// SPDX-FileCopyrightText: Copyright (c) 2024-2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! End-to-end quiet period scenarios driven by a manual clock.

#![cfg(not(loom))]

use std::sync::Arc;
use std::time::Duration;

use dynamo_shutdown::blocking::{BlockingTaskQueue, BlockingTaskState, NoBlockingTasks};
use dynamo_shutdown::clock::ManualClock;
use dynamo_shutdown::{GracefulShutdown, GracefulShutdownExt, create_disabled, create_with_clock};

const QUIET_PERIOD: Duration = Duration::from_millis(1000);

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

fn enabled(blocking: Arc<dyn BlockingTaskQueue>) -> (Arc<dyn GracefulShutdown>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let support = create_with_clock(QUIET_PERIOD, blocking, clock.clone());
    (support, clock)
}

/// Blocking work that is running until `finish` is called
#[derive(Debug, Default)]
struct OneBlockingTask(std::sync::atomic::AtomicBool);

impl OneBlockingTask {
    fn finish(&self) {
        self.0.store(true, std::sync::atomic::Ordering::SeqCst);
    }
}

impl BlockingTaskQueue for OneBlockingTask {
    fn state(&self) -> BlockingTaskState {
        if self.0.load(std::sync::atomic::Ordering::SeqCst) {
            BlockingTaskState::Idle
        } else {
            BlockingTaskState::Busy {
                queued: 0,
                active: 1,
            }
        }
    }
}

#[test]
fn idle_server_completes_one_quiet_period_after_shutdown() {
    let (support, clock) = enabled(Arc::new(NoBlockingTasks));

    assert!(!support.is_quiet_period_complete());
    clock.set(ms(999));
    assert!(!support.is_quiet_period_complete());
    clock.set(ms(1000));
    assert!(support.is_quiet_period_complete());
}

#[test]
fn in_flight_request_then_late_response() {
    let (support, clock) = enabled(Arc::new(NoBlockingTasks));
    let guard = support.track();

    // shutdown starts with one request outstanding
    assert!(!support.is_quiet_period_complete());
    clock.set(ms(500));
    assert!(!support.is_quiet_period_complete());

    clock.set(ms(800));
    drop(guard);
    assert_eq!(support.count(), 0);

    clock.set(ms(1000));
    assert!(!support.is_quiet_period_complete());
    clock.set(ms(1799));
    assert!(!support.is_quiet_period_complete());
    clock.set(ms(1800));
    assert!(support.is_quiet_period_complete());
}

#[test]
fn stale_response_before_shutdown_is_ignored() {
    let (support, clock) = enabled(Arc::new(NoBlockingTasks));
    {
        let _request = support.track();
        clock.set(ms(10));
    }

    clock.set(ms(10_000));
    assert!(!support.is_quiet_period_complete());
    clock.set(ms(10_999));
    assert!(!support.is_quiet_period_complete());
    clock.set(ms(11_000));
    assert!(support.is_quiet_period_complete());
}

#[test]
fn outstanding_blocking_work_delays_completion() {
    let blocking = Arc::new(OneBlockingTask::default());
    let (support, clock) = enabled(blocking.clone());

    assert!(!support.is_quiet_period_complete());
    clock.set(ms(5000));
    assert!(!support.is_quiet_period_complete());

    blocking.finish();
    assert!(support.is_quiet_period_complete());
}

#[test]
fn requests_started_during_shutdown_are_still_tracked() {
    let (support, clock) = enabled(Arc::new(NoBlockingTasks));
    assert!(!support.is_quiet_period_complete());
    assert!(support.is_shutting_down());

    // the listener has not closed yet, so a request can still slip in
    clock.set(ms(900));
    let guard = support.track();
    clock.set(ms(2000));
    assert!(!support.is_quiet_period_complete());

    drop(guard);
    clock.set(ms(2999));
    assert!(!support.is_quiet_period_complete());
    clock.set(ms(3000));
    assert!(support.is_quiet_period_complete());
}

#[test]
fn disabled_support_never_waits() {
    let support = create_disabled();
    let _guard = support.track();
    assert_eq!(support.count(), 0);
    assert!(!support.is_shutting_down());

    assert!(support.is_quiet_period_complete());
    assert!(support.is_shutting_down());
}

#[test]
fn completion_is_stable_without_new_requests() {
    let (support, clock) = enabled(Arc::new(NoBlockingTasks));
    assert!(!support.is_quiet_period_complete());

    clock.set(ms(1000));
    for step in 0..10 {
        clock.advance(ms(step * 100));
        assert!(support.is_quiet_period_complete());
    }
}
