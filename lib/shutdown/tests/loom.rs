// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Loom-based model checks of the shutdown state.
//!
//! Run with: RUSTFLAGS="--cfg loom" cargo test -p dynamo-shutdown --test loom --release
//!
//! Under normal `cargo test`, this file compiles to an empty module.

#![cfg(loom)]

use std::sync::Arc;
use std::time::Duration;

use loom::thread;

use dynamo_shutdown::blocking::NoBlockingTasks;
use dynamo_shutdown::clock::ManualClock;
use dynamo_shutdown::{GracefulShutdown, QuietPeriodShutdown};

fn support(quiet_period: Duration) -> (Arc<QuietPeriodShutdown>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let support = Arc::new(QuietPeriodShutdown::new(
        quiet_period,
        Arc::new(NoBlockingTasks),
        clock.clone(),
    ));
    (support, clock)
}

/// A checker that sees the counter reach zero must also see the response that got it there.
#[test]
fn loom_last_response_visible_with_zero_count() {
    loom::model(|| {
        let (support, clock) = support(Duration::from_nanos(10));

        support.increment();
        assert!(!support.is_quiet_period_complete());
        clock.set(Duration::from_nanos(10));

        let responder = {
            let support = support.clone();
            thread::spawn(move || support.decrement())
        };

        // in flight, or just finished at t=10: either way the quiet period has not passed
        assert!(!support.is_quiet_period_complete());

        responder.join().unwrap();
        assert_eq!(support.count(), 0);
        assert!(!support.is_quiet_period_complete());
    });
}

#[test]
fn loom_shutdown_start_latched_once() {
    loom::model(|| {
        let (support, clock) = support(Duration::from_nanos(100));

        let checkers: Vec<_> = (0..2)
            .map(|_| {
                let support = support.clone();
                let clock = clock.clone();
                thread::spawn(move || {
                    clock.advance(Duration::from_nanos(1));
                    assert!(!support.is_quiet_period_complete());
                    support.shutdown_started_at()
                })
            })
            .collect();

        let observed: Vec<_> = checkers
            .into_iter()
            .map(|checker| checker.join().unwrap())
            .collect();

        let latched = support.shutdown_started_at();
        assert!(matches!(
            latched,
            Some(started) if started == Duration::from_nanos(1) || started == Duration::from_nanos(2)
        ));
        assert!(observed.iter().all(|started| *started == latched));
    });
}
