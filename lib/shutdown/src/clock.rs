// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Monotonic time sources for quiet period evaluation.
//!
//! All readings are expressed as a [`Duration`] since the clock's own origin, which keeps
//! them cheap to store in atomics and trivially comparable. Readings from different clock
//! instances are not comparable with each other.

use std::time::Duration;

use crate::sync::{AtomicU64, Ordering, as_nanos};

/// A monotonic clock. Consecutive calls to [`Clock::now`] on one instance never decrease.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Time elapsed since this clock's origin
    fn now(&self) -> Duration;
}

/// Default clock backed by [`tokio::time::Instant`].
///
/// Reading tokio time means a paused test runtime (`tokio::time::pause`) drives this clock
/// deterministically, while production code gets the OS monotonic clock.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: tokio::time::Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// A clock that only moves when told to. Intended for tests.
#[derive(Debug)]
pub struct ManualClock {
    nanos: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            nanos: AtomicU64::new(0),
        }
    }

    /// Move the clock to `now`. Setting an earlier time than the current reading is ignored.
    pub fn set(&self, now: Duration) {
        self.nanos.fetch_max(as_nanos(now), Ordering::SeqCst);
    }

    /// Move the clock forward by `delta`
    pub fn advance(&self, delta: Duration) {
        self.nanos.fetch_add(as_nanos(delta), Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_never_moves_backwards() {
        let clock = ManualClock::new();
        assert_eq!(clock.now(), Duration::ZERO);

        clock.set(Duration::from_millis(500));
        assert_eq!(clock.now(), Duration::from_millis(500));

        clock.set(Duration::from_millis(100));
        assert_eq!(clock.now(), Duration::from_millis(500));

        clock.advance(Duration::from_millis(250));
        assert_eq!(clock.now(), Duration::from_millis(750));
    }

    #[tokio::test(start_paused = true)]
    async fn test_monotonic_clock_follows_tokio_time() {
        let clock = MonotonicClock::new();
        assert_eq!(clock.now(), Duration::ZERO);

        tokio::time::advance(Duration::from_secs(3)).await;
        assert_eq!(clock.now(), Duration::from_secs(3));
    }
}
