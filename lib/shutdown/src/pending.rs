// SPDX-FileCopyrightText: Copyright (c) 2024-2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::time::Duration;

use crate::sync::{AtomicBool, AtomicU64, AtomicUsize, Ordering, as_nanos};

/// Counts in-flight requests and remembers when the most recent one finished.
///
/// # Publication
///
/// The last-response timestamp is written *before* the counter is decremented, and the
/// decrement is a `Release` read-modify-write. Every increment and decrement is an RMW on
/// the same atomic, so they all extend one release sequence. A reader that observes the
/// counter with `Acquire` therefore also observes every timestamp written before any
/// decrement it has seen. [`PendingRequests::last_response`] must only be trusted after such
/// a load, which is exactly what the quiet period check does.
pub(crate) struct PendingRequests {
    count: AtomicUsize,
    last_response_nanos: AtomicU64,
    last_response_set: AtomicBool,
}

impl std::fmt::Debug for PendingRequests {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingRequests")
            .field("count", &self.count())
            .field("last_response", &self.last_response())
            .finish()
    }
}

impl PendingRequests {
    pub(crate) fn new() -> Self {
        Self {
            count: AtomicUsize::new(0),
            last_response_nanos: AtomicU64::new(0),
            last_response_set: AtomicBool::new(false),
        }
    }

    pub(crate) fn increment(&self) {
        // nothing is published by an increment
        let prev = self.count.fetch_add(1, Ordering::Relaxed);
        tracing::trace!("Pending request started: {} -> {}", prev, prev + 1);
    }

    /// Record a completed response at `now`, then publish it by decrementing the counter.
    pub(crate) fn decrement(&self, now: Duration) {
        // fetch_max keeps the timestamp monotone when racing completions store out of order
        self.last_response_nanos
            .fetch_max(as_nanos(now), Ordering::Relaxed);
        self.last_response_set.store(true, Ordering::Release);

        let prev = self.count.fetch_sub(1, Ordering::Release);
        debug_assert!(prev > 0, "pending request decremented without a matching increment");
        tracing::trace!(
            "Pending request completed: {} -> {}",
            prev,
            prev.wrapping_sub(1)
        );
    }

    /// Current number of in-flight requests
    pub(crate) fn count(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    /// Time of the most recent completed response, if any response has completed.
    pub(crate) fn last_response(&self) -> Option<Duration> {
        if !self.last_response_set.load(Ordering::Acquire) {
            return None;
        }
        Some(Duration::from_nanos(
            self.last_response_nanos.load(Ordering::Acquire),
        ))
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    #[test]
    fn test_counter_tracks_started_minus_completed() {
        let pending = PendingRequests::new();
        assert_eq!(pending.count(), 0);
        assert_eq!(pending.last_response(), None);

        pending.increment();
        pending.increment();
        assert_eq!(pending.count(), 2);
        assert_eq!(pending.last_response(), None);

        pending.decrement(Duration::from_millis(10));
        assert_eq!(pending.count(), 1);
        assert_eq!(pending.last_response(), Some(Duration::from_millis(10)));

        pending.decrement(Duration::from_millis(25));
        assert_eq!(pending.count(), 0);
        assert_eq!(pending.last_response(), Some(Duration::from_millis(25)));
    }

    #[test]
    fn test_last_response_keeps_latest_completion() {
        let pending = PendingRequests::new();
        pending.increment();
        pending.increment();

        // completions may publish their clock readings out of order
        pending.decrement(Duration::from_millis(40));
        pending.decrement(Duration::from_millis(30));

        assert_eq!(pending.last_response(), Some(Duration::from_millis(40)));
    }

    #[test]
    fn test_completion_at_clock_origin_is_recorded() {
        let pending = PendingRequests::new();
        pending.increment();
        pending.decrement(Duration::ZERO);
        assert_eq!(pending.last_response(), Some(Duration::ZERO));
    }
}
