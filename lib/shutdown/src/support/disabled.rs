// SPDX-FileCopyrightText: Copyright (c) 2024-2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use super::GracefulShutdown;
use crate::sync::{AtomicBool, Ordering};

/// Used when graceful shutdown is turned off. Nothing is tracked and shutdown never waits.
#[derive(Debug)]
pub struct DisabledShutdown {
    shutting_down: AtomicBool,
}

impl DisabledShutdown {
    pub fn new() -> Self {
        Self {
            shutting_down: AtomicBool::new(false),
        }
    }
}

impl Default for DisabledShutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl GracefulShutdown for DisabledShutdown {
    fn increment(&self) {}

    fn decrement(&self) {}

    fn count(&self) -> usize {
        0
    }

    fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Acquire)
    }

    fn is_quiet_period_complete(&self) -> bool {
        if !self.shutting_down.swap(true, Ordering::AcqRel) {
            tracing::debug!("Graceful shutdown disabled, shutting down immediately");
        }
        true
    }
}
