// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Environment variable name constants
//!
//! - **Logging**: Log level, configuration file and output format
//! - **Graceful shutdown**: Quiet period, timeout and blocking pool settings

/// Logging and tracing environment variables
pub mod logging {
    /// Log level (e.g., "debug", "info", "warn", "error")
    pub const DYN_LOG: &str = "DYN_LOG";

    /// Path to logging configuration file
    pub const DYN_LOGGING_CONFIG_PATH: &str = "DYN_LOGGING_CONFIG_PATH";

    /// Enable JSONL logging format
    pub const DYN_LOGGING_JSONL: &str = "DYN_LOGGING_JSONL";

    /// Disable ANSI terminal colors in logs
    pub const DYN_SDK_DISABLE_ANSI_LOGGING: &str = "DYN_SDK_DISABLE_ANSI_LOGGING";

    /// Use local timezone for logging timestamps (default is UTC)
    pub const DYN_LOG_USE_LOCAL_TZ: &str = "DYN_LOG_USE_LOCAL_TZ";
}

/// Graceful shutdown environment variables
///
/// All of them map onto [`crate::GracefulShutdownConfig`] fields by dropping the prefix.
pub mod graceful_shutdown {
    pub const PREFIX: &str = "DYN_GRACEFUL_SHUTDOWN_";

    /// Set to a falsey value to shut down without draining
    pub const DYN_GRACEFUL_SHUTDOWN_ENABLED: &str = "DYN_GRACEFUL_SHUTDOWN_ENABLED";

    /// Quiet period in milliseconds
    pub const DYN_GRACEFUL_SHUTDOWN_QUIET_PERIOD_MS: &str = "DYN_GRACEFUL_SHUTDOWN_QUIET_PERIOD_MS";

    /// Hard limit on the whole graceful shutdown in milliseconds, 0 for none
    pub const DYN_GRACEFUL_SHUTDOWN_TIMEOUT_MS: &str = "DYN_GRACEFUL_SHUTDOWN_TIMEOUT_MS";

    /// Interval between quiet period checks in milliseconds
    pub const DYN_GRACEFUL_SHUTDOWN_POLL_INTERVAL_MS: &str =
        "DYN_GRACEFUL_SHUTDOWN_POLL_INTERVAL_MS";

    /// Number of threads in the blocking task pool
    pub const DYN_GRACEFUL_SHUTDOWN_BLOCKING_THREADS: &str =
        "DYN_GRACEFUL_SHUTDOWN_BLOCKING_THREADS";

    /// Thread name prefix for the blocking task pool
    pub const DYN_GRACEFUL_SHUTDOWN_BLOCKING_THREAD_PREFIX: &str =
        "DYN_GRACEFUL_SHUTDOWN_BLOCKING_THREAD_PREFIX";
}
