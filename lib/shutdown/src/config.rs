// SPDX-FileCopyrightText: Copyright (c) 2024-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use derive_builder::Builder;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use validator::{Validate, ValidationError};

use crate::blocking::{BlockingPoolConfig, BlockingTaskPool, BlockingTaskQueue};
use crate::coordinator::ShutdownCoordinator;
use crate::support::{self, GracefulShutdown};

pub mod environment_names;

/// Default hard limit on graceful shutdown
const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Default interval between quiet period checks
const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

const DEFAULT_BLOCKING_THREAD_PREFIX: &str = "blocking";

fn default_quiet_period_ms() -> u64 {
    if cfg!(debug_assertions) {
        0 // Debug build: shut down as soon as requests drain
    } else {
        2_000 // Release build: 2 seconds
    }
}

/// Graceful shutdown configuration
#[derive(Serialize, Deserialize, Validate, Debug, Builder, Clone)]
#[builder(build_fn(private, name = "build_internal"), derive(Debug, Serialize))]
#[validate(schema(function = "validate_timeout"))]
pub struct GracefulShutdownConfig {
    /// When false, shutdown neither drains requests nor waits for a quiet period
    /// Set this at runtime with environment variable DYN_GRACEFUL_SHUTDOWN_ENABLED
    #[builder(default = "true")]
    #[builder_field_attr(serde(skip_serializing_if = "Option::is_none"))]
    pub enabled: bool,

    /// Time that must pass with no requests in flight and no blocking work outstanding,
    /// measured from the later of shutdown start and the last response.
    /// Set this at runtime with environment variable DYN_GRACEFUL_SHUTDOWN_QUIET_PERIOD_MS
    #[builder(default = "default_quiet_period_ms()")]
    #[builder_field_attr(serde(skip_serializing_if = "Option::is_none"))]
    pub quiet_period_ms: u64,

    /// Upper bound on the whole graceful shutdown; 0 waits indefinitely.
    /// Must not be shorter than the quiet period.
    /// Set this at runtime with environment variable DYN_GRACEFUL_SHUTDOWN_TIMEOUT_MS
    #[builder(default = "DEFAULT_TIMEOUT_MS")]
    #[builder_field_attr(serde(skip_serializing_if = "Option::is_none"))]
    pub timeout_ms: u64,

    /// Interval between quiet period checks
    /// Set this at runtime with environment variable DYN_GRACEFUL_SHUTDOWN_POLL_INTERVAL_MS
    #[validate(range(min = 1))]
    #[builder(default = "DEFAULT_POLL_INTERVAL_MS")]
    #[builder_field_attr(serde(skip_serializing_if = "Option::is_none"))]
    pub poll_interval_ms: u64,

    /// Number of threads for the blocking task pool
    /// If not set, defaults to num_cpus / 2
    /// Set this at runtime with environment variable DYN_GRACEFUL_SHUTDOWN_BLOCKING_THREADS
    #[validate(range(min = 1))]
    #[builder(default = "None")]
    #[builder_field_attr(serde(skip_serializing_if = "Option::is_none"))]
    pub blocking_threads: Option<usize>,

    /// Thread name prefix for blocking task pool threads
    /// Set this at runtime with environment variable DYN_GRACEFUL_SHUTDOWN_BLOCKING_THREAD_PREFIX
    #[builder(default = "DEFAULT_BLOCKING_THREAD_PREFIX.to_string()")]
    #[builder_field_attr(serde(skip_serializing_if = "Option::is_none"))]
    pub blocking_thread_prefix: String,
}

fn validate_timeout(config: &GracefulShutdownConfig) -> Result<(), ValidationError> {
    if config.timeout_ms != 0 && config.timeout_ms < config.quiet_period_ms {
        return Err(ValidationError::new("timeout_shorter_than_quiet_period"));
    }
    Ok(())
}

impl fmt::Display for GracefulShutdownConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "enabled={}, ", self.enabled)?;
        write!(f, "quiet_period_ms={}, ", self.quiet_period_ms)?;
        match self.timeout_ms {
            0 => write!(f, "timeout_ms=none, ")?,
            ms => write!(f, "timeout_ms={ms}, ")?,
        }
        write!(f, "poll_interval_ms={}, ", self.poll_interval_ms)?;
        match self.blocking_threads {
            Some(val) => write!(f, "blocking_threads={val}")?,
            None => write!(f, "blocking_threads=default (num_cores / 2)")?,
        }
        write!(f, ", blocking_thread_prefix={}", self.blocking_thread_prefix)
    }
}

impl Default for GracefulShutdownConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            quiet_period_ms: default_quiet_period_ms(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            blocking_threads: None,
            blocking_thread_prefix: DEFAULT_BLOCKING_THREAD_PREFIX.to_string(),
        }
    }
}

impl GracefulShutdownConfig {
    pub fn builder() -> GracefulShutdownConfigBuilder {
        GracefulShutdownConfigBuilder::default()
    }

    pub(crate) fn figment() -> Figment {
        use environment_names::graceful_shutdown as env_shutdown;

        Figment::new()
            .merge(Serialized::defaults(GracefulShutdownConfig::default()))
            .merge(Toml::file("/opt/dynamo/etc/graceful_shutdown.toml"))
            .merge(Env::prefixed(env_shutdown::PREFIX).filter_map(|k| {
                let full_key = format!("{}{}", env_shutdown::PREFIX, k.as_str());
                // filters out empty environment variables
                match std::env::var(&full_key) {
                    Ok(v) if !v.is_empty() => Some(k.into()),
                    _ => None,
                }
            }))
    }

    /// Load the graceful shutdown configuration from the environment and configuration files
    /// Configuration is priorities in the following order, where the last has the lowest priority:
    /// 1. Environment variables prefixed with `DYN_GRACEFUL_SHUTDOWN_` (top priority)
    /// 2. /opt/dynamo/etc/graceful_shutdown.toml
    /// 3. Built-in defaults
    pub fn from_settings() -> Result<GracefulShutdownConfig> {
        let config: GracefulShutdownConfig = Self::figment().extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms)
    }

    /// `None` when graceful shutdown may wait indefinitely
    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn blocking_pool_config(&self) -> BlockingPoolConfig {
        BlockingPoolConfig {
            num_threads: self.blocking_threads,
            thread_prefix: self.blocking_thread_prefix.clone(),
            ..Default::default()
        }
    }

    pub fn create_blocking_pool(&self) -> Result<BlockingTaskPool> {
        BlockingTaskPool::new(self.blocking_pool_config())
    }

    /// Build the enabled or disabled shutdown support this configuration selects
    pub fn create_support(
        &self,
        blocking_tasks: Arc<dyn BlockingTaskQueue>,
    ) -> Arc<dyn GracefulShutdown> {
        if self.enabled {
            tracing::debug!("Graceful shutdown enabled: {}", self);
            support::create(self.quiet_period(), blocking_tasks)
        } else {
            tracing::info!("Graceful shutdown disabled");
            support::create_disabled()
        }
    }

    pub fn create_coordinator(&self, support: Arc<dyn GracefulShutdown>) -> ShutdownCoordinator {
        ShutdownCoordinator::new(support, self.poll_interval(), self.timeout())
    }
}

impl GracefulShutdownConfigBuilder {
    /// Build and validate the graceful shutdown configuration
    pub fn build(&self) -> Result<GracefulShutdownConfig> {
        let config = self.build_internal()?;
        config.validate()?;
        Ok(config)
    }
}

/// Check if a string is truthy
/// This will be used to evaluate environment variables or any other subjective
/// configuration parameters that can be set by the user that should be evaluated
/// as a boolean value.
pub fn is_truthy(val: &str) -> bool {
    matches!(val.to_lowercase().as_str(), "1" | "true" | "on" | "yes")
}

/// Check if an environment variable is truthy
pub fn env_is_truthy(env: &str) -> bool {
    match std::env::var(env) {
        Ok(val) => is_truthy(val.as_str()),
        Err(_) => false,
    }
}

/// Check whether JSONL logging enabled
/// Set the `DYN_LOGGING_JSONL` environment variable a [`is_truthy`] value
pub fn jsonl_logging_enabled() -> bool {
    env_is_truthy(environment_names::logging::DYN_LOGGING_JSONL)
}

/// Check whether logging with ANSI terminal escape codes and colors is disabled.
/// Set the `DYN_SDK_DISABLE_ANSI_LOGGING` environment variable a [`is_truthy`] value
pub fn disable_ansi_logging() -> bool {
    env_is_truthy(environment_names::logging::DYN_SDK_DISABLE_ANSI_LOGGING)
}

/// Check whether to use local timezone for logging timestamps (default is UTC)
/// Set the `DYN_LOG_USE_LOCAL_TZ` environment variable to a [`is_truthy`] value
pub fn use_local_timezone() -> bool {
    env_is_truthy(environment_names::logging::DYN_LOG_USE_LOCAL_TZ)
}
