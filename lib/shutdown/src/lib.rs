// SPDX-FileCopyrightText: Copyright (c) 2024-2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Dynamo graceful shutdown
//!
//! Tracks in-flight requests and outstanding blocking work, and tells a server when it may
//! stop: no requests pending, no blocking tasks queued or running, and a quiet period
//! elapsed since both the start of shutdown and the last response.
//!
//! ```no_run
//! use std::sync::Arc;
//! use dynamo_shutdown::{GracefulShutdownConfig, GracefulShutdownExt};
//!
//! # async fn serve() -> dynamo_shutdown::Result<()> {
//! dynamo_shutdown::logging::init();
//! let config = GracefulShutdownConfig::from_settings()?;
//! let pool = Arc::new(config.create_blocking_pool()?);
//! let support = config.create_support(pool.clone());
//! let coordinator = config.create_coordinator(support.clone());
//!
//! // per request
//! let _guard = support.track();
//!
//! // on SIGTERM
//! let outcome = coordinator.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub use anyhow::{Context as ErrorContext, Error, Result};

pub mod blocking;
pub mod clock;
mod config;
pub mod coordinator;
pub mod logging;
mod pending;
pub mod support;
mod sync;

pub use config::{
    GracefulShutdownConfig, GracefulShutdownConfigBuilder, environment_names, is_truthy,
};
pub use coordinator::{ShutdownCoordinator, ShutdownOutcome};
pub use support::{
    DisabledShutdown, GracefulShutdown, GracefulShutdownExt, PendingRequestGuard,
    QuietPeriodShutdown, create, create_disabled, create_with_clock,
};
pub use tokio_util::sync::CancellationToken;
