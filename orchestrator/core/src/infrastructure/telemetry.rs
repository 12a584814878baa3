// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Tracing subscriber setup for embedders of the router.

use anyhow::{Context, Result};

use crate::domain::config::LoggingConfig;

/// Install a global fmt subscriber.
///
/// `RUST_LOG` wins over the configured level. Calling this again after a
/// subscriber is installed is a no-op.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&config.level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false);

    let installed = match config.format.as_str() {
        "json" => builder.json().try_init(),
        _ => builder.compact().try_init(),
    };

    if installed.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
    Ok(())
}
