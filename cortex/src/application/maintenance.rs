// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Maintenance Worker - Background compaction and scheduled discovery
//!
//! Periodically evicts signals that decayed below the eviction epsilon and,
//! when configured, runs a discovery pass on its own interval in addition to
//! the per-outcome trigger.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Keeps the signal board bounded and discovery fresh between bursts of traffic

use anyhow::Result;
use hybrid_swarm_core::application::evolution::EvolutionEngine;
use hybrid_swarm_core::application::signal_board::{CompactionReport, SignalBoard};
use hybrid_swarm_core::domain::config::MaintenanceConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct MaintenanceWorker {
    signals: Arc<SignalBoard>,
    evolution: Option<Arc<dyn EvolutionEngine>>,
    config: MaintenanceConfig,
    shutdown_token: CancellationToken,
}

impl MaintenanceWorker {
    pub fn new(signals: Arc<SignalBoard>, config: MaintenanceConfig) -> Self {
        Self {
            signals,
            evolution: None,
            config,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Also run discovery when `discovery_interval_seconds` is set.
    pub fn with_evolution_engine(mut self, engine: Arc<dyn EvolutionEngine>) -> Self {
        self.evolution = Some(engine);
        self
    }

    /// Get a handle to trigger shutdown
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(&self) {
        if !self.config.enabled {
            info!("Maintenance worker is disabled");
            return;
        }

        info!(
            compaction_interval_seconds = self.config.compaction_interval_seconds,
            discovery_interval_seconds = ?self.config.discovery_interval_seconds,
            "Starting maintenance worker"
        );

        let mut compaction_tick = ticker(self.config.compaction_interval_seconds);
        let mut discovery_tick = match (&self.evolution, self.config.discovery_interval_seconds) {
            (Some(_), Some(seconds)) => Some(ticker(seconds)),
            _ => None,
        };

        loop {
            tokio::select! {
                _ = compaction_tick.tick() => {
                    match self.run_cycle().await {
                        Ok(report) => debug!(evicted = report.evicted, remaining = report.remaining, "Compaction cycle completed"),
                        Err(e) => warn!("Compaction cycle failed: {}", e),
                    }
                }
                _ = next_tick(&mut discovery_tick) => {
                    self.run_discovery().await;
                }
                _ = self.shutdown_token.cancelled() => {
                    info!("Shutdown signal received, stopping maintenance worker");
                    break;
                }
            }
        }

        info!("Maintenance worker stopped");
    }

    /// Execute a single compaction cycle
    pub async fn run_cycle(&self) -> Result<CompactionReport> {
        let report = self.signals.compact().await?;
        if report.evicted > 0 {
            info!(evicted = report.evicted, remaining = report.remaining, "Evicted faded signals");
        }
        Ok(report)
    }

    async fn run_discovery(&self) {
        let Some(engine) = &self.evolution else {
            return;
        };
        match engine.run_discovery().await {
            Ok(report) => debug!(
                created = report.created.len(),
                evolved = report.evolved.len(),
                pruned = report.pruned.len(),
                "Scheduled discovery completed"
            ),
            Err(e) => warn!("Scheduled discovery failed: {}", e),
        }
    }
}

fn ticker(seconds: u64) -> Interval {
    let mut tick = interval(Duration::from_secs(seconds.max(1)));
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tick
}

async fn next_tick(tick: &mut Option<Interval>) {
    match tick {
        Some(tick) => {
            tick.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
