// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Bootstrap
//!
//! Wires stores, registries, the coordinator, the evolution engine and the
//! maintenance worker from one [`RouterConfig`].
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Composition root for embedding the router in a host process

use anyhow::{Context, Result};
use hybrid_swarm_core::application::approach_registry::ApproachRegistry;
use hybrid_swarm_core::application::coordinator::StandardCoordinator;
use hybrid_swarm_core::application::repository_factory::{create_router_stores, RouterStores};
use hybrid_swarm_core::application::signal_board::SignalBoard;
use hybrid_swarm_core::application::specialist_registry::SpecialistRegistry;
use hybrid_swarm_core::domain::config::RouterConfig;
use hybrid_swarm_core::infrastructure::event_bus::EventBus;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::evolution_engine::PatternEvolutionEngine;
use super::maintenance::MaintenanceWorker;

pub struct HybridSwarm {
    pub coordinator: Arc<StandardCoordinator>,
    pub evolution: Arc<PatternEvolutionEngine>,
    pub maintenance: Arc<MaintenanceWorker>,
    pub event_bus: EventBus,
}

impl HybridSwarm {
    /// Build against the storage backend named by `config.storage`.
    pub async fn build(config: &RouterConfig) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;
        let stores = create_router_stores(&config.storage.backend())
            .await
            .context("Failed to open router storage")?;
        Self::with_stores(config, stores).await
    }

    pub async fn with_stores(config: &RouterConfig, stores: RouterStores) -> Result<Self> {
        let event_bus = EventBus::with_default_capacity();

        let specialists = Arc::new(
            SpecialistRegistry::load(stores.specialists, config.specialists.clone(), event_bus.clone())
                .await
                .context("Failed to load specialists")?,
        );
        let approaches = Arc::new(
            ApproachRegistry::load(stores.approaches, config.approaches.clone(), event_bus.clone())
                .await
                .context("Failed to load approaches")?,
        );
        let signals = Arc::new(
            SignalBoard::load(stores.signals, config.signals.clone(), event_bus.clone())
                .await
                .context("Failed to load signals")?,
        );

        let evolution = Arc::new(PatternEvolutionEngine::new(
            approaches.clone(),
            stores.history.clone(),
            config.discovery.clone(),
            event_bus.clone(),
        ));
        let coordinator = StandardCoordinator::from_parts(
            specialists,
            approaches,
            signals.clone(),
            stores.history,
            config.discovery.clone(),
            event_bus.clone(),
        )
        .await
        .context("Failed to read execution history")?
        .with_evolution_engine(evolution.clone());
        let coordinator = Arc::new(coordinator);

        // Scheduled passes go through the coordinator so they never interleave with an outcome.
        let mut maintenance = MaintenanceWorker::new(signals, config.maintenance.clone());
        if config.maintenance.discovery_interval_seconds.is_some() {
            maintenance = maintenance.with_evolution_engine(coordinator.clone());
        }

        info!(
            backend = ?config.storage.backend(),
            execution_count = coordinator.execution_count(),
            "Hybrid swarm router assembled"
        );

        Ok(Self {
            coordinator,
            evolution,
            maintenance: Arc::new(maintenance),
            event_bus,
        })
    }

    /// Spawn the maintenance worker; cancel the returned token to stop it.
    pub fn start_maintenance(&self) -> (CancellationToken, JoinHandle<()>) {
        let token = self.maintenance.shutdown_token();
        (token, self.maintenance.clone().start())
    }
}
