// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod feature_extractor;
pub mod specialist_registry;
pub mod signal_board;
pub mod seed_approaches;
pub mod approach_registry;
pub mod evolution;
pub mod repository_factory;
pub mod coordinator;

pub use approach_registry::{ApproachCandidate, ApproachRegistry, HybridSelection};
pub use coordinator::{CoordinationDecision, CoordinationService, ExecutionReport, OutcomeAck, StandardCoordinator};
pub use evolution::{DiscoveryOutcome, EvolutionEngine};
pub use feature_extractor::FeatureExtractor;
pub use repository_factory::{create_router_stores, RouterStores};
pub use signal_board::{CompactionReport, SignalBoard};
pub use specialist_registry::{SpecialistMatch, SpecialistRegistry};
