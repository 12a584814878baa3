// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod bootstrap;
pub mod content_analyzer;
pub mod evolution_engine;
pub mod maintenance;
pub mod pattern_analyzer;

pub use bootstrap::HybridSwarm;
pub use content_analyzer::ContentAnalyzer;
pub use evolution_engine::PatternEvolutionEngine;
pub use maintenance::MaintenanceWorker;
pub use pattern_analyzer::PatternAnalyzer;
