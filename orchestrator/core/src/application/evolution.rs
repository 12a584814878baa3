// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Evolution engine seam.
//!
//! The coordinator triggers discovery passes through [`EvolutionEngine`]; the
//! pattern mining itself lives in the cortex crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::RouterError;
use crate::domain::pattern::DiscoveryReport;

#[async_trait]
pub trait EvolutionEngine: Send + Sync {
    /// Mine recent history, then create, evolve and prune approaches.
    async fn run_discovery(&self) -> Result<DiscoveryReport, RouterError>;
}

/// What happened to discovery while an outcome was being recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DiscoveryOutcome {
    NotTriggered,
    Completed(DiscoveryReport),
    /// The pass failed after the outcome itself was durably recorded.
    Failed { error: String },
}

impl DiscoveryOutcome {
    pub fn is_triggered(&self) -> bool {
        !matches!(self, DiscoveryOutcome::NotTriggered)
    }
}
