// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Hybrid Swarm Cortex
//!
//! Learns new approaches from successful executions: clusters recent
//! records, extracts patterns, creates or evolves approaches and prunes the
//! ones that fall behind. Also hosts the background maintenance worker and
//! the composition root that wires everything to the core coordinator.
//!
//! # Architecture
//!
//! - **Layer:** Learning & Memory Layer
//! - **Purpose:** Pattern discovery and approach evolution

pub mod domain;
pub mod application;

pub use application::*;
