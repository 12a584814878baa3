// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Hybrid Swarm Core
//!
//! Three-level adaptive routing: specialists chosen by adaptive resonance,
//! approaches matched by pattern and blended with stigmergic signals, and an
//! append-only execution history feeding approach discovery.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Domain model, routing services and persistence

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
