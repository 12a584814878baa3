// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Mod
//!
//! Provides the domain model of the routing engine.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Entities, value objects, events and repository contracts

pub mod approach;
pub mod config;
pub mod errors;
pub mod events;
pub mod execution;
pub mod pattern;
pub mod repository;
pub mod sanitizer;
pub mod signal;
pub mod signature;
pub mod specialist;
pub mod style;
pub mod task;

pub use approach::*;
pub use config::*;
pub use errors::*;
pub use events::*;
pub use execution::*;
pub use pattern::*;
pub use repository::*;
pub use sanitizer::*;
pub use signal::*;
pub use signature::*;
pub use specialist::*;
pub use style::*;
pub use task::*;
