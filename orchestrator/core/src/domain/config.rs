// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Router Configuration Types
//
// Every tunable of the routing engine, grouped by component:
// - Specialist registry (vigilance, capacity, learning rate)
// - Signal board (half-life, reinforcement and attenuation)
// - Approach registry (hybrid blend, match weights, seeds)
// - Discovery and evolution (period, clustering, novelty, pruning)
// - Background maintenance, storage and logging

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::approach::MatchWeights;
use super::repository::StorageBackend;

/// Environment variable pointing at a YAML config file
pub const CONFIG_PATH_ENV: &str = "HYBRID_SWARM_CONFIG";
pub const LOG_LEVEL_ENV: &str = "HYBRID_SWARM_LOG_LEVEL";
pub const DATA_DIR_ENV: &str = "HYBRID_SWARM_DATA_DIR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be within [{min}, {max}], got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{0} must be greater than zero")]
    NotPositive(&'static str),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub specialists: SpecialistConfig,
    pub signals: SignalConfig,
    pub approaches: ApproachConfig,
    pub discovery: DiscoveryConfig,
    pub maintenance: MaintenanceConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecialistConfig {
    /// Minimum resonance to reuse an existing specialist
    pub vigilance_threshold: f64,

    /// Upper bound on active specialists
    pub max_specialists: usize,

    /// EMA factor for profile and quality updates
    pub learning_rate: f64,

    /// Optimistic quality estimate for a fresh specialist
    pub default_quality_prior: f64,

    /// Success rate assumed before the first outcome
    pub unproven_success_rate: f64,
}

impl Default for SpecialistConfig {
    fn default() -> Self {
        Self {
            vigilance_threshold: 0.7,
            max_specialists: 10,
            learning_rate: 0.3,
            default_quality_prior: 0.6,
            unproven_success_rate: 0.5,
        }
    }
}

/// Which maximum effective strength a signal is normalized against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalNormalization {
    /// Strongest signal under the same task class
    PerKey,
    /// Strongest signal anywhere on the board
    Global,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    pub half_life_seconds: f64,

    /// Deposits at or above this quality reinforce, below it attenuate
    pub reinforce_threshold: f64,

    pub amplification_factor: f64,

    /// Strength is multiplied by `1 - attenuation_factor` on a weak deposit
    pub attenuation_factor: f64,

    /// Decayed strengths below this are evicted on compaction
    pub eviction_epsilon: f64,

    pub normalization: SignalNormalization,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            half_life_seconds: 1800.0,
            reinforce_threshold: 0.7,
            amplification_factor: 1.5,
            attenuation_factor: 0.3,
            eviction_epsilon: 0.01,
            normalization: SignalNormalization::PerKey,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApproachConfig {
    pub pattern_weight: f64,
    pub signal_weight: f64,

    /// EMA factor for approach quality
    pub quality_ema_alpha: f64,

    pub matching: MatchWeights,

    /// Install the built-in approaches when the catalog is empty
    pub seed_defaults: bool,
}

impl Default for ApproachConfig {
    fn default() -> Self {
        Self {
            pattern_weight: 0.7,
            signal_weight: 0.3,
            quality_ema_alpha: 0.1,
            matching: MatchWeights::default(),
            seed_defaults: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub enabled: bool,

    /// Run discovery every `period` recorded executions
    pub period: u64,

    /// Number of recent successful records analyzed per pass
    pub window_size: usize,

    pub success_threshold: f64,

    /// Maximum domain cosine distance for a record to join a cluster
    pub cluster_radius: f64,

    pub min_cluster_size: usize,

    /// Signature distance above which a cluster mints a new approach
    pub novelty_threshold: f64,

    /// Blend factor when evolving an existing approach
    pub evolution_rate: f64,

    pub min_usage_for_pruning: u64,

    /// Standard deviations below the population mean that trigger pruning
    pub prune_std_devs: f64,

    pub stale_after_days: i64,

    pub stale_max_usage: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            period: 50,
            window_size: 100,
            success_threshold: 0.7,
            cluster_radius: 0.35,
            min_cluster_size: 5,
            novelty_threshold: 0.15,
            evolution_rate: 0.2,
            min_usage_for_pruning: 20,
            prune_std_devs: 1.0,
            stale_after_days: 30,
            stale_max_usage: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintenanceConfig {
    pub enabled: bool,

    /// How often the signal board is compacted (seconds)
    pub compaction_interval_seconds: u64,

    /// Also run discovery in the background at this interval (seconds)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discovery_interval_seconds: Option<u64>,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            compaction_interval_seconds: 600,
            discovery_interval_seconds: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Data directory; in-memory storage when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl StorageConfig {
    pub fn backend(&self) -> StorageBackend {
        match &self.data_dir {
            Some(dir) => StorageBackend::FileSystem(dir.clone()),
            None => StorageBackend::InMemory,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "trace")
    pub level: String,

    /// Output format ("json" or "compact")
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

impl RouterConfig {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config: RouterConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Explicit path, then `HYBRID_SWARM_CONFIG`, then defaults.
    /// An explicit path that fails to load is an error; a bad env path is not.
    pub fn load_or_default(explicit: Option<PathBuf>) -> anyhow::Result<Self> {
        if let Some(path) = explicit {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                match Self::from_yaml_file(&path) {
                    Ok(mut config) => {
                        tracing::info!("Loaded configuration from {:?}", path);
                        config.apply_env_overrides();
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Ignoring unreadable config at {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("No configuration file found, using defaults");
        let mut config = Self::default();
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var(LOG_LEVEL_ENV) {
            if !level.trim().is_empty() {
                self.logging.level = level;
            }
        }
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            if !dir.trim().is_empty() {
                self.storage.data_dir = Some(PathBuf::from(dir));
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let unit = |field: &'static str, value: f64| -> Result<(), ConfigError> {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfRange { field, value, min: 0.0, max: 1.0 });
            }
            Ok(())
        };

        unit("specialists.vigilance_threshold", self.specialists.vigilance_threshold)?;
        unit("specialists.learning_rate", self.specialists.learning_rate)?;
        unit("specialists.default_quality_prior", self.specialists.default_quality_prior)?;
        unit("specialists.unproven_success_rate", self.specialists.unproven_success_rate)?;
        unit("signals.reinforce_threshold", self.signals.reinforce_threshold)?;
        unit("signals.attenuation_factor", self.signals.attenuation_factor)?;
        unit("approaches.pattern_weight", self.approaches.pattern_weight)?;
        unit("approaches.signal_weight", self.approaches.signal_weight)?;
        unit("approaches.quality_ema_alpha", self.approaches.quality_ema_alpha)?;
        unit("discovery.success_threshold", self.discovery.success_threshold)?;
        unit("discovery.cluster_radius", self.discovery.cluster_radius)?;
        unit("discovery.novelty_threshold", self.discovery.novelty_threshold)?;
        unit("discovery.evolution_rate", self.discovery.evolution_rate)?;

        if self.specialists.max_specialists == 0 {
            return Err(ConfigError::NotPositive("specialists.max_specialists"));
        }
        if !(self.signals.half_life_seconds > 0.0) {
            return Err(ConfigError::NotPositive("signals.half_life_seconds"));
        }
        if self.signals.amplification_factor <= 0.0 {
            return Err(ConfigError::NotPositive("signals.amplification_factor"));
        }
        if self.discovery.period == 0 {
            return Err(ConfigError::NotPositive("discovery.period"));
        }
        if self.discovery.window_size == 0 {
            return Err(ConfigError::NotPositive("discovery.window_size"));
        }
        if self.discovery.min_cluster_size == 0 {
            return Err(ConfigError::NotPositive("discovery.min_cluster_size"));
        }
        if self.maintenance.compaction_interval_seconds == 0 {
            return Err(ConfigError::NotPositive("maintenance.compaction_interval_seconds"));
        }
        Ok(())
    }
}
